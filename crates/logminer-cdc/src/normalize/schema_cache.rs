//! Per-batch schema cache
//!
//! Maps the 64-bit fingerprints carried by wrapped envelopes to the schema
//! documents they denote. The cache is built once from the state record that
//! travels alongside the data stream and is read-only afterwards; share it
//! between workers as an `Arc<SchemaCache>` and replace the whole snapshot at
//! the next batch.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use apache_avro::Schema as AvroSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::normalizer::CanonicalSchema;
use crate::common::{CdcError, Result};

/// Fingerprint of one schema version, as computed by the capture agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaFingerprint(i64);

impl SchemaFingerprint {
    /// Wrap a raw fingerprint
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw fingerprint value
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for SchemaFingerprint {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SchemaFingerprint {
    type Err = CdcError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| CdcError::config(format!("invalid schema fingerprint '{}': {}", s, e)))
    }
}

/// A schema document together with its parsed forms.
#[derive(Debug, Clone)]
pub struct CachedSchema {
    fingerprint: SchemaFingerprint,
    document: String,
    avro: AvroSchema,
    canonical: CanonicalSchema,
}

impl CachedSchema {
    /// Parse and canonicalize a schema document.
    pub fn parse(fingerprint: SchemaFingerprint, document: impl Into<String>) -> Result<Self> {
        let document = document.into();
        let avro = AvroSchema::parse_str(&document).map_err(|e| {
            CdcError::schema(format!("schema {} is not valid Avro: {}", fingerprint, e))
        })?;
        let canonical = CanonicalSchema::from_document(&document)?;
        Ok(Self {
            fingerprint,
            document,
            avro,
            canonical,
        })
    }

    /// Fingerprint this schema was registered under
    pub fn fingerprint(&self) -> SchemaFingerprint {
        self.fingerprint
    }

    /// Schema document as delivered by the state record
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Parsed writer schema for row payloads
    pub fn avro(&self) -> &AvroSchema {
        &self.avro
    }

    /// Canonical column schema
    pub fn canonical(&self) -> &CanonicalSchema {
        &self.canonical
    }
}

/// State record carrying the fingerprint map, keyed by decimal fingerprint.
///
/// ```json
/// {"data": {"42": "{\"type\":\"record\", ...}"}}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaStateRecord {
    /// Fingerprint (decimal string) to schema document
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Immutable fingerprint -> schema snapshot for one batch.
///
/// A document that fails to parse is kept as a failed entry, so it only
/// breaks the events that reference its fingerprint.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    entries: HashMap<SchemaFingerprint, std::result::Result<CachedSchema, String>>,
}

impl SchemaCache {
    /// An empty cache; every lookup fails
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from fingerprint/document pairs, parsing every document once.
    ///
    /// A later pair with the same fingerprint replaces an earlier one.
    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (SchemaFingerprint, S)>,
        S: Into<String>,
    {
        let mut entries = HashMap::new();
        for (fingerprint, document) in documents {
            let entry = CachedSchema::parse(fingerprint, document).map_err(|e| {
                warn!("Schema {} cannot be used: {}", fingerprint, e);
                e.to_string()
            });
            entries.insert(fingerprint, entry);
        }
        debug!("Built schema cache with {} entries", entries.len());
        Self { entries }
    }

    /// Build from a deserialized state record.
    pub fn from_state(state: SchemaStateRecord) -> Result<Self> {
        let documents = state
            .data
            .into_iter()
            .map(|(key, document)| Ok((key.parse::<SchemaFingerprint>()?, document)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_documents(documents))
    }

    /// Build from the JSON form of a state record.
    pub fn from_state_json(json: &str) -> Result<Self> {
        let state: SchemaStateRecord = serde_json::from_str(json)?;
        Self::from_state(state)
    }

    /// Resolve a fingerprint.
    ///
    /// A missing fingerprint means the state channel did not deliver the
    /// schema; this is a pipeline configuration error and is not retried.
    /// A delivered but unusable document fails with [`CdcError::Schema`].
    pub fn resolve(&self, fingerprint: SchemaFingerprint) -> Result<&CachedSchema> {
        match self.entries.get(&fingerprint) {
            Some(Ok(cached)) => Ok(cached),
            Some(Err(reason)) => Err(CdcError::schema(format!(
                "schema {} could not be loaded: {}",
                fingerprint, reason
            ))),
            None => Err(CdcError::SchemaNotFound(fingerprint)),
        }
    }

    /// Whether the fingerprint resolves to a usable schema
    pub fn contains(&self, fingerprint: SchemaFingerprint) -> bool {
        matches!(self.entries.get(&fingerprint), Some(Ok(_)))
    }

    /// Number of delivered fingerprints, failed entries included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no schemas
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivered fingerprints, in no particular order
    pub fn fingerprints(&self) -> impl Iterator<Item = SchemaFingerprint> + '_ {
        self.entries.keys().copied()
    }
}
