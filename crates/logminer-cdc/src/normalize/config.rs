//! Normalizer configuration

use serde::{Deserialize, Serialize};

/// Default name of the field carrying the raw payload
pub const DEFAULT_INPUT_FIELD: &str = "message";

/// Configuration of a [`ChangeNormalizer`](super::ChangeNormalizer).
///
/// ```rust
/// use logminer_cdc::normalize::NormalizerConfig;
///
/// let config = NormalizerConfig::default().with_input_field("body");
/// assert_eq!(config.input_field(), "body");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Field of the inbound record holding the payload
    pub input_field: String,
    /// Fail on op types outside I/U/D instead of emitting an empty change
    pub strict_op_types: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            input_field: DEFAULT_INPUT_FIELD.to_string(),
            strict_op_types: false,
        }
    }
}

impl NormalizerConfig {
    /// Set the payload field name
    pub fn with_input_field(mut self, field: impl Into<String>) -> Self {
        self.input_field = field.into();
        self
    }

    /// Enable or disable strict op type handling
    pub fn with_strict_op_types(mut self, strict: bool) -> Self {
        self.strict_op_types = strict;
        self
    }

    /// Effective payload field; blank falls back to `message`, anything
    /// else is used verbatim.
    pub fn input_field(&self) -> &str {
        if self.input_field.trim().is_empty() {
            DEFAULT_INPUT_FIELD
        } else {
            &self.input_field
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NormalizerConfig::default();
        assert_eq!(config.input_field(), "message");
        assert!(!config.strict_op_types);
    }

    #[test]
    fn test_blank_input_field_falls_back() {
        let config = NormalizerConfig::default().with_input_field("  ");
        assert_eq!(config.input_field(), DEFAULT_INPUT_FIELD);
    }

    #[test]
    fn test_input_field_is_not_trimmed() {
        let config = NormalizerConfig::default().with_input_field("message ");
        assert_eq!(config.input_field(), "message ");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: NormalizerConfig =
            serde_json::from_str(r#"{"strict_op_types": true}"#).unwrap();
        assert_eq!(config.input_field(), "message");
        assert!(config.strict_op_types);
    }
}
