//! Scripted stand-in for an Oracle connection

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use logminer_cdc::logminer::{
    ConnectionFactory, LogMinerConfig, LogMinerConnection, LogMinerError, LOGFILE_QUERY,
};

#[derive(Default)]
struct MockState {
    log_files: Vec<String>,
    block_failures: Vec<(String, String)>,
    query_failure: Option<String>,
    close_failure: Option<String>,
    queries: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
    closed: AtomicBool,
}

/// In-memory connection that records every statement it receives.
///
/// Clones share state, so a test can keep a handle after the session has
/// taken ownership of its copy.
#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<MockState>,
}

impl MockConnection {
    /// A connection whose `V$LOGFILE` holds the given members
    pub fn with_log_files(files: &[&str]) -> Self {
        Self {
            state: Arc::new(MockState {
                log_files: files.iter().map(|f| f.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    fn state_mut(&mut self) -> &mut MockState {
        Arc::get_mut(&mut self.state).expect("configure the mock before cloning it")
    }

    /// Fail every block containing `pattern` with `message`
    pub fn fail_block(mut self, pattern: &str, message: &str) -> Self {
        self.state_mut()
            .block_failures
            .push((pattern.to_string(), message.to_string()));
        self
    }

    /// Fail every query with `message`
    pub fn fail_queries(mut self, message: &str) -> Self {
        self.state_mut().query_failure = Some(message.to_string());
        self
    }

    /// Fail `close` with `message`
    pub fn fail_close(mut self, message: &str) -> Self {
        self.state_mut().close_failure = Some(message.to_string());
        self
    }

    /// Executed PL/SQL blocks, in order
    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().unwrap().clone()
    }

    /// Executed queries, in order
    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().unwrap().clone()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogMinerConnection for MockConnection {
    async fn query_column(&self, sql: &str) -> Result<Vec<String>, LogMinerError> {
        self.state.queries.lock().unwrap().push(sql.to_string());
        if let Some(message) = &self.state.query_failure {
            return Err(LogMinerError::query(message.clone(), sql));
        }
        if sql == LOGFILE_QUERY {
            return Ok(self.state.log_files.clone());
        }
        Ok(vec!["1".to_string()])
    }

    async fn execute_block(&self, block: &str) -> Result<(), LogMinerError> {
        self.state.executed.lock().unwrap().push(block.to_string());
        for (pattern, message) in &self.state.block_failures {
            if block.contains(pattern.as_str()) {
                return Err(LogMinerError::call(message.clone(), None));
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), LogMinerError> {
        self.state.closed.store(true, Ordering::SeqCst);
        match &self.state.close_failure {
            Some(message) => Err(LogMinerError::connection(message.clone())),
            None => Ok(()),
        }
    }
}

/// Factory handing out clones of one scripted connection.
pub struct MockFactory {
    connection: MockConnection,
    refuse: Option<String>,
    connects: AtomicUsize,
    last_descriptor: Mutex<Option<String>>,
}

impl MockFactory {
    /// Factory returning `connection` on every connect
    pub fn new(connection: MockConnection) -> Self {
        Self {
            connection,
            refuse: None,
            connects: AtomicUsize::new(0),
            last_descriptor: Mutex::new(None),
        }
    }

    /// Factory refusing every connect with `message`
    pub fn refusing(message: &str) -> Self {
        Self {
            refuse: Some(message.to_string()),
            ..Self::new(MockConnection::default())
        }
    }

    /// Number of connect calls
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Descriptor of the last connect call
    pub fn last_descriptor(&self) -> Option<String> {
        self.last_descriptor.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    type Connection = MockConnection;

    async fn connect(&self, config: &LogMinerConfig) -> Result<MockConnection, LogMinerError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_descriptor.lock().unwrap() = Some(config.connect_descriptor());
        match &self.refuse {
            Some(message) => Err(LogMinerError::connection(message.clone())),
            None => Ok(self.connection.clone()),
        }
    }
}
