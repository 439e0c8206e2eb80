use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for a Redis client.
///
/// Stored values come from `value_ret` and a batch failure from `mget_error`.
/// Every MGET is recorded with its keys, and clones share that log.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    values: HashMap<Vec<u8>, Vec<u8>>,
    mget_error: Option<CustomRedisError>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

#[derive(Debug, Clone)]
pub struct MockRedisCall {
    pub op: String,
    pub keys: Vec<Vec<u8>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    // Helper method to safely lock the calls mutex
    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockRedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, op: &str, keys: Vec<Vec<u8>>) {
        self.lock_calls().push(MockRedisCall {
            op: op.to_string(),
            keys,
        });
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock_calls().clone()
    }

    /// Number of recorded calls for one operation, e.g. `"mget"`.
    pub fn count_calls(&self, op: &str) -> usize {
        self.lock_calls().iter().filter(|c| c.op == op).count()
    }

    pub fn value_ret(&mut self, key: Vec<u8>, value: Vec<u8>) -> Self {
        self.values.insert(key, value);
        self.clone()
    }

    pub fn mget_error(&mut self, err: CustomRedisError) -> Self {
        self.mget_error = Some(err);
        self.clone()
    }
}

#[async_trait]
impl Client for MockRedisClient {
    async fn mget(&self, keys: Vec<Vec<u8>>) -> Result<Vec<Option<Vec<u8>>>, CustomRedisError> {
        self.record("mget", keys.clone());

        if let Some(err) = &self.mget_error {
            return Err(err.clone());
        }

        Ok(keys.iter().map(|k| self.values.get(k).cloned()).collect())
    }
}
