use std::time::Duration;

use crate::key_value_store::{Entry, ExpiringMap, StoreError};

#[derive(Debug, Default)]
pub struct StringStore {
    map: ExpiringMap<String>,
}

impl StringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any previous value and time to live.
    pub fn set(&mut self, key: String, value: String, ttl: Option<Duration>) {
        self.map.insert(key, Entry::new(value, ttl));
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        self.map.get_mut(key).map(|entry| entry.value.clone())
    }

    /// Increments the integer stored at `key`, starting from 0 when absent.
    ///
    /// A value that does not parse as a 64-bit integer, or that would
    /// overflow, is left untouched.
    pub fn incr(&mut self, key: &str) -> Result<i64, StoreError> {
        let Some(entry) = self.map.get_mut(key) else {
            self.map.insert(key.to_string(), Entry::new("1".to_string(), None));
            return Ok(1);
        };

        let current = entry
            .value
            .parse::<i64>()
            .map_err(|_| StoreError::NotAnInteger)?;
        let incremented = current.checked_add(1).ok_or(StoreError::NotAnInteger)?;
        entry.value = incremented.to_string();

        Ok(incremented)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
