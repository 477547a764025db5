//! In-memory stores with lazy expiry.
//!
//! Keys carry an optional time to live. Nothing sweeps them in the
//! background: an expired entry is dropped the next time its key is touched.

mod lists;
mod strings;

use std::{collections::HashMap, time::Duration};

use thiserror::Error;
use tokio::time::Instant;

pub use lists::ListStore;
pub use strings::StringStore;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub value: T,
    pub created_at: Instant,
    pub ttl: Option<Duration>,
}

impl<T> Entry<T> {
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => self
                .created_at
                .checked_add(ttl)
                .map_or(false, |deadline| now >= deadline),
            None => false,
        }
    }
}

/// Key to [`Entry`] map that evicts expired entries on access.
#[derive(Debug)]
pub(crate) struct ExpiringMap<T> {
    entries: HashMap<String, Entry<T>>,
}

impl<T> Default for ExpiringMap<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ExpiringMap<T> {
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Entry<T>> {
        let expired = self.entries.get(key)?.is_expired(Instant::now());

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get_mut(key)
    }

    pub(crate) fn get_or_insert_with<F>(&mut self, key: &str, default: F) -> &mut Entry<T>
    where
        F: FnOnce() -> Entry<T>,
    {
        if self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            self.entries.remove(key);
        }

        self.entries.entry(key.to_string()).or_insert_with(default)
    }

    pub(crate) fn insert(&mut self, key: String, entry: Entry<T>) {
        self.entries.insert(key, entry);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Entry<T>> {
        self.entries.remove(key)
    }

    /// Number of keys held, including expired ones nobody has touched yet.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
