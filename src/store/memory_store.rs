//! Process-local deadline store

use std::{collections::HashMap, sync::Mutex};

use serde_json::Value;

use super::{parse_record, DeadlineRecord, DeadlineStore};
use crate::{
    error::{CountdownError, Result},
    state::Deadline,
};

/// In-memory store holding raw JSON values, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an arbitrary value under `key`, bypassing record encoding
    pub fn insert_raw(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("memory store"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl DeadlineStore for MemoryStore {
    fn load(&self, key: &str) -> Option<Deadline> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).and_then(parse_record)
    }

    fn save(&self, key: &str, deadline: Deadline) -> Result<()> {
        let value = DeadlineRecord::from_deadline(deadline).to_value()?;
        self.insert_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("memory store"))?;
        entries.remove(key);
        Ok(())
    }
}
