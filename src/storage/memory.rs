use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use super::{KeyValueBackend, Result, StorageError};

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, String>,
    writes: HashMap<String, usize>,
}

/// Process-local backend. Counts writes per key so callers can observe how
/// often a store persists.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes to `key` since creation.
    pub fn write_count(&self, key: &str) -> usize {
        self.state
            .lock()
            .map(|state| state.writes.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.writes.values().sum())
            .unwrap_or(0)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.values.get(key).cloned())
    }

    /// Simulates the medium going away (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl KeyValueBackend for MemoryBackend {
    fn is_available(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(state.values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        state.values.insert(key.to_string(), value.to_string());
        *state.writes.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        state.values.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        state.values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_writes_per_key() {
        let backend = MemoryBackend::new();
        backend.write("a", "1").unwrap();
        backend.write("a", "2").unwrap();
        backend.write("b", "3").unwrap();
        assert_eq!(backend.write_count("a"), 2);
        assert_eq!(backend.write_count("b"), 1);
        assert_eq!(backend.total_writes(), 3);
        assert_eq!(backend.raw("a").as_deref(), Some("2"));
    }

    #[test]
    fn offline_backend_reports_unavailable() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(!backend.is_available());
        backend.set_offline(false);
        assert!(backend.is_available());
    }
}
