//! In-process store, shared between clones.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{RemoteTransport, TransportError};

/// A request received by a [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRequest {
    Put(String),
    Get(String),
}

#[derive(Debug, Default)]
struct State {
    blobs: BTreeMap<String, Vec<u8>>,
    failures: BTreeMap<String, TransportError>,
    requests: Vec<TransportRequest>,
}

/// Transport keeping blobs in memory.
///
/// Clones share the same store, so a caller can hand one clone to a
/// distributor and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob
    pub fn insert(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.lock().blobs.insert(name.into(), content.into());
    }

    /// Make every request for `name` fail with `error`
    pub fn fail_on(&self, name: impl Into<String>, error: TransportError) {
        self.lock().failures.insert(name.into(), error);
    }

    /// Current content of a blob
    pub fn blob(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(name).cloned()
    }

    /// Stored blob names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.lock().blobs.keys().cloned().collect()
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a panicking test must not poison the store for the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RemoteTransport for MemoryTransport {
    fn put(&self, name: &str, content: &mut dyn Read) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.requests.push(TransportRequest::Put(name.to_string()));

        if let Some(error) = state.failures.get(name) {
            return Err(error.clone());
        }

        let mut buffer = Vec::new();
        content.read_to_end(&mut buffer).map_err(|e| TransportError::Other {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        state.blobs.insert(name.to_string(), buffer);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        let mut state = self.lock();
        state.requests.push(TransportRequest::Get(name.to_string()));

        if let Some(error) = state.failures.get(name) {
            return Err(error.clone());
        }

        let content = state.blobs.get(name).cloned().ok_or_else(|| TransportError::NotFound {
            name: name.to_string(),
        })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn endpoint(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let store = MemoryTransport::new();
        let handle = store.clone();

        handle.put("a.zip", &mut &b"abc"[..]).unwrap();
        assert_eq!(store.blob("a.zip"), Some(b"abc".to_vec()));
        assert_eq!(store.requests(), vec![TransportRequest::Put("a.zip".to_string())]);
    }

    #[test]
    fn test_get_missing_and_injected_failure() {
        let store = MemoryTransport::new();
        store.insert("b.zip", "bytes");
        store.fail_on(
            "b.zip",
            TransportError::ConnectionFailed {
                endpoint: "memory".to_string(),
                reason: "offline".to_string(),
            },
        );

        assert!(matches!(store.get("a.zip"), Err(TransportError::NotFound { .. })));
        assert!(matches!(store.get("b.zip"), Err(TransportError::ConnectionFailed { .. })));
        assert_eq!(store.requests().len(), 2);
    }
}
