use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{Code, CoreError, Link, LinkStore, PutMode};

/// Simple in-memory store for tests and local dev. The internal mutex makes
/// the `PutMode::IfAbsent` check-and-insert atomic.
pub struct MemoryStore {
    inner: Mutex<BTreeMap<String, Link>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    fn key(code: &Code) -> String {
        code.as_str().to_string()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStore for MemoryStore {
    fn put(&self, link: Link, mode: PutMode) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        let key = Self::key(&link.code);
        if mode == PutMode::IfAbsent && map.contains_key(&key) {
            return Err(CoreError::AlreadyExists);
        }
        map.insert(key, link);
        Ok(())
    }

    fn get_by_code(&self, code: &Code) -> Result<Option<Link>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        Ok(map.get(&Self::key(code)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn link(code: &str, url: &str) -> Link {
        Link::new(
            Code::new(code).unwrap(),
            url.to_string(),
            SystemTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn put_and_get_round_trip() {
        let store = MemoryStore::new();
        store
            .put(link("abc123", "https://example.com"), PutMode::IfAbsent)
            .unwrap();
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.long_url, "https://example.com");
    }

    #[test]
    fn if_absent_rejects_duplicate() {
        let store = MemoryStore::new();
        store
            .put(link("abc123", "https://one.example"), PutMode::IfAbsent)
            .unwrap();
        let err = store
            .put(link("abc123", "https://two.example"), PutMode::IfAbsent)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists));
        // first write wins
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.long_url, "https://one.example");
    }

    #[test]
    fn overwrite_replaces() {
        let store = MemoryStore::new();
        store
            .put(link("abc123", "https://one.example"), PutMode::IfAbsent)
            .unwrap();
        store
            .put(link("abc123", "https://two.example"), PutMode::Overwrite)
            .unwrap();
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.long_url, "https://two.example");
    }

    #[test]
    fn get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store
            .get_by_code(&Code::new("nope99").unwrap())
            .unwrap()
            .is_none());
    }
}
