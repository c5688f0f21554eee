//! Key/value persistence contract shared by the registry, the credential
//! flow, the cache lock and the per-team list caches.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Persistent key/value store with a separate secret namespace
pub trait Store: Send + Sync {
    /// Read a value, `None` when absent
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a value, replacing any previous one
    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Delete a value; deleting an absent key is not an error
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Durably store a secret
    fn set_password(&self, key: &str, secret: &str) -> Result<(), StoreError>;

    /// Read back a secret
    fn password(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Typed helpers over any [`Store`]
pub trait StoreExt: Store {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.read(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Serde {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(data).map_err(|source| StoreError::Serde {
            key: key.to_string(),
            source,
        })?;
        self.write(key, &value)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// In-process store, used for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    secrets: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.values.write().unwrap().remove(key);
        Ok(())
    }

    fn set_password(&self, key: &str, secret: &str) -> Result<(), StoreError> {
        self.secrets
            .write()
            .unwrap()
            .insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn password(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.secrets.read().unwrap().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_round_trip_and_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.load::<Vec<String>>("names").unwrap(), None);

        store.save("names", &vec!["a".to_string()]).unwrap();
        assert_eq!(
            store.load::<Vec<String>>("names").unwrap(),
            Some(vec!["a".to_string()])
        );

        store.delete("names").unwrap();
        store.delete("names").unwrap();
        assert_eq!(store.read("names").unwrap(), None);
    }

    #[test]
    fn test_secrets_are_separate_from_values() {
        let store = MemoryStore::new();
        store.set_password("token.T1", "xoxp-1").unwrap();
        assert_eq!(store.read("token.T1").unwrap(), None);
        assert_eq!(store.password("token.T1").unwrap().as_deref(), Some("xoxp-1"));
    }
}
