//! Credential store trait.

use async_trait::async_trait;

use crate::error::Result;

/// Key holding the serialized identity.
pub const USER_KEY: &str = "user";
/// Key holding the opaque credential token.
pub const TOKEN_KEY: &str = "token";

/// Device-local key-value storage for persisted credentials.
///
/// Implementations that can write several keys in one step should override
/// `set_all` and `remove_all` so identity and token are never observed
/// half-written.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Writes every entry, in order.
    async fn set_all(&self, entries: Vec<(String, String)>) -> Result<()> {
        for (key, value) in entries {
            self.set(&key, value).await?;
        }
        Ok(())
    }

    /// Removes every key, continuing past individual failures.
    ///
    /// Returns the first error encountered, if any.
    async fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortalError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Store using only the trait's default multi-key methods.
    #[derive(Default)]
    struct MapStore {
        entries: Mutex<HashMap<String, String>>,
        failing_key: Option<&'static str>,
    }

    #[async_trait]
    impl CredentialStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: String) -> Result<()> {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            if self.failing_key == Some(key) {
                return Err(PortalError::storage(format!("cannot remove {}", key)));
            }
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_set_all_writes_every_entry() {
        let store = MapStore::default();

        store
            .set_all(vec![
                (USER_KEY.to_string(), "{}".to_string()),
                (TOKEN_KEY.to_string(), "t1".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("t1"));
        assert_eq!(store.get(USER_KEY).await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_default_remove_all_continues_past_failure() {
        let store = MapStore {
            failing_key: Some(USER_KEY),
            ..Default::default()
        };
        store.set(USER_KEY, "{}".to_string()).await.unwrap();
        store.set(TOKEN_KEY, "t1".to_string()).await.unwrap();

        let err = store.remove_all(&[USER_KEY, TOKEN_KEY]).await.unwrap_err();

        assert_eq!(err, PortalError::storage("cannot remove user"));
        assert!(store.get(TOKEN_KEY).await.unwrap().is_none());
        assert!(store.get(USER_KEY).await.unwrap().is_some());
    }
}
