//! File-backed credential store.

use super::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use portal_core::error::{PortalError, Result};
use portal_core::session::CredentialStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

type Entries = BTreeMap<String, String>;

/// Credential store persisted as a single JSON object on disk.
///
/// Entries are cached in memory; every write replaces the file atomically,
/// so a multi-key `set_all`/`remove_all` lands on disk as one change.
///
/// # Example
///
/// ```ignore
/// use portal_infrastructure::storage::FileCredentialStore;
///
/// let store = FileCredentialStore::open(PortalPaths::credentials_file()?).await;
/// store.set("token", "t1".into()).await?;
/// ```
#[derive(Clone)]
pub struct FileCredentialStore {
    entries: Arc<Mutex<Entries>>,
    file: Arc<AtomicJsonFile<Entries>>,
}

impl FileCredentialStore {
    /// Opens the store, loading existing entries.
    ///
    /// An unreadable or corrupt file is treated as empty; it is overwritten on
    /// the next write.
    pub async fn open(path: PathBuf) -> Self {
        let file = Arc::new(AtomicJsonFile::<Entries>::new(path));

        let loader = file.clone();
        let initial = match tokio::task::spawn_blocking(move || loader.load()).await {
            Ok(Ok(entries)) => entries.unwrap_or_default(),
            Ok(Err(e)) => {
                tracing::warn!(
                    "[CredentialStore] Ignoring unreadable credential file {:?}: {}",
                    file.path(),
                    e
                );
                Entries::new()
            }
            Err(e) => {
                tracing::warn!("[CredentialStore] Failed to join load task: {}", e);
                Entries::new()
            }
        };

        Self {
            entries: Arc::new(Mutex::new(initial)),
            file,
        }
    }

    /// Applies `change` to a copy of the entries, persists it, then commits it
    /// to the cache.
    async fn write<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Entries),
    {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        change(&mut next);

        if next == *entries {
            return Ok(());
        }

        let file = self.file.clone();
        let snapshot = next.clone();
        tokio::task::spawn_blocking(move || {
            file.update(Entries::new(), |data| {
                *data = snapshot;
                Ok(())
            })
        })
        .await
        .map_err(|e| PortalError::internal(format!("Failed to join task: {}", e)))??;

        *entries = next;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.write(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.write(|entries| {
            entries.remove(key);
        })
        .await
    }

    async fn set_all(&self, pairs: Vec<(String, String)>) -> Result<()> {
        self.write(move |entries| entries.extend(pairs)).await
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<()> {
        self.write(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::session::{TOKEN_KEY, USER_KEY};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");

        let store = FileCredentialStore::open(path.clone()).await;
        store
            .set_all(vec![
                (USER_KEY.to_string(), r#"{"id":1,"name":"U"}"#.to_string()),
                (TOKEN_KEY.to_string(), "t1".to_string()),
            ])
            .await
            .unwrap();

        let reopened = FileCredentialStore::open(path).await;
        assert_eq!(reopened.get(TOKEN_KEY).await.unwrap(), Some("t1".to_string()));
        assert!(reopened.get(USER_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_all_clears_both_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");

        let store = FileCredentialStore::open(path.clone()).await;
        store.set(USER_KEY, "{}".to_string()).await.unwrap();
        store.set(TOKEN_KEY, "t1".to_string()).await.unwrap();
        store.remove_all(&[USER_KEY, TOKEN_KEY]).await.unwrap();

        let reopened = FileCredentialStore::open(path).await;
        assert!(reopened.get(USER_KEY).await.unwrap().is_none());
        assert!(reopened.get(TOKEN_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_opens_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = FileCredentialStore::open(path).await;
        assert!(store.get(TOKEN_KEY).await.unwrap().is_none());
        store.set(TOKEN_KEY, "t2".to_string()).await.unwrap();
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), Some("t2".to_string()));
    }
}
