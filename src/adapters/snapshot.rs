use crate::adapters::memory::{MemoryStore, StoreState};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// 把整個 MemoryStore 存成一個 JSON 檔
pub struct SnapshotFile<S: Storage> {
    storage: S,
    file_name: String,
}

impl<S: Storage> SnapshotFile<S> {
    pub fn new(storage: S, file_name: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// A missing file yields an empty store.
    pub async fn load(&self) -> Result<MemoryStore> {
        if !self.storage.exists(&self.file_name).await {
            tracing::info!("No snapshot at {}, starting empty", self.file_name);
            return Ok(MemoryStore::new());
        }

        let data = self.storage.read_file(&self.file_name).await?;
        let state: StoreState = serde_json::from_slice(&data)?;
        tracing::debug!(
            "Loaded snapshot: {} activities, {} providers, {} ledger entries",
            state.activities.len(),
            state.providers.len(),
            state.ledger.len()
        );
        Ok(MemoryStore::from_state(state))
    }

    pub async fn save(&self, store: &MemoryStore) -> Result<()> {
        let state = store.snapshot().await;
        let json = serde_json::to_vec_pretty(&state)?;
        tracing::debug!("Writing snapshot ({} bytes) to {}", json.len(), self.file_name);
        self.storage.write_file(&self.file_name, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::domain::model::{Activity, ActivityId, ActivityKind, UserId};
    use crate::domain::ports::FillRepository;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_snapshot_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(LocalStorage::new(temp_dir.path()), "state.json");
        let store = snapshot.load().await.unwrap();
        assert_eq!(store.snapshot().await, StoreState::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(LocalStorage::new(temp_dir.path()), "state.json");

        let store = MemoryStore::new();
        store
            .insert_activity(Activity {
                id: ActivityId(3),
                title: "Black zone haul".to_string(),
                kind: ActivityKind::Transport,
                creator_id: UserId(1),
            })
            .await
            .unwrap();
        snapshot.save(&store).await.unwrap();

        let reloaded = snapshot.load().await.unwrap();
        assert_eq!(reloaded.snapshot().await, store.snapshot().await);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("state.json"), b"not json").unwrap();
        let snapshot = SnapshotFile::new(LocalStorage::new(temp_dir.path()), "state.json");
        let err = snapshot.load().await.unwrap_err();
        assert!(matches!(
            err,
            crate::utils::error::FillError::SerializationError(_)
        ));
    }
}
