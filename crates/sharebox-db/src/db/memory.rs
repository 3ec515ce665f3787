use async_trait::async_trait;
use sharebox_core::{AppError, FileRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::file::FileRepository;

/// Process-local repository. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryFileRepository {
    records: RwLock<HashMap<Uuid, FileRecord>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, AppError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(AppError::Database(format!(
                "duplicate key value: file {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn find_for_owner(
        &self,
        owner_id: &str,
        id: Uuid,
    ) -> Result<Option<FileRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .filter(|record| record.owner_id == owner_id)
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>, AppError> {
        let mut records: Vec<FileRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn update_content(
        &self,
        record: &FileRecord,
        expected_remote_id: &str,
    ) -> Result<FileRecord, AppError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) if existing.owner_id == record.owner_id => {
                if existing.remote_id != expected_remote_id {
                    return Err(AppError::Conflict(
                        "File was modified by another request".to_string(),
                    ));
                }
                let created_at = existing.created_at;
                *existing = record.clone();
                existing.created_at = created_at;
                Ok(existing.clone())
            }
            _ => Err(AppError::NotFound("File not found".to_string())),
        }
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<bool, AppError> {
        let mut records = self.records.write().await;
        let owned = records
            .get(&id)
            .map(|record| record.owner_id == owner_id)
            .unwrap_or(false);
        if owned {
            records.remove(&id);
        }
        Ok(owned)
    }
}
