use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sharebox_core::{AppError, FileRecord, FileStatus, ResourceKind, StreamEntry};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Owner-scoped persistence for [`FileRecord`]s.
///
/// Every lookup takes the owner id: a record belonging to someone else is
/// indistinguishable from a missing one.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, AppError>;

    async fn find_for_owner(
        &self,
        owner_id: &str,
        id: Uuid,
    ) -> Result<Option<FileRecord>, AppError>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>, AppError>;

    /// Overwrite the content fields of an existing record, keeping `created_at`.
    ///
    /// Applies only while the stored record still points at
    /// `expected_remote_id`; a concurrent replace yields `Conflict`.
    async fn update_content(
        &self,
        record: &FileRecord,
        expected_remote_id: &str,
    ) -> Result<FileRecord, AppError>;

    /// Returns false when no record matched.
    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<bool, AppError>;
}

const FILE_COLUMNS: &str = "id, owner_id, name, mime_type, status, url, remote_id, resource_kind, \
     format, size_bytes, width, height, duration_seconds, thumbnail_url, thumbnail_remote_id, \
     is_adaptive_stream, stream_entries, created_at, updated_at";

/// Row type for the files table.
#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    owner_id: String,
    name: String,
    mime_type: Option<String>,
    status: String,
    url: String,
    remote_id: String,
    resource_kind: String,
    format: Option<String>,
    size_bytes: i64,
    width: Option<i32>,
    height: Option<i32>,
    duration_seconds: Option<f64>,
    thumbnail_url: Option<String>,
    thumbnail_remote_id: Option<String>,
    is_adaptive_stream: bool,
    stream_entries: Json<Vec<StreamEntry>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRow {
    fn into_record(self) -> Result<FileRecord, AppError> {
        let status: FileStatus = self.status.parse()?;
        let resource_kind: ResourceKind = self.resource_kind.parse()?;

        Ok(FileRecord {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            mime_type: self.mime_type,
            status,
            url: self.url,
            remote_id: self.remote_id,
            resource_kind,
            format: self.format,
            size_bytes: u64::try_from(self.size_bytes).unwrap_or_default(),
            width: self.width.and_then(|w| u32::try_from(w).ok()),
            height: self.height.and_then(|h| u32::try_from(h).ok()),
            duration_seconds: self.duration_seconds,
            thumbnail_url: self.thumbnail_url,
            thumbnail_remote_id: self.thumbnail_remote_id,
            is_adaptive_stream: self.is_adaptive_stream,
            stream_entries: self.stream_entries.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_i32(value: Option<u32>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

/// Postgres-backed repository for the files table.
#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "files", db.operation = "insert", db.record_id = %record.id))]
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, AppError> {
        let query = format!(
            r#"
            INSERT INTO files (id, owner_id, name, mime_type, status, url, remote_id, resource_kind,
                format, size_bytes, width, height, duration_seconds, thumbnail_url,
                thumbnail_remote_id, is_adaptive_stream, stream_entries, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, FileRow>(&query)
            .bind(record.id)
            .bind(&record.owner_id)
            .bind(&record.name)
            .bind(&record.mime_type)
            .bind(record.status.to_string())
            .bind(&record.url)
            .bind(&record.remote_id)
            .bind(record.resource_kind.as_str())
            .bind(&record.format)
            .bind(to_i64(record.size_bytes))
            .bind(to_i32(record.width))
            .bind(to_i32(record.height))
            .bind(record.duration_seconds)
            .bind(&record.thumbnail_url)
            .bind(&record.thumbnail_remote_id)
            .bind(record.is_adaptive_stream)
            .bind(Json(&record.stream_entries))
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await?;

        row.into_record()
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn find_for_owner(
        &self,
        owner_id: &str,
        id: Uuid,
    ) -> Result<Option<FileRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM files WHERE id = $1 AND owner_id = $2",
            FILE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, FileRow>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(FileRow::into_record).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM files WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
            FILE_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, FileRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(FileRow::into_record).collect()
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "files", db.operation = "update", db.record_id = %record.id))]
    async fn update_content(
        &self,
        record: &FileRecord,
        expected_remote_id: &str,
    ) -> Result<FileRecord, AppError> {
        let query = format!(
            r#"
            UPDATE files
            SET name = $3, mime_type = $4, status = $5, url = $6, remote_id = $7,
                resource_kind = $8, format = $9, size_bytes = $10, width = $11, height = $12,
                duration_seconds = $13, thumbnail_url = $14, thumbnail_remote_id = $15,
                is_adaptive_stream = $16, stream_entries = $17, updated_at = $18
            WHERE id = $1 AND owner_id = $2 AND remote_id = $19
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, FileRow>(&query)
            .bind(record.id)
            .bind(&record.owner_id)
            .bind(&record.name)
            .bind(&record.mime_type)
            .bind(record.status.to_string())
            .bind(&record.url)
            .bind(&record.remote_id)
            .bind(record.resource_kind.as_str())
            .bind(&record.format)
            .bind(to_i64(record.size_bytes))
            .bind(to_i32(record.width))
            .bind(to_i32(record.height))
            .bind(record.duration_seconds)
            .bind(&record.thumbnail_url)
            .bind(&record.thumbnail_remote_id)
            .bind(record.is_adaptive_stream)
            .bind(Json(&record.stream_entries))
            .bind(record.updated_at)
            .bind(expected_remote_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return row.into_record();
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM files WHERE id = $1 AND owner_id = $2)",
        )
        .bind(record.id)
        .bind(&record.owner_id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Err(AppError::Conflict(
                "File was modified by another request".to_string(),
            ))
        } else {
            Err(AppError::NotFound("File not found".to_string()))
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
