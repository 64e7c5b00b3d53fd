use async_trait::async_trait;
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;

use super::store::{AnalysisStore, COLLECTION_NAME};
use crate::food::record::{AnalysisRecord, NewAnalysisRecord};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Record not found: {0}")]
    NotFound(String),
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DatabaseError::Connection(format!("{}: {}", parent.display(), e)))?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let db = Self {
            conn: Arc::new(conn),
        };
        db.initialize().await?;
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let db = Self {
            conn: Arc::new(conn),
        };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id TEXT PRIMARY KEY NOT NULL,
                        image_ref TEXT NOT NULL,
                        result_text TEXT NOT NULL,
                        created_at INTEGER NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table} (created_at);",
                    table = COLLECTION_NAME
                ))?;
                Ok(())
            })
            .await?;

        info!("Database initialized successfully");
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, DatabaseError> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", COLLECTION_NAME),
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;

        Ok(count.max(0) as usize)
    }
}

#[async_trait]
impl AnalysisStore for Database {
    async fn create(&self, record: NewAnalysisRecord) -> Result<String, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let row_id = id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (id, image_ref, result_text, created_at) VALUES (?1, ?2, ?3, ?4)",
                        COLLECTION_NAME
                    ),
                    (&row_id, &record.image_ref, &record.result_text, record.created_at),
                )?;
                Ok(())
            })
            .await?;

        debug!("Saved analysis record {}", id);
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>, DatabaseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, image_ref, result_text, created_at
                     FROM {}
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?1",
                    COLLECTION_NAME
                ))?;

                let rows = stmt.query_map([limit], AnalysisRecord::from_row)?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }

                Ok(records)
            })
            .await?;

        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<(), DatabaseError> {
        let row_id = id.to_string();

        let affected = self
            .conn
            .call(move |conn| {
                let affected = conn.execute(
                    &format!("DELETE FROM {} WHERE id = ?1", COLLECTION_NAME),
                    [&row_id],
                )?;
                Ok(affected)
            })
            .await?;

        if affected == 0 {
            return Err(DatabaseError::NotFound(id.to_string()));
        }

        debug!("Deleted analysis record {}", id);
        Ok(())
    }
}
