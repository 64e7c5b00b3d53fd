use async_trait::async_trait;

use super::database::DatabaseError;
use crate::food::record::{AnalysisRecord, NewAnalysisRecord};

/// The collection analysis records are written to.
pub const COLLECTION_NAME: &str = "food_analysis";

/// Create/list/delete access to stored analyses. Records are never updated.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Writes a record and returns its newly assigned id.
    async fn create(&self, record: NewAnalysisRecord) -> Result<String, DatabaseError>;

    /// The `limit` most recent records, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>, DatabaseError>;

    async fn delete(&self, id: &str) -> Result<(), DatabaseError>;
}
