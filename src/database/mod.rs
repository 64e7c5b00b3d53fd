pub mod database;
pub mod store;

pub use database::Database;
pub use database::DatabaseError;
pub use store::{AnalysisStore, COLLECTION_NAME};
