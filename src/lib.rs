pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod food;
pub mod providers;

// Re-export commonly used items
pub use database::{AnalysisStore, Database};
pub use food::{AnalysisRecord, FoodAnalyzer};
pub use providers::InferenceProvider;
