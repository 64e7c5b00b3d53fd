pub mod analyzer;
pub mod config;
pub mod image;
pub mod prompt;
pub mod record;

pub use analyzer::{AnalyzerConfig, AnalyzerError, FoodAnalyzer, SubmitOutcome, WorkflowHandle, WorkflowStatus};
pub use config::FoodConfig;
pub use image::{DirectoryImageStore, ImageData, ImageError, ImageStore};
pub use record::{AnalysisRecord, NewAnalysisRecord};
