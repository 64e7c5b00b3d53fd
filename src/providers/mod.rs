pub mod gemini;
pub mod traits;

pub use traits::InferenceProvider;
