use anyhow::Result;
use async_trait::async_trait;

use crate::food::image::ImageData;

/// A hosted multimodal model that answers one instruction about one image.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn analyze_image(&self, image: &ImageData, instruction: &str) -> Result<String>;

    async fn get_model_info(&self) -> Result<String>;
}
