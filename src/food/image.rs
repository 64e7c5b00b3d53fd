use async_trait::async_trait;
use chrono::Utc;
use image::ImageFormat;
use log::{debug, info};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use url::Url;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Unsupported image format: {0}")]
    Unsupported(String),
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),
}

/// Raw image bytes that have been checked to decode as a supported format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub extension: &'static str,
}

impl ImageData {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageError> {
        let format = image::guess_format(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let (mime_type, extension) = match format {
            ImageFormat::Jpeg => ("image/jpeg", "jpg"),
            ImageFormat::Png => ("image/png", "png"),
            ImageFormat::WebP => ("image/webp", "webp"),
            ImageFormat::Gif => ("image/gif", "gif"),
            other => return Err(ImageError::Unsupported(format!("{:?}", other))),
        };

        image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        Ok(Self {
            bytes,
            mime_type,
            extension,
        })
    }

    pub async fn from_path(path: &Path) -> Result<Self, ImageError> {
        let bytes = fs::read(path).await.map_err(|source| ImageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes)
    }
}

/// Where analyzed images live. `store` is the upload step that turns a
/// picked file into a durable reference; `load` reads one back.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, source: &Path) -> Result<String, ImageError>;

    async fn load(&self, reference: &str) -> Result<ImageData, ImageError>;
}

#[derive(Debug, Clone)]
pub struct DirectoryImageStore {
    root: PathBuf,
}

impl DirectoryImageStore {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, ImageError> {
        let root = root.as_ref();
        fs::create_dir_all(root).await.map_err(|source| ImageError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let root = fs::canonicalize(root).await.map_err(|source| ImageError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a reference to a file under the store root. Anything that points
    /// elsewhere was not produced by `store` and is rejected.
    fn resolve(&self, reference: &str) -> Result<PathBuf, ImageError> {
        let path = if reference.starts_with("file://") {
            let url = Url::parse(reference).map_err(|e| ImageError::InvalidReference(format!("{}: {}", reference, e)))?;
            url.to_file_path()
                .map_err(|_| ImageError::InvalidReference(reference.to_string()))?
        } else if reference.contains("://") {
            return Err(ImageError::InvalidReference(format!("unsupported scheme in {}", reference)));
        } else if reference.trim().is_empty() {
            return Err(ImageError::InvalidReference("empty reference".to_string()));
        } else {
            PathBuf::from(reference)
        };

        let climbs = path.components().any(|c| matches!(c, Component::ParentDir));
        if climbs || !path.starts_with(&self.root) {
            return Err(ImageError::InvalidReference(format!(
                "{} is outside {}",
                reference,
                self.root.display()
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl ImageStore for DirectoryImageStore {
    async fn store(&self, source: &Path) -> Result<String, ImageError> {
        let image = ImageData::from_path(source).await?;

        let short_id = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "food_image_{}_{}.{}",
            Utc::now().timestamp_millis(),
            &short_id[..8],
            image.extension
        );
        let target = self.root.join(file_name);

        fs::write(&target, &image.bytes).await.map_err(|source| ImageError::Io {
            path: target.display().to_string(),
            source,
        })?;

        let reference = Url::from_file_path(&target)
            .map_err(|_| ImageError::InvalidReference(target.display().to_string()))?
            .to_string();
        info!("Stored image {} as {}", source.display(), reference);
        Ok(reference)
    }

    async fn load(&self, reference: &str) -> Result<ImageData, ImageError> {
        let path = self.resolve(reference)?;
        debug!("Loading image from {}", path.display());
        ImageData::from_path(&path).await
    }
}
