use async_trait::async_trait;
use shared::ImageRecord;
use std::path::Path;

use super::image_store::{ImageStore, Predicate, RetrievalError};

/// Catalog held in memory, loaded once from a JSON array of image records.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageStore {
    images: Vec<ImageRecord>,
    bucket_threshold: f64,
}

impl MemoryImageStore {
    pub fn new(images: Vec<ImageRecord>, bucket_threshold: f64) -> Self {
        Self {
            images,
            bucket_threshold,
        }
    }

    pub fn from_json_file(path: &Path, bucket_threshold: f64) -> Result<Self, RetrievalError> {
        let catalog = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Unreachable(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&catalog, bucket_threshold)
    }

    pub fn from_json_str(catalog: &str, bucket_threshold: f64) -> Result<Self, RetrievalError> {
        let images: Vec<ImageRecord> =
            serde_json::from_str(catalog).map_err(|e| RetrievalError::Malformed(e.to_string()))?;
        log::info!("Loaded {} images into the in-memory catalog", images.len());
        Ok(Self::new(images, bucket_threshold))
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn fetch(&self, predicate: &Predicate) -> Result<Vec<ImageRecord>, RetrievalError> {
        Ok(self
            .images
            .iter()
            .filter(|image| predicate.matches(image, self.bucket_threshold))
            .cloned()
            .collect())
    }
}
