use async_trait::async_trait;
use shared::{ColorBucket, ImageRecord};

use crate::search::color::{self, HueRange};
use crate::search::labels;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RetrievalError {
    #[error("Image store unreachable: {0}")]
    Unreachable(String),
    #[error("Malformed image record: {0}")]
    Malformed(String),
}

/// Single-field predicates the catalog can answer directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,
    Owner(String),
    Label(String),
    /// Any color sample with a hue inside the range.
    HueRange(HueRange),
    /// The stored bucket flag is set.
    Bucket(ColorBucket),
}

impl Predicate {
    /// Evaluates the predicate against a record held in memory. Bucket flags are
    /// derived from the Lab samples with `bucket_threshold`.
    pub fn matches(&self, image: &ImageRecord, bucket_threshold: f64) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Owner(owner) => image.owner == *owner,
            Predicate::Label(label) => labels::contains_label(&image.labels, label),
            Predicate::HueRange(range) => image.colors.iter().any(|s| range.contains(s.hue)),
            Predicate::Bucket(bucket) => {
                color::bucket_flags(&image.colors, bucket_threshold).contains(bucket)
            }
        }
    }
}

/// The catalog the search engine reads from. Results keep the store's order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn fetch(&self, predicate: &Predicate) -> Result<Vec<ImageRecord>, RetrievalError>;
}
