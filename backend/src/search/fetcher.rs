use futures::future::try_join_all;
use shared::ImageRecord;
use std::collections::HashSet;

use super::color::{self, ColorFacet};
use super::labels;
use crate::db::image_store::{ImageStore, Predicate, RetrievalError};

/// Keeps the first occurrence of every image identity, preserving order.
pub fn dedup_by_identity(images: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let mut seen = HashSet::new();
    images
        .into_iter()
        .filter(|image| seen.insert(image.id))
        .collect()
}

/// Retrieves the initial candidate set for one facet. Only the first color or
/// label goes to the store; the rest are checked in memory.
pub struct CandidateFetcher<'a> {
    store: &'a dyn ImageStore,
}

impl<'a> CandidateFetcher<'a> {
    pub fn new(store: &'a dyn ImageStore) -> Self {
        Self { store }
    }

    pub async fn fetch_all(&self) -> Result<Vec<ImageRecord>, RetrievalError> {
        self.fetch_joined(vec![Predicate::All]).await
    }

    pub async fn fetch_by_owner(&self, owner: &str) -> Result<Vec<ImageRecord>, RetrievalError> {
        self.fetch_joined(vec![Predicate::Owner(owner.to_string())])
            .await
    }

    pub async fn fetch_by_color(
        &self,
        facet: &ColorFacet,
        tolerance: f64,
    ) -> Result<Vec<ImageRecord>, RetrievalError> {
        let predicates = match facet {
            ColorFacet::Hues(hues) => match hues.first() {
                Some(&hue) => color::hue_ranges(hue, tolerance)
                    .into_iter()
                    .map(Predicate::HueRange)
                    .collect(),
                None => return self.fetch_all().await,
            },
            ColorFacet::Buckets(buckets) => match buckets.first() {
                Some(&bucket) => vec![Predicate::Bucket(bucket)],
                None => return self.fetch_all().await,
            },
        };

        let candidates = self.fetch_joined(predicates).await?;
        Ok(candidates
            .into_iter()
            .filter(|image| facet.matches(&image.colors, tolerance))
            .collect())
    }

    pub async fn fetch_by_label(
        &self,
        required: &[String],
    ) -> Result<Vec<ImageRecord>, RetrievalError> {
        let Some(first) = required.first() else {
            return self.fetch_all().await;
        };

        let candidates = self
            .fetch_joined(vec![Predicate::Label(first.clone())])
            .await?;
        Ok(candidates
            .into_iter()
            .filter(|image| labels::contains_all(&image.labels, &required[1..]))
            .collect())
    }

    /// Issues every predicate concurrently and fails as soon as one fails.
    async fn fetch_joined(
        &self,
        predicates: Vec<Predicate>,
    ) -> Result<Vec<ImageRecord>, RetrievalError> {
        log::debug!("Fetching candidates with {:?}", predicates);
        let batches = try_join_all(predicates.iter().map(|p| self.store.fetch(p))).await?;
        Ok(dedup_by_identity(batches.into_iter().flatten().collect()))
    }
}
