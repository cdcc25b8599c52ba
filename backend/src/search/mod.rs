pub mod color;
pub mod fetcher;
pub mod labels;
pub mod query;
pub mod refine;

use serde_json::Value;
use shared::SearchResponse;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::db::image_store::{ImageStore, RetrievalError};
use fetcher::CandidateFetcher;
use query::{InvalidQueryError, Query};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidQuery(#[from] InvalidQueryError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn ImageStore>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(store: Arc<dyn ImageStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    pub async fn search(&self, raw: Value) -> Result<SearchResponse, SearchError> {
        let query = query::normalize(raw, &self.config)?;
        Ok(self.run(&query).await?)
    }

    pub async fn run(&self, query: &Query) -> Result<SearchResponse, RetrievalError> {
        let fetcher = CandidateFetcher::new(self.store.as_ref());
        let result = refine::refine(query, &fetcher).await?;

        log::info!(
            "Search matched {} images (primary facet {:?}, both fulfilled: {})",
            result.images.len(),
            refine::primary_facet(query),
            result.both_fulfilled
        );

        Ok(SearchResponse {
            images: result.images,
            both_fulfilled: query.priority.map(|_| result.both_fulfilled),
        })
    }
}
