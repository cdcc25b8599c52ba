use shared::{ImageRecord, Priority};

use super::fetcher::CandidateFetcher;
use super::labels;
use super::query::Query;
use crate::db::image_store::RetrievalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Owner,
    Colors,
    Labels,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub images: Vec<ImageRecord>,
    /// Colors and labels were both requested and jointly satisfied.
    pub both_fulfilled: bool,
}

/// The facet fetched from the store; every other present facet becomes a post-filter.
pub fn primary_facet(query: &Query) -> Facet {
    if query.owner.is_some() {
        return Facet::Owner;
    }
    match query.priority {
        Some(Priority::Colors) if query.colors.is_some() => return Facet::Colors,
        Some(Priority::Labels) if query.labels.is_some() => return Facet::Labels,
        _ => {}
    }
    if query.colors.is_some() {
        Facet::Colors
    } else if query.labels.is_some() {
        Facet::Labels
    } else {
        Facet::All
    }
}

/// Present color/label facets in refinement order: labels first only when they have priority.
pub fn facet_order(query: &Query) -> Vec<Facet> {
    let order = match query.priority {
        Some(Priority::Labels) => [Facet::Labels, Facet::Colors],
        _ => [Facet::Colors, Facet::Labels],
    };
    order
        .into_iter()
        .filter(|facet| match facet {
            Facet::Colors => query.colors.is_some(),
            Facet::Labels => query.labels.is_some(),
            _ => false,
        })
        .collect()
}

pub fn refine_by_facet(images: &[ImageRecord], facet: Facet, query: &Query) -> Vec<ImageRecord> {
    images
        .iter()
        .filter(|image| match facet {
            Facet::Colors => query
                .colors
                .as_ref()
                .is_none_or(|colors| colors.matches(&image.colors, query.tolerance)),
            Facet::Labels => query
                .labels
                .as_ref()
                .is_none_or(|required| labels::contains_all(&image.labels, required)),
            Facet::Owner => query.owner.as_ref().is_none_or(|owner| image.owner == *owner),
            Facet::All => true,
        })
        .cloned()
        .collect()
}

/// Applies the non-primary facets to the primary candidates.
///
/// When both colors and labels are present the later one in facet order only
/// narrows the set if something survives; otherwise the set from before that
/// step is kept and `both_fulfilled` stays false.
pub fn apply_facets(query: &Query, primary: Facet, candidates: Vec<ImageRecord>) -> ResultSet {
    let mut order = facet_order(query).into_iter();
    let hard = order.next();
    let soft = order.next();
    let mut images = candidates;

    if let Some(facet) = hard.filter(|facet| *facet != primary) {
        images = refine_by_facet(&images, facet, query);
    }

    let Some(facet) = soft else {
        return ResultSet {
            images,
            both_fulfilled: false,
        };
    };

    let narrowed = refine_by_facet(&images, facet, query);
    if narrowed.is_empty() {
        log::debug!(
            "No image satisfies both colors and labels, falling back to {} {:?} matches",
            images.len(),
            hard.unwrap_or(primary)
        );
        ResultSet {
            images,
            both_fulfilled: false,
        }
    } else {
        ResultSet {
            images: narrowed,
            both_fulfilled: true,
        }
    }
}

/// Fetches by the primary facet, then refines in memory.
pub async fn refine(
    query: &Query,
    fetcher: &CandidateFetcher<'_>,
) -> Result<ResultSet, RetrievalError> {
    let primary = primary_facet(query);

    let candidates = match (primary, &query.owner, &query.colors, &query.labels) {
        (Facet::Owner, Some(owner), _, _) => fetcher.fetch_by_owner(owner).await?,
        (Facet::Colors, _, Some(colors), _) => {
            fetcher.fetch_by_color(colors, query.tolerance).await?
        }
        (Facet::Labels, _, _, Some(labels)) => fetcher.fetch_by_label(labels).await?,
        _ => fetcher.fetch_all().await?,
    };
    log::debug!("{:?} fetch returned {} candidates", primary, candidates.len());

    Ok(apply_facets(query, primary, candidates))
}
