use serde_json::Value;
use shared::{ColorBucket, ColorsField, Priority, SearchRequest};
use std::collections::HashSet;
use std::str::FromStr;

use super::color::{ColorFacet, ColorMode};
use crate::config::SearchConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidQueryError {
    #[error("Malformed query: {0}")]
    Malformed(String),
    #[error("Unknown priority '{0}', expected 'colors' or 'labels'")]
    UnknownPriority(String),
    #[error("Unknown color bucket '{0}'")]
    UnknownBucket(String),
    #[error("Hue {0} is outside [0, 360)")]
    HueOutOfRange(f64),
    #[error("Similarity range must be a non-negative number, got {0}")]
    InvalidTolerance(f64),
    #[error("Colors sent as {sent} but this deployment matches {expected:?} colors")]
    ColorModeMismatch {
        sent: &'static str,
        expected: ColorMode,
    },
}

/// A search query in canonical form. `None` means the facet is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub owner: Option<String>,
    pub colors: Option<ColorFacet>,
    pub labels: Option<Vec<String>>,
    pub tolerance: f64,
    pub priority: Option<Priority>,
}

pub fn normalize(raw: Value, config: &SearchConfig) -> Result<Query, InvalidQueryError> {
    let request: SearchRequest = match raw {
        Value::Null => SearchRequest::default(),
        raw => serde_json::from_value(raw)
            .map_err(|e| InvalidQueryError::Malformed(e.to_string()))?,
    };
    normalize_request(request, config)
}

pub fn normalize_request(
    request: SearchRequest,
    config: &SearchConfig,
) -> Result<Query, InvalidQueryError> {
    let owner = request.owner.filter(|owner| !owner.is_empty());

    let colors = match request.colors {
        Some(field) => normalize_colors(field, config.color_mode)?,
        None => None,
    };

    let labels = request.labels.and_then(normalize_labels);

    let tolerance = match request.similarity_range {
        Some(range) if !range.is_finite() || range < 0.0 => {
            return Err(InvalidQueryError::InvalidTolerance(range));
        }
        Some(range) => range,
        None => config.default_tolerance(),
    };

    let priority = match request.priority.as_deref() {
        None | Some("") => None,
        Some(token) => Some(
            Priority::from_str(token)
                .map_err(|_| InvalidQueryError::UnknownPriority(token.to_string()))?,
        ),
    };

    Ok(Query {
        owner,
        colors,
        labels,
        tolerance,
        priority,
    })
}

fn normalize_colors(
    field: ColorsField,
    mode: ColorMode,
) -> Result<Option<ColorFacet>, InvalidQueryError> {
    let facet = match field {
        ColorsField::Hues(hues) => {
            if hues.is_empty() {
                return Ok(None);
            }
            if mode != ColorMode::Hue {
                return Err(InvalidQueryError::ColorModeMismatch {
                    sent: "hue degrees",
                    expected: mode,
                });
            }
            if let Some(&hue) = hues.iter().find(|h| !(0.0..360.0).contains(*h)) {
                return Err(InvalidQueryError::HueOutOfRange(hue));
            }
            ColorFacet::Hues(hues)
        }
        ColorsField::Buckets(flags) => {
            let mut buckets = Vec::new();
            for (name, wanted) in flags {
                let bucket = ColorBucket::from_str(&name)
                    .map_err(|_| InvalidQueryError::UnknownBucket(name.clone()))?;
                if wanted {
                    buckets.push(bucket);
                }
            }
            if buckets.is_empty() {
                return Ok(None);
            }
            if mode != ColorMode::Lab {
                return Err(InvalidQueryError::ColorModeMismatch {
                    sent: "bucket flags",
                    expected: mode,
                });
            }
            buckets.sort();
            ColorFacet::Buckets(buckets)
        }
    };
    Ok(Some(facet))
}

fn normalize_labels(labels: Vec<String>) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let labels: Vec<String> = labels
        .iter()
        .map(|label| label.trim().to_lowercase())
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(label.clone()))
        .collect();

    (!labels.is_empty()).then_some(labels)
}
