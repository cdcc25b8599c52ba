//! DynamoDB-backed image catalog.
//!
//! Item layout written by the ingestion side:
//! `id`, `owner`, `name`, `type`, `url`, `thumbnail_url` (S), `width`, `height`,
//! `aspect_ratio` (N), `labels` (L of S), `colors` (L of M with `l`, `a`, `b`, `hue`)
//! and one `bucket_<name>` BOOL per color bucket.
//!
//! Owner and bucket predicates become scan filter expressions. Hue ranges and
//! labels are checked on the parsed records: a hue may sit anywhere in the
//! `colors` list and labels compare case-insensitively, neither of which a
//! filter expression can express.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use shared::{ColorBucket, ColorSample, ImageId, ImageRecord, Lab};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::image_store::{ImageStore, Predicate, RetrievalError};

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    images_table: String,
    bucket_threshold: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

impl From<RepositoryError> for RetrievalError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DynamoDb(msg) => RetrievalError::Unreachable(msg),
            RepositoryError::InvalidData(msg) => RetrievalError::Malformed(msg),
        }
    }
}

/// A scan filter expression with its placeholder bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

pub fn bucket_attribute(bucket: ColorBucket) -> String {
    format!("bucket_{}", bucket.as_ref())
}

/// Translates a predicate into a filter expression, or `None` when the scan
/// result is filtered in memory instead.
pub fn scan_filter(predicate: &Predicate) -> Option<ScanFilter> {
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    let expression = match predicate {
        Predicate::All | Predicate::Label(_) | Predicate::HueRange(_) => return None,
        Predicate::Owner(owner) => {
            names.insert("#owner".to_string(), "owner".to_string());
            values.insert(":owner".to_string(), AttributeValue::S(owner.clone()));
            "#owner = :owner".to_string()
        }
        Predicate::Bucket(bucket) => {
            names.insert("#bucket".to_string(), bucket_attribute(*bucket));
            values.insert(":flag".to_string(), AttributeValue::Bool(true));
            "#bucket = :flag".to_string()
        }
    };

    Some(ScanFilter {
        expression,
        names,
        values,
    })
}

impl DynamoDbRepository {
    pub fn new(client: Client, images_table: String, bucket_threshold: f64) -> Self {
        Self {
            client,
            images_table,
            bucket_threshold,
        }
    }

    async fn scan_images(&self, predicate: &Predicate) -> Result<Vec<ImageRecord>, RepositoryError> {
        let filter = scan_filter(predicate);
        let mut images = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.images_table)
                .set_exclusive_start_key(start_key.take());

            if let Some(filter) = &filter {
                request = request
                    .filter_expression(filter.expression.clone())
                    .set_expression_attribute_names(Some(filter.names.clone()))
                    .set_expression_attribute_values(Some(filter.values.clone()));
            }

            let result = request.send().await.map_err(|e| {
                log::error!(
                    "DynamoDB scan on '{}' failed for {:?}: {:?}",
                    self.images_table,
                    predicate,
                    e
                );
                RepositoryError::DynamoDb(e.to_string())
            })?;

            if let Some(items) = result.items {
                for item in items {
                    let image = parse_image_from_item(&item)?;
                    if filter.is_some() || predicate.matches(&image, self.bucket_threshold) {
                        images.push(image);
                    }
                }
            }

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        log::debug!(
            "Scanned {} images from '{}' for {:?}",
            images.len(),
            self.images_table,
            predicate
        );
        Ok(images)
    }
}

#[async_trait]
impl ImageStore for DynamoDbRepository {
    async fn fetch(&self, predicate: &Predicate) -> Result<Vec<ImageRecord>, RetrievalError> {
        Ok(self.scan_images(predicate).await?)
    }
}

fn string_attr(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", key)))
}

fn number_attr<T: FromStr>(item: &Item, key: &str) -> Result<T, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<T>().ok())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", key)))
}

fn parse_color_sample(value: &AttributeValue) -> Result<ColorSample, RepositoryError> {
    let sample = value
        .as_m()
        .map_err(|_| RepositoryError::InvalidData("Invalid colors entry".to_string()))?;

    let lab = Lab::new(
        number_attr(sample, "l")?,
        number_attr(sample, "a")?,
        number_attr(sample, "b")?,
    );
    Ok(ColorSample::new(lab, number_attr(sample, "hue")?))
}

pub fn parse_image_from_item(item: &Item) -> Result<ImageRecord, RepositoryError> {
    let id = item
        .get("id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(ImageId)
        .ok_or_else(|| RepositoryError::InvalidData("Invalid id".to_string()))?;

    let colors = match item.get("colors") {
        Some(value) => value
            .as_l()
            .map_err(|_| RepositoryError::InvalidData("Invalid colors".to_string()))?
            .iter()
            .map(parse_color_sample)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let labels = match item.get("labels") {
        Some(value) => value
            .as_l()
            .map_err(|_| RepositoryError::InvalidData("Invalid labels".to_string()))?
            .iter()
            .map(|label| {
                label
                    .as_s()
                    .map(|s| s.to_lowercase())
                    .map_err(|_| RepositoryError::InvalidData("Invalid label".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let width: u32 = number_attr(item, "width")?;
    let height: u32 = number_attr(item, "height")?;
    let aspect_ratio = match item.get("aspect_ratio") {
        Some(_) => number_attr(item, "aspect_ratio")?,
        None if height > 0 => f64::from(width) / f64::from(height),
        None => 0.0,
    };

    Ok(ImageRecord {
        id,
        owner: string_attr(item, "owner")?,
        name: string_attr(item, "name")?,
        media_type: string_attr(item, "type")?,
        url: string_attr(item, "url")?,
        thumbnail_url: string_attr(item, "thumbnail_url")?,
        width,
        height,
        aspect_ratio,
        colors,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::color::HueRange;

    fn n(value: f64) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_string())
    }

    fn stored_item() -> Item {
        let mut sample = HashMap::new();
        sample.insert("l".to_string(), n(53.2));
        sample.insert("a".to_string(), n(80.1));
        sample.insert("b".to_string(), n(67.2));
        sample.insert("hue".to_string(), n(4.5));

        let mut item = HashMap::new();
        item.insert("id".to_string(), s("8c1f3a0e-7d1b-4c4e-9a51-2f6a1d0b9e11"));
        item.insert("owner".to_string(), s("guest"));
        item.insert("name".to_string(), s("sunset"));
        item.insert("type".to_string(), s("image/jpeg"));
        item.insert("url".to_string(), s("https://img/sunset.jpg"));
        item.insert("thumbnail_url".to_string(), s("https://img/thumb.jpg"));
        item.insert("width".to_string(), n(1200.0));
        item.insert("height".to_string(), n(800.0));
        item.insert(
            "labels".to_string(),
            AttributeValue::L(vec![s("sky"), s("Cloud")]),
        );
        item.insert(
            "colors".to_string(),
            AttributeValue::L(vec![AttributeValue::M(sample)]),
        );
        item.insert(bucket_attribute(ColorBucket::Red), AttributeValue::Bool(true));
        item
    }

    #[test]
    fn parses_a_stored_item() {
        let image = parse_image_from_item(&stored_item()).unwrap();
        assert_eq!(image.owner, "guest");
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.aspect_ratio, 1.5);
        assert_eq!(image.labels, vec!["sky", "cloud"]);
        assert_eq!(image.colors, vec![ColorSample::new(Lab::new(53.2, 80.1, 67.2), 4.5)]);
    }

    #[test]
    fn malformed_items_map_to_malformed_retrieval_errors() {
        let mut item = stored_item();
        item.insert("width".to_string(), s("wide"));
        let err = parse_image_from_item(&item).unwrap_err();
        assert!(matches!(
            RetrievalError::from(err),
            RetrievalError::Malformed(_)
        ));

        let mut item = stored_item();
        item.remove("id");
        assert!(parse_image_from_item(&item).is_err());
    }

    #[test]
    fn hue_ranges_and_labels_are_filtered_after_the_scan() {
        let range = Predicate::HueRange(HueRange {
            min: 290.0,
            max: 310.0,
        });
        assert!(scan_filter(&range).is_none());
        assert!(scan_filter(&Predicate::Label("sky".into())).is_none());

        // The matching hue is the fourth sample.
        let mut item = stored_item();
        let samples = [4.5, 120.0, 200.0, 300.0]
            .into_iter()
            .map(|hue| {
                let mut sample = HashMap::new();
                sample.insert("l".to_string(), n(50.0));
                sample.insert("a".to_string(), n(0.0));
                sample.insert("b".to_string(), n(0.0));
                sample.insert("hue".to_string(), n(hue));
                AttributeValue::M(sample)
            })
            .collect();
        item.insert("colors".to_string(), AttributeValue::L(samples));
        item.insert("labels".to_string(), AttributeValue::L(vec![s("Sky")]));

        let image = parse_image_from_item(&item).unwrap();
        assert!(range.matches(&image, 25.0));
        assert!(Predicate::Label("sky".into()).matches(&image, 25.0));
    }

    #[test]
    fn reserved_words_are_bound_through_placeholders() {
        let owner = scan_filter(&Predicate::Owner("guest".into())).unwrap();
        assert_eq!(owner.expression, "#owner = :owner");
        assert_eq!(owner.names.get("#owner").map(String::as_str), Some("owner"));

        let bucket = scan_filter(&Predicate::Bucket(ColorBucket::BlueViolet)).unwrap();
        assert_eq!(
            bucket.names.get("#bucket").map(String::as_str),
            Some("bucket_blueViolet")
        );
        assert_eq!(bucket.values.get(":flag"), Some(&AttributeValue::Bool(true)));

        assert!(scan_filter(&Predicate::All).is_none());
    }
}
