use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use strum_macros::{AsRefStr, EnumIter, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct ImageId(pub Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

/// A color in CIE L*a*b* space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }
}

/// One dominant color of an image, carried both as Lab and as a hue degree in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    #[serde(flatten)]
    pub lab: Lab,
    pub hue: f64,
}

impl ColorSample {
    pub fn new(lab: Lab, hue: f64) -> Self {
        Self { lab, hue }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    AsRefStr,
    strum_macros::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum ColorBucket {
    #[strum(serialize = "red")]
    Red,
    #[strum(serialize = "redOrange")]
    RedOrange,
    #[strum(serialize = "orange")]
    Orange,
    #[strum(serialize = "orangeYellow")]
    OrangeYellow,
    #[strum(serialize = "yellow")]
    Yellow,
    #[strum(serialize = "yellowGreen")]
    YellowGreen,
    #[strum(serialize = "green")]
    Green,
    #[strum(serialize = "greenBlue")]
    GreenBlue,
    #[strum(serialize = "blue")]
    Blue,
    #[strum(serialize = "blueViolet")]
    BlueViolet,
    #[strum(serialize = "violet")]
    Violet,
    #[strum(serialize = "violetRed")]
    VioletRed,
}

impl ColorBucket {
    /// Reference Lab color the bucket is matched against.
    pub fn reference(&self) -> Lab {
        match self {
            ColorBucket::Red => Lab::new(53.239, 80.09, 67.201),
            ColorBucket::RedOrange => Lab::new(57.58, 67.78, 68.957),
            ColorBucket::Orange => Lab::new(74.935, 23.929, 78.949),
            ColorBucket::OrangeYellow => Lab::new(77.238, 20.644, 64.452),
            ColorBucket::Yellow => Lab::new(97.139, -21.558, 94.477),
            ColorBucket::YellowGreen => Lab::new(91.957, -52.483, 81.863),
            ColorBucket::Green => Lab::new(46.228, -51.699, 49.897),
            ColorBucket::GreenBlue => Lab::new(42.043, 7.594, -48.801),
            ColorBucket::Blue => Lab::new(32.299, 79.191, -107.865),
            ColorBucket::BlueViolet => Lab::new(42.188, 69.847, -74.771),
            ColorBucket::Violet => Lab::new(69.695, 56.357, -36.819),
            ColorBucket::VioletRed => Lab::new(44.766, 70.992, -15.176),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: ImageId,
    pub owner: String,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    #[serde(default)]
    pub colors: Vec<ColorSample>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ImageRecord {
    /// Builds a catalog entry the way ingestion stores it: the file extension is
    /// dropped from the name, labels are lowercased and the aspect ratio is derived.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: String,
        file_name: &str,
        media_type: String,
        url: String,
        thumbnail_url: String,
        width: u32,
        height: u32,
        colors: Vec<ColorSample>,
        labels: Vec<String>,
    ) -> Self {
        let name = Path::new(file_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        let aspect_ratio = if height == 0 {
            0.0
        } else {
            f64::from(width) / f64::from(height)
        };

        Self {
            id: ImageId::new(),
            owner,
            name,
            media_type,
            url,
            thumbnail_url,
            width,
            height,
            aspect_ratio,
            colors,
            labels: labels.into_iter().map(|l| l.to_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, strum_macros::Display)]
pub enum Priority {
    #[strum(serialize = "colors")]
    Colors,
    #[strum(serialize = "labels")]
    Labels,
}

/// The two accepted shapes of the `colors` search field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorsField {
    Hues(Vec<f64>),
    Buckets(BTreeMap<String, bool>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub colors: Option<ColorsField>,
    #[serde(default)]
    pub similarity_range: Option<f64>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub images: Vec<ImageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub both_fulfilled: Option<bool>,
}
