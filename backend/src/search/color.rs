use serde::{Deserialize, Serialize};
use shared::{ColorBucket, ColorSample, Lab};
use std::collections::BTreeSet;
use strum::IntoEnumIterator;

const FULL_TURN: f64 = 360.0;
const HALF_TURN: f64 = 180.0;
/// Outward padding on range ends so `reference ± tolerance` rounding never
/// excludes a hue that `hue_is_similar` accepts.
const RANGE_SLACK: f64 = 1e-9;

/// Which comparison space a deployment matches colors in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Hue,
    Lab,
}

/// The colors a query asks for, already validated for the active mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorFacet {
    Hues(Vec<f64>),
    Buckets(Vec<ColorBucket>),
}

impl ColorFacet {
    /// True when every requested color is similar to at least one of the samples.
    pub fn matches(&self, samples: &[ColorSample], tolerance: f64) -> bool {
        match self {
            ColorFacet::Hues(hues) => hues
                .iter()
                .all(|&hue| samples.iter().any(|s| hue_is_similar(hue, s.hue, tolerance))),
            ColorFacet::Buckets(buckets) => buckets.iter().all(|bucket| {
                let reference = bucket.reference();
                samples
                    .iter()
                    .any(|s| lab_is_similar(&reference, &s.lab, tolerance))
            }),
        }
    }
}

/// Inclusive hue interval on the wheel, never wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueRange {
    pub min: f64,
    pub max: f64,
}

impl HueRange {
    pub fn contains(&self, hue: f64) -> bool {
        self.min <= hue && hue <= self.max
    }
}

pub fn hue_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    diff.min(FULL_TURN - diff)
}

pub fn hue_is_similar(reference: f64, candidate: f64, tolerance: f64) -> bool {
    hue_distance(reference, candidate) <= tolerance
}

/// Splits the window `reference ± tolerance` into ranges that do not cross 0°.
/// The ranges may admit hues a hair outside the window; callers re-check with
/// `hue_is_similar`.
pub fn hue_ranges(reference: f64, tolerance: f64) -> Vec<HueRange> {
    if tolerance >= HALF_TURN {
        return vec![HueRange {
            min: 0.0,
            max: FULL_TURN,
        }];
    }

    let low = reference - tolerance - RANGE_SLACK;
    let high = reference + tolerance + RANGE_SLACK;

    if low < 0.0 {
        vec![
            HueRange { min: 0.0, max: high },
            HueRange {
                min: FULL_TURN + low,
                max: FULL_TURN,
            },
        ]
    } else if high >= FULL_TURN {
        vec![
            HueRange {
                min: low,
                max: FULL_TURN,
            },
            HueRange {
                min: 0.0,
                max: high - FULL_TURN,
            },
        ]
    } else {
        vec![HueRange {
            min: low,
            max: high,
        }]
    }
}

/// Strictly closer than `tolerance` in CIEDE2000. A zero tolerance only admits identical colors.
pub fn lab_is_similar(reference: &Lab, candidate: &Lab, tolerance: f64) -> bool {
    let distance = delta_e_2000(reference, candidate);
    if tolerance <= 0.0 {
        distance == 0.0
    } else {
        distance < tolerance
    }
}

/// CIEDE2000 color difference with unit weighting factors (kL = kC = kH = 1).
pub fn delta_e_2000(x: &Lab, y: &Lab) -> f64 {
    let pow25_7 = 25f64.powi(7);

    let c1 = x.a.hypot(x.b);
    let c2 = y.a.hypot(y.b);
    let c_bar7 = ((c1 + c2) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + pow25_7)).sqrt());

    let a1 = (1.0 + g) * x.a;
    let a2 = (1.0 + g) * y.a;
    let c1p = a1.hypot(x.b);
    let c2p = a2.hypot(y.b);
    let h1p = hue_angle(x.b, a1);
    let h2p = hue_angle(y.b, a2);

    let delta_l = y.l - x.l;
    let delta_c = c2p - c1p;
    let chroma_product = c1p * c2p;

    let delta_h = if chroma_product == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff > HALF_TURN {
            diff - FULL_TURN
        } else if diff < -HALF_TURN {
            diff + FULL_TURN
        } else {
            diff
        }
    };
    let delta_big_h = 2.0 * chroma_product.sqrt() * (delta_h / 2.0).to_radians().sin();

    let l_bar = (x.l + y.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= HALF_TURN {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < FULL_TURN {
        (h1p + h2p + FULL_TURN) / 2.0
    } else {
        (h1p + h2p - FULL_TURN) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + pow25_7)).sqrt();
    let l_offset = (l_bar - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

    let l_term = delta_l / s_l;
    let c_term = delta_c / s_c;
    let h_term = delta_big_h / s_h;

    (l_term * l_term + c_term * c_term + h_term * h_term + r_t * c_term * h_term).sqrt()
}

fn hue_angle(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    b.atan2(a_prime).to_degrees().rem_euclid(FULL_TURN)
}

/// Buckets whose reference color lies within `threshold` of any sample.
pub fn bucket_flags(samples: &[ColorSample], threshold: f64) -> BTreeSet<ColorBucket> {
    ColorBucket::iter()
        .filter(|bucket| {
            let reference = bucket.reference();
            samples
                .iter()
                .any(|s| lab_is_similar(&reference, &s.lab, threshold))
        })
        .collect()
}
