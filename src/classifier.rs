//! Decides per pixel whether the LUT applies or the color is preserved.

use crate::error::{GradeError, GradeResult};
use serde::Deserialize;

/// Slack on the hue band bounds. Hues of 8-bit pixels are rationals with
/// denominator at most `6 * 255`, so none sits this close to a whole-degree
/// bound without being equal to it; the slack only absorbs rounding.
const HUE_EPSILON: f64 = 1e-9;

/// Thresholds for the preserved-color and preserved-black tests.
///
/// Angles are read from config in degrees and converted to fractions of a
/// turn when the classifier is built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Center of the preserved hue band, in degrees.
    pub target_hue_degrees: f64,
    /// Half-width of the band, in degrees.
    pub hue_tolerance_degrees: f64,
    pub saturation_min: f64,
    pub value_min: f64,
    /// Channels strictly below this count as black.
    pub black_threshold: u8,
    /// Per-channel gain applied to preserved-color pixels.
    pub multipliers: [f32; 3],
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            target_hue_degrees: 48.0,
            hue_tolerance_degrees: 20.0,
            saturation_min: 0.7,
            value_min: 0.5,
            black_threshold: 50,
            multipliers: [1.05, 1.05, 0.95],
        }
    }
}

impl ClassifierConfig {
    /// Checks ranges and builds the classifier.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a value is not finite, the tolerance is negative,
    /// a multiplier is negative, or a saturation/value minimum is outside `[0, 1]`.
    pub fn build(&self) -> GradeResult<PixelClassifier> {
        if !self.target_hue_degrees.is_finite() {
            return Err(GradeError::Config("target hue must be finite".into()));
        }
        if !(self.hue_tolerance_degrees.is_finite() && self.hue_tolerance_degrees >= 0.0) {
            return Err(GradeError::Config(format!(
                "hue tolerance must be non-negative, got {}",
                self.hue_tolerance_degrees
            )));
        }
        for (name, v) in [("saturation_min", self.saturation_min), ("value_min", self.value_min)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(GradeError::Config(format!("{} must be in [0, 1], got {}", name, v)));
            }
        }
        if self.multipliers.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(GradeError::Config(format!(
                "multipliers must be finite and non-negative, got {:?}",
                self.multipliers
            )));
        }
        Ok(PixelClassifier {
            target_hue: self.target_hue_degrees / 360.0,
            hue_tolerance: self.hue_tolerance_degrees / 360.0,
            saturation_min: self.saturation_min,
            value_min: self.value_min,
            black_threshold: self.black_threshold,
            multipliers: self.multipliers,
        })
    }
}

/// What happens to one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Inside the preserved hue band; carries the boosted output.
    PreservedColor([u8; 3]),
    /// Deep black; carries the untouched input.
    PreservedBlack([u8; 3]),
    /// Neither; the LUT decides the output.
    LutMapped,
}

/// Outcome without its payload, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    PreservedColor,
    PreservedBlack,
    LutMapped,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::PreservedColor(_) => OutcomeKind::PreservedColor,
            Outcome::PreservedBlack(_) => OutcomeKind::PreservedBlack,
            Outcome::LutMapped => OutcomeKind::LutMapped,
        }
    }
}

/// Validated classifier. Hue values are fractions of a full turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelClassifier {
    target_hue: f64,
    hue_tolerance: f64,
    saturation_min: f64,
    value_min: f64,
    black_threshold: u8,
    multipliers: [f32; 3],
}

impl Default for PixelClassifier {
    fn default() -> Self {
        PixelClassifier {
            target_hue: 48.0 / 360.0,
            hue_tolerance: 20.0 / 360.0,
            saturation_min: 0.7,
            value_min: 0.5,
            black_threshold: 50,
            multipliers: [1.05, 1.05, 0.95],
        }
    }
}

impl PixelClassifier {
    /// Classifies one pixel. The preserved-color test runs before the black test.
    pub fn classify(&self, rgb: [u8; 3]) -> Outcome {
        if self.is_preserved_color(rgb) {
            Outcome::PreservedColor(self.boost(rgb))
        } else if self.is_black(rgb) {
            Outcome::PreservedBlack(rgb)
        } else {
            Outcome::LutMapped
        }
    }

    /// Closed hue band test plus the saturation and value minimums.
    pub fn is_preserved_color(&self, rgb: [u8; 3]) -> bool {
        let (h, s, v) = rgb_to_hsv(rgb);
        let lo = self.target_hue - self.hue_tolerance - HUE_EPSILON;
        let hi = self.target_hue + self.hue_tolerance + HUE_EPSILON;
        (lo..=hi).contains(&h) && s >= self.saturation_min && v >= self.value_min
    }

    pub fn is_black(&self, rgb: [u8; 3]) -> bool {
        rgb.iter().all(|&c| c < self.black_threshold)
    }

    fn boost(&self, rgb: [u8; 3]) -> [u8; 3] {
        let mut out = [0u8; 3];
        for ((o, &c), &m) in out.iter_mut().zip(&rgb).zip(&self.multipliers) {
            *o = (c as f32 * m).clamp(0.0, 255.0).round() as u8;
        }
        out
    }
}

/// Hexcone RGB to HSV. Hue is a fraction of a turn in `[0, 1)`; grey pixels
/// get hue and saturation 0.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f64, f64, f64) {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if max == min {
        return (0.0, 0.0, v);
    }
    let delta = max - min;
    let s = delta / max;

    let h = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

/// Converts channel values from a float source into a byte pixel.
///
/// Used by [`crate::file_handler::load_rgb`] for float images, so that
/// out-of-range samples are rejected instead of silently clamped.
///
/// # Errors
///
/// Returns `InvalidChannelValue` for NaN or anything outside `[0, 255]`.
pub fn checked_pixel(channels: [f32; 3]) -> GradeResult<[u8; 3]> {
    let mut out = [0u8; 3];
    for (o, c) in out.iter_mut().zip(channels) {
        if !(0.0..=255.0).contains(&c) {
            return Err(GradeError::InvalidChannelValue(c));
        }
        *o = c.round() as u8;
    }
    Ok(out)
}
