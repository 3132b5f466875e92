//! One grading pass over an RGB pixel grid.

use crate::classifier::{Outcome, OutcomeKind, PixelClassifier};
use crate::error::{GradeError, GradeResult};
use crate::lut3d::{unit_to_byte, Lut3D};
use image::RgbImage;
use rayon::prelude::*;
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// Rows between progress reports.
const PROGRESS_EVERY: usize = 100;

/// Per-category pixel counts for one graded image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeCounts {
    pub preserved_color: u64,
    pub preserved_black: u64,
    pub lut_mapped: u64,
}

impl GradeCounts {
    pub fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::PreservedColor => self.preserved_color += 1,
            OutcomeKind::PreservedBlack => self.preserved_black += 1,
            OutcomeKind::LutMapped => self.lut_mapped += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.preserved_color + self.preserved_black + self.lut_mapped
    }
}

impl Add for GradeCounts {
    type Output = GradeCounts;

    fn add(self, rhs: GradeCounts) -> GradeCounts {
        GradeCounts {
            preserved_color: self.preserved_color + rhs.preserved_color,
            preserved_black: self.preserved_black + rhs.preserved_black,
            lut_mapped: self.lut_mapped + rhs.lut_mapped,
        }
    }
}

impl AddAssign for GradeCounts {
    fn add_assign(&mut self, rhs: GradeCounts) {
        *self = *self + rhs;
    }
}

/// Grades a single pixel: classify, then sample the LUT only when needed.
pub fn grade_pixel(
    lut: &Lut3D,
    classifier: &PixelClassifier,
    rgb: [u8; 3],
) -> ([u8; 3], OutcomeKind) {
    let outcome = classifier.classify(rgb);
    let out = match outcome {
        Outcome::PreservedColor(out) | Outcome::PreservedBlack(out) => out,
        Outcome::LutMapped => {
            let mapped = lut.sample(rgb);
            [
                unit_to_byte(mapped[0]),
                unit_to_byte(mapped[1]),
                unit_to_byte(mapped[2]),
            ]
        }
    };
    (out, outcome.kind())
}

/// Grades every pixel of `image` into a new image of the same size.
///
/// Rows are spread over the rayon pool; each row is written by exactly one
/// worker and its counts are summed afterwards.
pub fn process(
    image: &RgbImage,
    lut: &Lut3D,
    classifier: &PixelClassifier,
) -> (RgbImage, GradeCounts) {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    let counts = grade_rows(image, &mut out, lut, classifier, || false).unwrap_or_default();
    (out, counts)
}

/// Like [`process`], but checks `cancel` before each row.
///
/// # Errors
///
/// Returns `Cancelled` if the flag is set before all rows are done. No partial
/// image is returned.
pub fn process_cancellable(
    image: &RgbImage,
    lut: &Lut3D,
    classifier: &PixelClassifier,
    cancel: &AtomicBool,
) -> GradeResult<(RgbImage, GradeCounts)> {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    let counts = grade_rows(image, &mut out, lut, classifier, || cancel.load(Ordering::Relaxed))
        .ok_or(GradeError::Cancelled)?;
    Ok((out, counts))
}

/// Writes graded rows of `src` into `dst`. `None` when `stop` fired.
fn grade_rows<F>(
    src: &RgbImage,
    dst: &mut RgbImage,
    lut: &Lut3D,
    classifier: &PixelClassifier,
    stop: F,
) -> Option<GradeCounts>
where
    F: Fn() -> bool + Sync,
{
    let row_len = src.width() as usize * 3;
    if row_len == 0 || src.height() == 0 {
        return Some(GradeCounts::default());
    }
    let total_rows = src.height() as usize;
    let rows_done = AtomicUsize::new(0);

    let dst: &mut [u8] = dst;
    dst.par_chunks_mut(row_len)
        .zip(src.as_raw().par_chunks(row_len))
        .map(|(dst_row, src_row)| {
            if stop() {
                return None;
            }
            let mut counts = GradeCounts::default();
            for (dst_px, src_px) in dst_row.chunks_exact_mut(3).zip(src_row.chunks_exact(3)) {
                let (rgb, kind) = grade_pixel(lut, classifier, [src_px[0], src_px[1], src_px[2]]);
                dst_px.copy_from_slice(&rgb);
                counts.record(kind);
            }
            let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_EVERY == 0 {
                let pct = done as f64 / total_rows as f64 * 100.0;
                debug!(rows = done, total = total_rows, "progress {:.1}%", pct);
            }
            Some(counts)
        })
        .try_reduce(GradeCounts::default, |a, b| Some(a + b))
}
