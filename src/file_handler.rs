use crate::classifier::PixelClassifier;
use crate::config::Config;
use crate::classifier::checked_pixel;
use crate::error::GradeResult;
use crate::lut3d::Lut3D;
use crate::metadata_handler::copy_metadata;
use crate::pipeline::{self, GradeCounts};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageReader, Rgb, Rgb32FImage, RgbImage};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Extensions (lowercase) treated as gradeable images.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Totals for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// LUTs that parsed and were applied
    pub luts: usize,
    /// LUTs that failed to load
    pub failed_luts: usize,
    /// Images written
    pub graded: usize,
    /// Images that failed to decode, grade or save
    pub failed: usize,
    /// Pixel counts summed over every graded image
    pub counts: GradeCounts,
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// `.cube` file names (case-insensitive extension) directly inside `lut_dir`,
/// sorted. An unreadable directory yields an empty list.
pub fn list_luts(lut_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(lut_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), &["cube"]))
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .collect();
    if names.is_empty() {
        warn!(dir = %lut_dir.display(), "no .cube files found");
    }
    names.sort();
    names
}

/// Resolves the images to grade.
///
/// With `names`, each is looked up inside `image_dir`; missing ones are
/// logged and skipped. Without, `image_dir` is walked recursively for PNG
/// and JPEG files.
pub fn collect_images(image_dir: &Path, names: &[String]) -> Vec<PathBuf> {
    if !names.is_empty() {
        return names
            .iter()
            .map(|name| image_dir.join(name))
            .filter(|path| {
                let found = path.is_file();
                if !found {
                    warn!(path = %path.display(), "image not found");
                }
                found
            })
            .collect();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(image_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file() && has_extension(e.path(), &IMAGE_EXTENSIONS))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Short name for a LUT file: the stem, lowercased, whitespace runs replaced by `_`.
///
/// `Cinematic Tones 02.cube` becomes `cinematic_tones_02`.
pub fn lut_label(lut_file: &Path) -> String {
    let stem = lut_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    stem.split_whitespace().collect::<Vec<_>>().join("_")
}

/// `<output_root>/<label>/<subdir>/<image stem>_<label>.png`, where `subdir`
/// is the image's directory relative to `image_dir`.
///
/// Keeping the relative directory stops `a.png` and `sub/a.png` from
/// writing the same file.
pub fn output_path(output_root: &Path, label: &str, image_dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut out = output_root.join(label);
    let subdir = image.strip_prefix(image_dir).ok().and_then(Path::parent);
    if let Some(subdir) = subdir.filter(|d| !d.as_os_str().is_empty()) {
        out.push(subdir);
    }
    out.join(format!("{}_{}.png", stem, label))
}

/// Decodes an image file to 8-bit RGB, dropping any alpha channel.
///
/// 32-bit float images are scaled from `[0, 1]` and checked per pixel, so
/// HDR values above 1.0 or NaN fail with `InvalidChannelValue`.
pub fn load_rgb(path: &Path) -> GradeResult<RgbImage> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    match &img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            float_to_rgb8(&img.to_rgb32f())
        }
        _ => Ok(img.to_rgb8()),
    }
}

/// Converts a unit-range float image to bytes through [`checked_pixel`].
pub(crate) fn float_to_rgb8(img: &Rgb32FImage) -> GradeResult<RgbImage> {
    let (w, h) = img.dimensions();
    let mut out = RgbImage::new(w, h);
    for (dst, src) in out.pixels_mut().zip(img.pixels()) {
        let [r, g, b] = src.0;
        *dst = Rgb(checked_pixel([r * 255.0, g * 255.0, b * 255.0])?);
    }
    Ok(out)
}

/// Encodes `img` as PNG (default compression, adaptive filtering).
/// Returns the written file size in bytes.
pub fn save_png(img: &RgbImage, path: &Path) -> GradeResult<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    {
        let writer = BufWriter::new(File::create(path)?);
        let encoder =
            PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
        img.write_with_encoder(encoder)?;
    }
    Ok(fs::metadata(path)?.len())
}

/// Grades one image file and writes the result as PNG.
///
/// # Arguments
/// * `input` - Source image (PNG or JPEG)
/// * `output` - Destination PNG path; parent directories are created
/// * `lut` - Parsed lattice shared by the whole batch
/// * `classifier` - Preserved-color and preserved-black policy
/// * `keep_metadata` - Copy EXIF from `input` to `output`; failures only warn
pub fn grade_file(
    input: &Path,
    output: &Path,
    lut: &Lut3D,
    classifier: &PixelClassifier,
    keep_metadata: bool,
) -> GradeResult<GradeCounts> {
    let img = load_rgb(input)?;
    let (w, h) = img.dimensions();
    info!(input = %input.display(), width = w, height = h, "grading");

    let (graded, counts) = pipeline::process(&img, lut, classifier);
    let bytes = save_png(&graded, output)?;

    if keep_metadata {
        match copy_metadata(input, output) {
            Ok(true) => {}
            Ok(false) => debug!(input = %input.display(), "no EXIF support for this format"),
            Err(e) => warn!(input = %input.display(), "{}", e),
        }
    }

    info!(
        output = %output.display(),
        size_mb = bytes as f64 / (1024.0 * 1024.0),
        preserved_color = counts.preserved_color,
        preserved_black = counts.preserved_black,
        lut_mapped = counts.lut_mapped,
        "saved"
    );
    Ok(counts)
}

/// Applies every configured LUT to every configured image.
///
/// Each LUT is parsed once and reused for all images. A LUT that fails to
/// load, or an image that fails to grade, is logged and counted; the batch
/// carries on with the next item.
///
/// # Errors
///
/// Only an invalid classifier configuration aborts the batch.
pub fn run_batch(config: &Config) -> GradeResult<BatchReport> {
    let classifier = config.classifier.build()?;
    let mut report = BatchReport::default();

    let luts = if config.lut.selected.is_empty() {
        list_luts(&config.lut.dir)
    } else {
        config.lut.selected.clone()
    };
    let images = collect_images(&config.input.image_dir, &config.input.images);
    info!(luts = luts.len(), images = images.len(), "starting batch");

    for lut_name in &luts {
        let lut_path = config.lut.dir.join(lut_name);
        let lut = match Lut3D::from_cube(&lut_path) {
            Ok(lut) => lut,
            Err(e) => {
                error!(lut = %lut_path.display(), "failed to load LUT: {}", e);
                report.failed_luts += 1;
                continue;
            }
        };
        let label = lut_label(&lut_path);
        info!(
            lut = %lut_name,
            title = lut.title().unwrap_or_default(),
            size = lut.size(),
            "loaded LUT"
        );
        report.luts += 1;

        for image in &images {
            let out = output_path(&config.input.output, &label, &config.input.image_dir, image);
            match grade_file(image, &out, &lut, &classifier, config.output.copy_metadata) {
                Ok(counts) => {
                    report.graded += 1;
                    report.counts += counts;
                }
                Err(e) => {
                    warn!(image = %image.display(), lut = %lut_name, "failed to grade: {}", e);
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        luts = report.luts,
        failed_luts = report.failed_luts,
        graded = report.graded,
        failed = report.failed,
        "batch complete"
    );
    Ok(report)
}
