//! Error types shared by the parser, classifier, pipeline and batch runner.

use thiserror::Error;

/// Result type for grading operations.
pub type GradeResult<T> = Result<T, GradeError>;

/// Errors that can occur while loading a LUT or grading an image.
#[derive(Debug, Error)]
pub enum GradeError {
    /// The `.cube` text is missing its size directive or has unreadable data.
    #[error("malformed LUT: {0}")]
    MalformedLut(String),

    /// The number of data triplets does not match `LUT_3D_SIZE^3`.
    #[error("LUT data size mismatch: expected {expected} entries, found {found}")]
    LatticeSizeMismatch {
        /// `N^3`
        expected: usize,
        /// Triplets actually read
        found: usize,
    },

    /// `DOMAIN_MIN`/`DOMAIN_MAX` other than the unit cube.
    #[error("unsupported LUT domain: {0}")]
    UnsupportedDomain(String),

    /// A channel value outside `[0, 255]` reached the classifier boundary.
    #[error("invalid channel value: {0}")]
    InvalidChannelValue(f32),

    /// Processing was stopped through the cancellation flag.
    #[error("processing cancelled")]
    Cancelled,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// TOML syntax or schema error.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// EXIF copy failure.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Image decode/encode failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
