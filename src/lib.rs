//! Color grading with `.cube` 3D LUTs that leaves a brand hue band and deep
//! blacks untouched.
//!
//! [`lut3d`] parses and samples the lattice, [`classifier`] decides which
//! pixels bypass it, and [`pipeline`] runs one pass over an image.
//! [`file_handler`] drives batches of LUTs and images from a [`config::Config`].

pub mod classifier;
pub mod config;
pub mod error;
pub mod file_handler;
pub mod lut3d;
pub mod metadata_handler;
pub mod pipeline;

pub use classifier::{ClassifierConfig, Outcome, OutcomeKind, PixelClassifier};
pub use error::{GradeError, GradeResult};
pub use lut3d::Lut3D;
pub use pipeline::{process, GradeCounts};
