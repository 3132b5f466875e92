use crate::classifier::ClassifierConfig;
use crate::error::GradeResult;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Batch configuration, usually loaded from `cinegrade.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub input: InputPaths,
    pub lut: LutConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where images come from and where graded results go.
#[derive(Debug, Deserialize)]
pub struct InputPaths {
    /// Directory containing input images
    pub image_dir: PathBuf,
    /// File names inside `image_dir` to grade. Empty means every image found.
    #[serde(default)]
    pub images: Vec<String>,
    /// Root directory for graded output; one subdirectory per LUT
    pub output: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct LutConfig {
    /// Directory containing `.cube` files
    pub dir: PathBuf,
    /// LUT file names to apply, in order. Empty means every `.cube` in `dir`.
    #[serde(default)]
    pub selected: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Copy EXIF from each source image to its graded output.
    pub copy_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { copy_metadata: true }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> GradeResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Reads the batch configuration from a TOML file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `ConfigParse` if the TOML is invalid.
pub fn read_config(path: &Path) -> GradeResult<Config> {
    let toml_str = fs::read_to_string(path)?;
    Config::from_toml_str(&toml_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [input]
            image_dir = "slider"
            output = "hero"

            [lut]
            dir = "luts"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.input.image_dir, PathBuf::from("slider"));
        assert!(cfg.input.images.is_empty());
        assert!(cfg.lut.selected.is_empty());
        assert_eq!(cfg.classifier, ClassifierConfig::default());
        assert!(cfg.output.copy_metadata);
    }

    #[test]
    fn test_full_config() {
        let cfg = Config::from_toml_str(
            r#"
            [input]
            image_dir = "slider"
            images = ["latino.png", "slide2.png"]
            output = "hero"

            [lut]
            dir = "luts"
            selected = ["Cinematic Tones 02.cube"]

            [classifier]
            target_hue_degrees = 50.0
            black_threshold = 30
            multipliers = [1.0, 1.1, 0.9]

            [output]
            copy_metadata = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.input.images, vec!["latino.png", "slide2.png"]);
        assert_eq!(cfg.lut.selected, vec!["Cinematic Tones 02.cube"]);
        assert_eq!(cfg.classifier.target_hue_degrees, 50.0);
        assert_eq!(cfg.classifier.hue_tolerance_degrees, 20.0);
        assert_eq!(cfg.classifier.black_threshold, 30);
        assert_eq!(cfg.classifier.multipliers, [1.0, 1.1, 0.9]);
        assert!(!cfg.output.copy_metadata);
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let text = "[input]\nimage_dir = \"a\"\noutput = \"b\"\n";
        let err = Config::from_toml_str(text).unwrap_err();
        assert!(matches!(err, crate::error::GradeError::ConfigParse(_)));
    }
}
