use crate::error::{GradeError, GradeResult};
use little_exif::metadata::Metadata;
use std::path::Path;

/// Containers `little_exif` can read EXIF from or write it into.
const EXIF_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "jxl", "tif", "tiff", "webp"];

fn carries_exif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXIF_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Moves the camera EXIF of `src` onto the graded output `dst`, which was
/// re-encoded from raw pixels and carries none.
///
/// Returns `Ok(false)` without touching either file when one of them is a
/// format with no EXIF container (BMP, EXR, ...).
pub fn copy_metadata(src: &Path, dst: &Path) -> GradeResult<bool> {
    if !carries_exif(src) || !carries_exif(dst) {
        return Ok(false);
    }

    let exif = Metadata::new_from_path(src).map_err(|e| {
        GradeError::Metadata(format!("cannot read EXIF of {}: {}", src.display(), e))
    })?;
    exif.write_to_file(dst).map_err(|e| {
        GradeError::Metadata(format!("cannot write EXIF to {}: {}", dst.display(), e))
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carries_exif() {
        assert!(carries_exif(Path::new("shot.JPG")));
        assert!(carries_exif(Path::new("graded/shot_warm.png")));
        assert!(!carries_exif(Path::new("scan.bmp")));
        assert!(!carries_exif(Path::new("plate.exr")));
        assert!(!carries_exif(Path::new("noext")));
    }

    #[test]
    fn test_unsupported_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.bmp");
        let dst = dir.path().join("scan_warm.png");
        std::fs::write(&dst, b"untouched").unwrap();

        assert!(!copy_metadata(&src, &dst).unwrap());
        assert_eq!(std::fs::read(&dst).unwrap(), b"untouched");
    }

    #[test]
    fn test_missing_source_is_a_metadata_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("gone.jpg");
        let dst = dir.path().join("gone_warm.png");
        let err = copy_metadata(&src, &dst).unwrap_err();
        assert!(matches!(err, GradeError::Metadata(_)));
    }
}
