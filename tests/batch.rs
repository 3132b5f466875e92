use cinegrade::config::Config;
use cinegrade::file_handler::{grade_file, lut_label, output_path, run_batch};
use cinegrade::{GradeError, Lut3D, PixelClassifier};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// `.cube` text for an identity lattice of the given size.
fn identity_cube(size: usize) -> String {
    let f = (size - 1) as f32;
    let mut text = format!("TITLE \"identity\"\nLUT_3D_SIZE {}\n", size);
    for b in 0..size {
        for g in 0..size {
            for r in 0..size {
                text.push_str(&format!("{} {} {}\n", r as f32 / f, g as f32 / f, b as f32 / f));
            }
        }
    }
    text
}

fn test_image() -> RgbImage {
    RgbImage::from_fn(40, 30, |x, y| match (x / 10, y / 10) {
        (0, _) => Rgb([255, 212, 0]),
        (1, _) => Rgb([10, 20, 30]),
        _ => Rgb([(x * 6) as u8, (y * 8) as u8, 90]),
    })
}

fn write_config(root: &Path, images: &str, selected: &str) -> Config {
    let text = format!(
        r#"
        [input]
        image_dir = "{}"
        images = [{}]
        output = "{}"

        [lut]
        dir = "{}"
        selected = [{}]

        [output]
        copy_metadata = false
        "#,
        root.join("images").display(),
        images,
        root.join("out").display(),
        root.join("luts").display(),
        selected,
    );
    Config::from_toml_str(&text).unwrap()
}

#[test]
fn grade_file_with_identity_lut_keeps_mapped_pixels() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("nested").join("out.png");
    let img = test_image();
    img.save(&input).unwrap();

    let lut = Lut3D::parse_cube(&identity_cube(2)).unwrap();
    let counts = grade_file(&input, &output, &lut, &PixelClassifier::default(), false).unwrap();
    assert_eq!(counts.total(), 40 * 30);
    assert_eq!(counts.preserved_color, 10 * 30);
    assert_eq!(counts.preserved_black, 10 * 30);

    let graded = image::open(&output).unwrap().to_rgb8();
    assert_eq!(graded.dimensions(), (40, 30));
    for (x, y, px) in img.enumerate_pixels() {
        let out = graded.get_pixel(x, y).0;
        match x / 10 {
            0 => assert_eq!(out, [255, 223, 0]),
            _ => assert_eq!(out, px.0, "pixel ({x}, {y})"),
        }
    }
}

#[test]
fn batch_writes_one_folder_per_lut_and_skips_failures() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("images")).unwrap();
    fs::create_dir_all(root.join("luts")).unwrap();

    test_image().save(root.join("images").join("latino.png")).unwrap();
    test_image().save(root.join("images").join("slide2.png")).unwrap();
    fs::write(root.join("images").join("broken.png"), b"not a png").unwrap();

    fs::write(root.join("luts").join("Cinematic Tones 02.cube"), identity_cube(2)).unwrap();
    fs::write(root.join("luts").join("Cinematic Tones 04.cube"), identity_cube(5)).unwrap();
    fs::write(root.join("luts").join("Broken.cube"), "LUT_3D_SIZE 2\n0 0 0\n").unwrap();

    let config = write_config(
        root,
        r#""latino.png", "slide2.png", "broken.png", "missing.png""#,
        r#""Cinematic Tones 02.cube", "Broken.cube", "Cinematic Tones 04.cube""#,
    );
    let report = run_batch(&config).unwrap();

    assert_eq!(report.luts, 2);
    assert_eq!(report.failed_luts, 1);
    assert_eq!(report.graded, 4);
    assert_eq!(report.failed, 2);
    assert_eq!(report.counts.total(), 4 * 40 * 30);

    for lut in ["Cinematic Tones 02.cube", "Cinematic Tones 04.cube"] {
        let label = lut_label(Path::new(lut));
        for image in ["latino.png", "slide2.png"] {
            let out = output_path(&root.join("out"), &label, Path::new(""), Path::new(image));
            assert!(out.is_file(), "missing {}", out.display());
        }
    }
    assert!(!root.join("out").join("broken").exists());
}

#[test]
fn batch_without_lists_uses_every_lut_and_image() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("images").join("sub")).unwrap();
    fs::create_dir_all(root.join("luts")).unwrap();

    test_image().save(root.join("images").join("a.png")).unwrap();
    test_image().save(root.join("images").join("sub").join("b.png")).unwrap();
    fs::write(root.join("images").join("notes.txt"), "skip me").unwrap();
    fs::write(root.join("luts").join("warm.cube"), identity_cube(3)).unwrap();

    let config = write_config(root, "", "");
    let report = run_batch(&config).unwrap();
    assert_eq!(report.luts, 1);
    assert_eq!(report.graded, 2);
    assert_eq!(report.failed, 0);
    assert!(root.join("out").join("warm").join("a_warm.png").is_file());
    assert!(root.join("out").join("warm").join("sub").join("b_warm.png").is_file());
}

#[test]
fn same_file_name_in_subdirectory_gets_its_own_output() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("images").join("sub")).unwrap();
    fs::create_dir_all(root.join("luts")).unwrap();

    test_image().save(root.join("images").join("a.png")).unwrap();
    RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]))
        .save(root.join("images").join("sub").join("a.png"))
        .unwrap();
    fs::write(root.join("luts").join("warm.cube"), identity_cube(2)).unwrap();

    let report = run_batch(&write_config(root, "", "")).unwrap();
    assert_eq!(report.graded, 2);

    let out = root.join("out").join("warm");
    let top = image::open(out.join("a_warm.png")).unwrap();
    let nested = image::open(out.join("sub").join("a_warm.png")).unwrap();
    assert_eq!((top.width(), top.height()), (40, 30));
    assert_eq!((nested.width(), nested.height()), (8, 4));
}

#[test]
fn invalid_classifier_config_aborts_batch() {
    let dir = tempdir().unwrap();
    let mut config = write_config(dir.path(), "", "");
    config.classifier.value_min = 2.0;
    assert!(matches!(run_batch(&config), Err(GradeError::Config(_))));
}
