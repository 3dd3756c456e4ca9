extern crate assert_cmd;
extern crate buddhaslice;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use buddhaslice::{export, Aggregate};
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn workspace(settings: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("settings.json"), settings).unwrap();
    dir
}

const SMALL: &str = r#"{
    "width": 32,
    "height": 24,
    "max_iter": 80,
    "dpp": 2,
    "slice": 4,
    "threads": 6,
    "cores": 2,
    "report_interval_ms": 0,
    "bounds": {
        "image": { "left": -2.0, "right": 1.0, "top": -1.25, "bottom": 1.25 },
        "mask": { "left": -2.5, "right": 1.5, "top": -1.5, "bottom": 1.5 }
    }
}"#;

#[test]
fn renders_raw_dump_and_png() {
    let dir = workspace(SMALL);
    Command::cargo_bin("buddhaslice")
        .unwrap()
        .current_dir(dir.path())
        .arg("--output")
        .arg("slice.png")
        .assert()
        .success()
        .stdout(predicate::str::contains("slice.png"));

    let canvas = export::read_raw(dir.path().join("render.dat"), Aggregate::Sum).unwrap();
    assert_eq!((canvas.width(), canvas.height()), (32, 24));
    assert!(canvas.cells().iter().all(|&(computed, _)| computed));
    assert!(canvas.brightest() > 0);

    let png = image::open(dir.path().join("slice.png")).unwrap().to_luma();
    assert_eq!(png.dimensions(), (32, 24));
}

#[test]
fn black_mask_over_the_image_leaves_it_dark() {
    let dir = workspace(SMALL);
    image::GrayImage::new(8, 8).save(dir.path().join("mask.png")).unwrap();
    Command::cargo_bin("buddhaslice")
        .unwrap()
        .current_dir(dir.path())
        .args(&["--mask", "mask.png", "--no-png"])
        .assert()
        .success();

    let canvas = export::read_raw(dir.path().join("render.dat"), Aggregate::Sum).unwrap();
    assert!(canvas.cells().iter().all(|&(computed, iterations)| computed && iterations == 0));
}

#[test]
fn final_export_honours_raw_at_end() {
    let settings = SMALL.replacen(
        "\"report_interval_ms\": 0,",
        "\"report_interval_ms\": 0, \"export\": { \"raw_at_end\": false },",
        1,
    );
    let dir = workspace(&settings);
    Command::cargo_bin("buddhaslice")
        .unwrap()
        .current_dir(dir.path())
        .args(&["--output", "only.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("only.png"))
        .stdout(predicate::str::contains("render.dat").not());

    assert!(!dir.path().join("render.dat").exists());
    assert!(dir.path().join("only.png").exists());
}

#[test]
fn command_line_overrides_the_settings_file() {
    let dir = workspace(SMALL);
    Command::cargo_bin("buddhaslice")
        .unwrap()
        .current_dir(dir.path())
        .args(&["--size", "10x6", "--slice", "1,2", "--raw", "small.dat", "--no-png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("small.dat"));

    let canvas = export::read_raw(dir.path().join("small.dat"), Aggregate::Sum).unwrap();
    assert_eq!((canvas.width(), canvas.height()), (10, 6));
}

#[test]
fn unusable_settings_fail_cleanly() {
    let dir = workspace(SMALL);
    Command::cargo_bin("buddhaslice")
        .unwrap()
        .current_dir(dir.path())
        .args(&["--size", "0x6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Render failure"));
    assert!(!dir.path().join("render.dat").exists());
}

#[test]
fn malformed_settings_file_fails() {
    let dir = workspace("{ \"width\": ");
    Command::cargo_bin("buddhaslice")
        .unwrap()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed settings file"));
}
