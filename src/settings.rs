//! Render settings, read from a JSON file.
//!
//! Every field has a default, so a settings file only needs to name what
//! it changes, and a missing file renders the default image.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::canvas::Aggregate;
use crate::error::{Error, Result};
use crate::kernel::RenderRequest;
use crate::mask::Mask;
use crate::planes::Bounds;
use crate::precision::Real;

/// Where the settings live unless told otherwise.
pub const DEFAULT_PATH: &str = "settings.json";

/// The image and mask rectangles.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsSettings {
    /// The region of the complex plane the image covers.
    pub image: Bounds<f64>,
    /// The region the mask bitmap is stretched over.
    pub mask: Bounds<f64>,
}

impl Default for BoundsSettings {
    fn default() -> Self {
        let b = Bounds::new(-2.0, 0.75, -1.1, 1.1);
        BoundsSettings { image: b, mask: b }
    }
}

/// Which files get written, both in the periodic snapshots taken while
/// rendering and once the render finishes.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Snapshot interval; zero turns periodic snapshots off.
    pub interval_ms: u64,
    /// Dump the raw canvas to `path_raw` in each snapshot.
    pub raw: bool,
    /// Write grayscale PNG tiles to `path_out` in each snapshot.
    pub png: bool,
    /// Dump the raw canvas when the render finishes.
    pub raw_at_end: bool,
    /// Write the PNG tiles when the render finishes.
    pub png_at_end: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            interval_ms: 360_000,
            raw: true,
            png: true,
            raw_at_end: true,
            png_at_end: true,
        }
    }
}

impl ExportSettings {
    /// Whether a snapshot dumps the raw canvas.
    pub fn wants_raw(&self, final_: bool) -> bool {
        if final_ {
            self.raw_at_end
        } else {
            self.raw
        }
    }

    /// Whether a snapshot writes the PNG tiles.
    pub fn wants_png(&self, final_: bool) -> bool {
        if final_ {
            self.png_at_end
        } else {
            self.png
        }
    }
}

/// Everything a render run is configured with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mask bitmap; without one every sample is iterated.
    pub path_mask: Option<PathBuf>,
    /// Raw canvas dump.
    pub path_raw: PathBuf,
    /// PNG tile path; `{x}` and `{y}` are replaced by the tile position.
    pub path_out: String,
    /// Image and mask rectangles.
    pub bounds: BoundsSettings,
    /// Image width in pixels.
    pub width: u64,
    /// Image height in pixels.
    pub height: u64,
    /// Iteration cap.
    pub max_iter: usize,
    /// Largest number of pixels in one PNG tile.
    pub max_image_size: u64,
    /// First captured iteration.
    pub slice_offset: usize,
    /// Number of captured iterations.
    pub slice: usize,
    /// Subsamples per pixel along each axis.
    pub dpp: usize,
    /// Number of batches the image is split into.
    pub threads: u64,
    /// Worker threads; zero uses one per CPU.
    pub cores: usize,
    /// How contributions to one pixel combine.
    pub aggregate: Aggregate,
    /// Progress log interval; zero turns the reporter off.
    pub report_interval_ms: u64,
    /// Output selection.
    pub export: ExportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            path_mask: None,
            path_raw: PathBuf::from("render.dat"),
            path_out: "render--tile{x}{y}.png".to_string(),
            bounds: BoundsSettings::default(),
            width: 3840,
            height: 2160,
            max_iter: 10_000,
            max_image_size: 536_870_000,
            slice_offset: 0,
            slice: 8,
            dpp: 3,
            threads: 256,
            cores: 0,
            aggregate: Aggregate::Sum,
            report_interval_ms: 500,
            export: ExportSettings::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`.  A missing file gives the defaults; a
    /// file that is there but unreadable or malformed is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found, using default settings", path.display());
            return Ok(Settings::default());
        }
        let json = fs::read_to_string(path)?;
        let settings = Settings::from_json(&json)?;
        info!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Settings> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rejects values the kernel or the exporters cannot work with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Settings(msg));
        if self.width == 0 || self.height == 0 {
            return fail(format!("image size {}x{} has no pixels", self.width, self.height));
        }
        if self.dpp == 0 {
            return fail("dpp must be at least 1".into());
        }
        if self.threads == 0 {
            return fail("threads must be at least 1".into());
        }
        if self.max_image_size == 0 {
            return fail("max_image_size must be at least 1".into());
        }
        if !self.bounds.image.is_proper() {
            return fail(format!("image bounds {:?} have no area", self.bounds.image));
        }
        if !self.bounds.mask.is_proper() {
            return fail(format!("mask bounds {:?} have no area", self.bounds.mask));
        }
        Ok(())
    }

    /// Snapshot interval, if periodic snapshots are on.
    pub fn snapshot_interval(&self) -> Option<Duration> {
        match self.export.interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Progress log interval, if the reporter is on.
    pub fn report_interval(&self) -> Option<Duration> {
        match self.report_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Worker thread count, resolving zero to the number of CPUs.
    pub fn worker_count(&self) -> usize {
        if self.cores == 0 {
            num_cpus::get()
        } else {
            self.cores
        }
    }

    /// The request every batch is stamped from.  The mask rectangle only
    /// takes part when there is a mask bitmap to consult.
    pub fn request<T: Real>(&self, mask: Option<&Mask>) -> Result<RenderRequest<T>> {
        self.validate()?;
        let mask = match mask {
            Some(m) => Some(m.region(self.bounds.mask.convert())?),
            None => None,
        };
        let request = RenderRequest {
            batches: self.threads,
            batch: 0,
            image: self.bounds.image.convert(),
            image_width: self.width,
            image_height: self.height,
            mask,
            dpp: self.dpp,
            slice_offset: self.slice_offset,
            slice_count: self.slice,
            max_iter: self.max_iter,
        };
        request.validate(None)?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_files_keep_the_other_defaults() {
        let s = Settings::from_json(r#"{ "width": 64, "height": 48, "aggregate": "max" }"#).unwrap();
        assert_eq!((s.width, s.height), (64, 48));
        assert_eq!(s.aggregate, Aggregate::Max);
        assert_eq!(s.max_iter, 10_000);
        assert_eq!(s.bounds, BoundsSettings::default());
        assert!(s.export.png);
    }

    #[test]
    fn nested_bounds_parse() {
        let s = Settings::from_json(
            r#"{ "bounds": { "image": { "left": -1, "right": 1, "top": -0.5, "bottom": 0.5 } },
                 "export": { "png": false } }"#,
        )
        .unwrap();
        assert_eq!(s.bounds.image, Bounds::new(-1.0, 1.0, -0.5, 0.5));
        assert_eq!(s.bounds.mask, BoundsSettings::default().mask);
        assert!(!s.export.png);
        assert!(s.export.raw);
        assert_eq!(s.export.interval_ms, 360_000);
    }

    #[test]
    fn snapshots_and_final_exports_choose_their_own_files() {
        let s = Settings::from_json(
            r#"{ "report_interval_ms": 0,
                 "export": { "interval_ms": 0, "raw": false, "png_at_end": false } }"#,
        )
        .unwrap();
        assert_eq!(s.snapshot_interval(), None);
        assert_eq!(s.report_interval(), None);
        assert!(!s.export.wants_raw(false));
        assert!(s.export.wants_raw(true));
        assert!(s.export.wants_png(false));
        assert!(!s.export.wants_png(true));
        assert_eq!(Settings::default().snapshot_interval(), Some(Duration::from_secs(360)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ width: ").unwrap();
        match Settings::load(file.path()) {
            Err(Error::Json(_)) => {}
            other => panic!("expected a JSON error, got {:?}", other),
        }
    }

    #[test]
    fn validation_catches_unusable_values() {
        for s in vec![
            Settings { width: 0, ..Settings::default() },
            Settings { dpp: 0, ..Settings::default() },
            Settings { threads: 0, ..Settings::default() },
            Settings {
                bounds: BoundsSettings {
                    image: Bounds::new(1.0, 1.0, 0.0, 1.0),
                    ..BoundsSettings::default()
                },
                ..Settings::default()
            },
        ] {
            assert!(s.validate().is_err(), "{:?}", s);
        }
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn request_mirrors_the_settings() {
        let s = Settings { width: 10, height: 5, slice: 3, slice_offset: 2, ..Settings::default() };
        let r: RenderRequest<f32> = s.request(None).unwrap();
        assert_eq!(r.batches, 256);
        assert_eq!((r.image_width, r.image_height), (10, 5));
        assert_eq!((r.slice_offset, r.slice_count), (2, 3));
        assert!(r.mask.is_none());
        assert_eq!(r.image.right, 0.75);

        let mask = Mask::filled(4, 4, true);
        let r: RenderRequest<f64> = s.request(Some(&mask)).unwrap();
        let region = r.mask.unwrap();
        assert_eq!((region.grid_width, region.grid_height), (4, 4));
        assert_eq!(region.bounds.top, -1.1);
    }

    #[test]
    fn zero_cores_means_every_cpu() {
        assert_eq!(Settings::default().worker_count(), num_cpus::get());
        assert_eq!(Settings { cores: 3, ..Settings::default() }.worker_count(), 3);
    }
}
