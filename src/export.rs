//! Writing the canvas out: a raw dump that can be read back, and a set of
//! grayscale PNG tiles for looking at.

use image::{GrayImage, Luma};
use itertools::iproduct;
use log::info;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::canvas::{Aggregate, Canvas};
use crate::error::Result;
use crate::settings::Settings;

/// Writes the canvas as little-endian `u64` width, `u64` height, then one
/// `u8` computed flag and one `i64` value per pixel, row-major.
pub fn write_raw<P: AsRef<Path>>(canvas: &Canvas, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("began exporting '{}'", path.display());
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&canvas.width().to_le_bytes())?;
    out.write_all(&canvas.height().to_le_bytes())?;
    for (computed, iterations) in canvas.cells() {
        out.write_all(&[computed as u8])?;
        out.write_all(&iterations.to_le_bytes())?;
    }
    out.flush()?;
    info!("finished exporting '{}'", path.display());
    Ok(())
}

/// Reads a dump written by [`write_raw`] back into a canvas.
pub fn read_raw<P: AsRef<Path>>(path: P, aggregate: Aggregate) -> Result<Canvas> {
    let mut input = BufReader::new(File::open(path)?);
    let mut word = [0u8; 8];
    input.read_exact(&mut word)?;
    let width = u64::from_le_bytes(word);
    input.read_exact(&mut word)?;
    let height = u64::from_le_bytes(word);

    let len = width
        .checked_mul(height)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "image dimensions overflow"))?;
    let mut cells = Vec::with_capacity(len.min(1 << 24) as usize);
    let mut flag = [0u8; 1];
    for _ in 0..len {
        input.read_exact(&mut flag)?;
        input.read_exact(&mut word)?;
        cells.push((flag[0] != 0, i64::from_le_bytes(word)));
    }
    Ok(Canvas::from_cells(width, height, aggregate, &cells))
}

/// The smallest `n` such that splitting the image into `n×n` tiles keeps
/// every tile at or under `max_image_size` pixels.
pub fn tile_count(width: u64, height: u64, max_image_size: u64) -> u64 {
    let max = max_image_size.max(1);
    let mut tiles = 1;
    while width * height / (tiles * tiles) > max {
        tiles += 1;
    }
    tiles
}

/// The file name of tile `(x, y)`.  Patterns without placeholders get the
/// tile position spliced in front of the extension when there is more
/// than one tile.
pub fn tile_path(pattern: &str, x: u64, y: u64, tiles: u64) -> PathBuf {
    if pattern.contains("{x}") || pattern.contains("{y}") {
        return PathBuf::from(
            pattern
                .replace("{x}", &x.to_string())
                .replace("{y}", &y.to_string()),
        );
    }
    if tiles == 1 {
        return PathBuf::from(pattern);
    }
    let path = Path::new(pattern);
    let stem = path.file_stem().map_or(String::new(), |s| s.to_string_lossy().into_owned());
    let name = match path.extension() {
        Some(ext) => format!("{}-{}-{}.{}", stem, x, y, ext.to_string_lossy()),
        None => format!("{}-{}-{}", stem, x, y),
    };
    path.with_file_name(name)
}

/// Grayscale level of one cell: `sqrt(i) · 512 / sqrt(brightest)`,
/// clamped to a byte.  Cells never computed are black.
fn level(computed: bool, iterations: i64, brightest: i64) -> u8 {
    if !computed || brightest <= 0 {
        return 0;
    }
    let v = (iterations.max(0) as f64).sqrt() * 512.0 / (brightest as f64).sqrt();
    v.max(0.0).min(255.0) as u8
}

/// Writes the canvas as `n×n` PNG tiles (see [`tile_count`]) and returns
/// their paths.  The last row and column of tiles absorb any remainder.
pub fn write_png_tiles(canvas: &Canvas, pattern: &str, max_image_size: u64) -> Result<Vec<PathBuf>> {
    let (width, height) = (canvas.width(), canvas.height());
    let tiles = tile_count(width, height, max_image_size);
    let (tile_w, tile_h) = (width / tiles, height / tiles);
    let brightest = canvas.brightest();
    let cells = canvas.cells();

    let mut written = vec![];
    for (tx, ty) in iproduct!(0..tiles, 0..tiles) {
        let x0 = tx * tile_w;
        let y0 = ty * tile_h;
        let w = if tx == tiles - 1 { width - x0 } else { tile_w };
        let h = if ty == tiles - 1 { height - y0 } else { tile_h };
        if w == 0 || h == 0 {
            continue;
        }
        let img = GrayImage::from_fn(w as u32, h as u32, |x, y| {
            let (computed, iterations) = cells[((y0 + y as u64) * width + x0 + x as u64) as usize];
            Luma([level(computed, iterations, brightest)])
        });
        let path = tile_path(pattern, tx, ty, tiles);
        info!("began exporting '{}'", path.display());
        img.save(&path)?;
        info!("finished exporting '{}'", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Writes whichever outputs `settings.export` asks for, either as a
/// snapshot of a render in flight or as the final export, and returns
/// the paths written.
pub fn save_snapshot(canvas: &Canvas, settings: &Settings, final_: bool) -> Result<Vec<PathBuf>> {
    let mut written = vec![];
    if settings.export.wants_raw(final_) {
        write_raw(canvas, &settings.path_raw)?;
        written.push(settings.path_raw.clone());
    }
    if settings.export.wants_png(final_) {
        written.extend(write_png_tiles(canvas, &settings.path_out, settings.max_image_size)?);
    }
    Ok(written)
}
