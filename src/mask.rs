//! The inclusion mask.
//!
//! A rectangle on the complex plane is overlaid with a coarse boolean grid.
//! Sample points that fall inside the rectangle are only iterated when
//! their grid cell is set; points outside it are always iterated.  The
//! kernel only ever sees the grid through [`MaskRegion::grid_coords`] and a
//! predicate; [`Mask`] is the bitmap the binary loads to answer it.

use image::{Pixel, RgbImage};
use log::debug;
use num::Complex;
use std::path::Path;

use crate::error::{Error, Result};
use crate::planes::Bounds;
use crate::precision::Real;

/// Where the mask grid sits on the complex plane, and how fine it is.
#[derive(Copy, Clone, Debug)]
pub struct MaskRegion<T> {
    /// The rectangle the grid is stretched over.
    pub bounds: Bounds<T>,
    /// Number of grid columns.
    pub grid_width: i32,
    /// Number of grid rows.
    pub grid_height: i32,
}

impl<T: Real> MaskRegion<T> {
    /// Fails when the rectangle has no area.
    pub fn new(bounds: Bounds<T>, grid_width: i32, grid_height: i32) -> Result<Self> {
        if !bounds.is_proper() {
            return Err(Error::Configuration(format!(
                "the mask rectangle must have positive width and height: {:?}",
                bounds
            )));
        }
        Ok(MaskRegion {
            bounds,
            grid_width,
            grid_height,
        })
    }

    /// The grid cell a point falls into, or `None` when the point lies
    /// outside the rectangle.  Both coordinates truncate toward zero, so a
    /// point on the right or bottom edge lands one past the last cell.
    pub fn grid_coords(&self, point: &Complex<T>) -> Option<(i32, i32)> {
        let b = &self.bounds;
        if !b.contains(point.re, point.im) {
            return None;
        }
        let x = (point.re - b.left) / b.width() * T::of_f64(f64::from(self.grid_width));
        let y = (point.im - b.top) / b.height() * T::of_f64(f64::from(self.grid_height));
        Some((x.trunc_i32(), y.trunc_i32()))
    }

    /// Decides whether a point gets iterated, consulting `predicate` only
    /// for points inside the rectangle.
    pub fn admits<F>(&self, point: &Complex<T>, predicate: F) -> bool
    where
        F: FnOnce(i32, i32) -> bool,
    {
        match self.grid_coords(point) {
            Some((x, y)) => predicate(x, y),
            None => true,
        }
    }
}

/// A boolean bitmap, row-major.
#[derive(Clone, Debug)]
pub struct Mask {
    width: i32,
    height: i32,
    cells: Vec<bool>,
}

impl Mask {
    /// A mask where every cell has the same value.
    pub fn filled(width: i32, height: i32, value: bool) -> Self {
        let len = (width.max(0) as usize) * (height.max(0) as usize);
        Mask {
            width,
            height,
            cells: vec![value; len],
        }
    }

    /// Builds a mask from an image: a cell is set when any of its color
    /// channels is non-zero.
    pub fn from_rgb(img: &RgbImage) -> Self {
        let cells = img
            .pixels()
            .map(|p| p.channels().iter().map(|&c| u32::from(c)).sum::<u32>() > 0)
            .collect();
        Mask {
            width: img.width() as i32,
            height: img.height() as i32,
            cells,
        }
    }

    /// Reads a mask from any image format the `image` crate decodes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let img = image::open(path.as_ref())?.to_rgb();
        let mask = Mask::from_rgb(&img);
        debug!(
            "loaded {}x{} mask from {}, {} cells set",
            mask.width,
            mask.height,
            path.as_ref().display(),
            mask.cells.iter().filter(|&&c| c).count()
        );
        Ok(mask)
    }

    /// Number of columns.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Looks a cell up.  Coordinates off the grid clamp to the nearest edge
    /// cell; an empty mask includes nothing.
    pub fn includes(&self, x: i32, y: i32) -> bool {
        if self.cells.is_empty() {
            return false;
        }
        let x = x.max(0).min(self.width - 1) as usize;
        let y = y.max(0).min(self.height - 1) as usize;
        self.cells[y * self.width as usize + x]
    }

    /// The grid placement of this mask over `bounds`.
    pub fn region<T: Real>(&self, bounds: Bounds<T>) -> Result<MaskRegion<T>> {
        MaskRegion::new(bounds, self.width, self.height)
    }
}
