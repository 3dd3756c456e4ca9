//! Contains the Bounds rectangle and the PlaneMapper, which describes a
//! relationship between a rectangle on the integral plane with an
//! origin at 0,0 (the output image), and a rectangle on the complex
//! plane with arbitrary edges.
use num::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::precision::Real;

/// An axis-aligned rectangle on the complex plane.  `left`/`right` run
/// along the real axis and `top`/`bottom` along the imaginary axis, with
/// `top` being the smaller imaginary value (image rows grow downward).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    /// Smallest real value.
    pub left: T,
    /// Largest real value.
    pub right: T,
    /// Smallest imaginary value.
    pub top: T,
    /// Largest imaginary value.
    pub bottom: T,
}

impl<T: Real> Bounds<T> {
    /// Builds a rectangle from its four edges.
    pub fn new(left: T, right: T, top: T, bottom: T) -> Self {
        Bounds {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Extent along the real axis.
    pub fn width(&self) -> T {
        self.right - self.left
    }

    /// Extent along the imaginary axis.
    pub fn height(&self) -> T {
        self.bottom - self.top
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, re: T, im: T) -> bool {
        self.left <= re && re <= self.right && self.top <= im && im <= self.bottom
    }

    /// True when both extents are strictly positive.  NaN edges fail.
    pub fn is_proper(&self) -> bool {
        self.width() > T::zero() && self.height() > T::zero()
    }

    /// The same rectangle in another precision.
    pub fn convert<U: Real>(&self) -> Bounds<U> {
        Bounds {
            left: U::of_f64(self.left.as_f64()),
            right: U::of_f64(self.right.as_f64()),
            top: U::of_f64(self.top.as_f64()),
            bottom: U::of_f64(self.bottom.as_f64()),
        }
    }
}

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub u64, pub u64);

/// Describes the x, y of a pixel in an integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub u64, pub u64);

/// Contains the definitions of two planes: the integral pixel plane of
/// the output image and the rectangle on the complex plane it covers.
/// Maps sample points from the former to the latter, and orbit points
/// back again.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper<T> {
    /// The pixel dimensions of the output image.
    pub integral_plane: IntegralPlane,
    /// The region of the complex plane the image covers.
    pub complex_plane: Bounds<T>,
}

impl<T: Real> PlaneMapper<T> {
    /// Constructor.  Fails when either plane has no area.
    pub fn new(width: u64, height: u64, complex_plane: Bounds<T>) -> Result<PlaneMapper<T>> {
        if width == 0 || height == 0 {
            return Err(Error::Configuration(format!(
                "the image must have pixels, got {}x{}",
                width, height
            )));
        }
        if !complex_plane.is_proper() {
            return Err(Error::Configuration(format!(
                "the image rectangle must have positive width and height: {:?}",
                complex_plane
            )));
        }
        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            complex_plane,
        })
    }

    /// The total number of pixels in the integral grid.
    pub fn len(&self) -> u64 {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Column and row of a linear (row-major) pixel index.
    pub fn index_to_pixel(&self, index: u64) -> Pixel {
        Pixel(index % self.integral_plane.0, index / self.integral_plane.0)
    }

    /// The real coordinate of column `px` at horizontal subsample `x_dpp`
    /// of `dpp`: `(px·width·dpp + x_dpp) / (image_width·dpp) + left`.
    pub fn sample_re(&self, px: u64, x_dpp: usize, dpp: usize) -> T {
        let dpp_t = T::of_count(dpp);
        (T::of_index(px) * self.complex_plane.width() * dpp_t + T::of_count(x_dpp))
            / (T::of_index(self.integral_plane.0) * dpp_t)
            + self.complex_plane.left
    }

    /// The imaginary coordinate of row `py` at vertical subsample `y_dpp`.
    pub fn sample_im(&self, py: u64, y_dpp: usize, dpp: usize) -> T {
        let dpp_t = T::of_count(dpp);
        (T::of_index(py) * self.complex_plane.height() * dpp_t + T::of_count(y_dpp))
            / (T::of_index(self.integral_plane.1) * dpp_t)
            + self.complex_plane.top
    }

    /// Maps a linear pixel index plus a subsample offset to the point on
    /// the complex plane that gets iterated.
    pub fn sample_point(&self, index: u64, x_dpp: usize, y_dpp: usize, dpp: usize) -> Complex<T> {
        let Pixel(px, py) = self.index_to_pixel(index);
        Complex::new(self.sample_re(px, x_dpp, dpp), self.sample_im(py, y_dpp, dpp))
    }

    /// Given a complex number, treat it as a coordinate and floor it onto
    /// the pixel grid.  Points outside the image give `None`.
    pub fn point_to_pixel(&self, point: &Complex<T>) -> Option<Pixel> {
        let IntegralPlane(width, height) = self.integral_plane;
        let (w, h) = (T::of_index(width), T::of_index(height));
        let x = ((point.re - self.complex_plane.left) * w / self.complex_plane.width()).floor();
        let y = ((point.im - self.complex_plane.top) * h / self.complex_plane.height()).floor();
        // Written so that NaN fails both tests.
        if !(x >= T::zero() && x < w && y >= T::zero() && y < h) {
            return None;
        }
        let (x, y) = (x.to_u64()?, y.to_u64()?);
        if x < width && y < height {
            Some(Pixel(x, y))
        } else {
            None
        }
    }

    /// The linear offset of `point_to_pixel` from the root of the image
    /// buffer.
    pub fn point_to_offset(&self, point: &Complex<T>) -> Option<u64> {
        self.point_to_pixel(point)
            .map(|Pixel(x, y)| y * self.integral_plane.0 + x)
    }
}
