// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-batch render kernel.
//!
//! The pixels of the image are dealt out to `batches` batches like cards:
//! batch `b` gets pixels `b, b + batches, b + 2·batches, ...`.  Each call
//! to [`render_batch`] walks one batch, supersamples every pixel `dpp²`
//! times, iterates every admitted sample and reports what it finds
//! through a [`RenderSink`].  The kernel keeps no state of its own; the
//! only thing it writes to besides the sink is the trajectory buffer its
//! caller lends it, so any number of batches can run at once as long as
//! each has its own buffer.

use log::debug;
use num::Complex;

use crate::error::{Error, Result};
use crate::mask::MaskRegion;
use crate::orbit::{clear, iterate, project};
use crate::planes::{Bounds, Pixel, PlaneMapper};
use crate::precision::Real;

/// The four things the kernel needs from its host.  All of them are called
/// synchronously from the thread running the batch.
pub trait RenderSink<T> {
    /// Whether the sample in mask cell `(mask_x, mask_y)` gets iterated.
    /// Only consulted for samples inside the mask rectangle.
    fn admit(&mut self, mask_x: i32, mask_y: i32) -> bool;

    /// Fraction of `batch` done so far.  Never decreases within a batch
    /// and ends with exactly one.
    fn progress(&mut self, batch: u64, progress: T);

    /// One back-projected orbit point landed on pixel `index`.
    fn contribute(&mut self, index: u64, weight: i64);

    /// Every subsample of pixel `index` has been processed.
    fn computed(&mut self, index: u64);
}

/// A [`RenderSink`] assembled from four closures.
pub struct Callbacks<A, P, I, C> {
    /// Mask predicate.
    pub admit: A,
    /// Progress sink.
    pub progress: P,
    /// Image contribution sink.
    pub contribute: I,
    /// Pixel completion sink.
    pub computed: C,
}

impl<T, A, P, I, C> RenderSink<T> for Callbacks<A, P, I, C>
where
    A: FnMut(i32, i32) -> bool,
    P: FnMut(u64, T),
    I: FnMut(u64, i64),
    C: FnMut(u64),
{
    fn admit(&mut self, mask_x: i32, mask_y: i32) -> bool {
        (self.admit)(mask_x, mask_y)
    }

    fn progress(&mut self, batch: u64, progress: T) {
        (self.progress)(batch, progress)
    }

    fn contribute(&mut self, index: u64, weight: i64) {
        (self.contribute)(index, weight)
    }

    fn computed(&mut self, index: u64) {
        (self.computed)(index)
    }
}

/// Everything one batch needs to know.  Cheap to copy, so a scheduler can
/// stamp out one per batch from a template.
#[derive(Copy, Clone, Debug)]
pub struct RenderRequest<T> {
    /// How many batches the image is split into.
    pub batches: u64,
    /// Which of them this is.
    pub batch: u64,
    /// The region of the complex plane the image covers.
    pub image: Bounds<T>,
    /// Output image width in pixels.
    pub image_width: u64,
    /// Output image height in pixels.
    pub image_height: u64,
    /// The inclusion mask; `None` iterates every sample.
    pub mask: Option<MaskRegion<T>>,
    /// Subsamples per pixel along each axis.
    pub dpp: usize,
    /// Global iteration index of the first captured iterate.
    pub slice_offset: usize,
    /// Number of captured iterates; the trajectory buffer must be this long.
    pub slice_count: usize,
    /// Iteration cap.
    pub max_iter: usize,
}

impl<T: Real> RenderRequest<T> {
    /// The same request aimed at another batch.
    pub fn with_batch(&self, batch: u64) -> Self {
        RenderRequest { batch, ..*self }
    }

    /// Checks every precondition of [`render_batch`] and returns the plane
    /// mapping it will use.  `buffer_len` is the length of the trajectory
    /// buffer, if there is one.
    pub fn validate(&self, buffer_len: Option<usize>) -> Result<PlaneMapper<T>> {
        if self.batches == 0 {
            return Err(Error::Configuration("at least one batch is required".into()));
        }
        if self.batch >= self.batches {
            return Err(Error::Configuration(format!(
                "batch {} is out of range for {} batches",
                self.batch, self.batches
            )));
        }
        if self.dpp == 0 {
            return Err(Error::Configuration("dpp must be at least 1".into()));
        }
        if let Some(len) = buffer_len {
            if len != self.slice_count {
                return Err(Error::Configuration(format!(
                    "trajectory buffer holds {} slices, {} requested",
                    len, self.slice_count
                )));
            }
        }
        if let Some(mask) = &self.mask {
            MaskRegion::new(mask.bounds, mask.grid_width, mask.grid_height)?;
        }
        PlaneMapper::new(self.image_width, self.image_height, self.image)
    }
}

/// A cleared trajectory buffer sized for `request`.
pub fn trajectory_buffer<T: Real>(request: &RenderRequest<T>) -> Vec<Complex<T>> {
    vec![Complex::new(T::zero(), T::zero()); request.slice_count]
}

/// Renders one batch.
///
/// With no trajectory buffer the batch is walked without iterating
/// anything: progress and completion are still reported for every pixel,
/// but the mask is never consulted and nothing is contributed.
///
/// Fails only when the request does not pass [`RenderRequest::validate`],
/// and then before the sink sees anything.
pub fn render_batch<T, S>(
    request: &RenderRequest<T>,
    mut slices: Option<&mut [Complex<T>]>,
    sink: &mut S,
) -> Result<()>
where
    T: Real,
    S: RenderSink<T> + ?Sized,
{
    let plane = request.validate(slices.as_ref().map(|s| s.len()))?;
    let total = plane.len();
    let dpp = request.dpp;
    let span = T::of_index(total) * T::of_count(dpp);

    debug!(
        "batch {}/{}: {} pixels at {}x{} subsamples",
        request.batch,
        request.batches,
        (total + request.batches - 1 - request.batch) / request.batches,
        dpp,
        dpp
    );

    for index in (request.batch..total).step_by(request.batches as usize) {
        let Pixel(px, py) = plane.index_to_pixel(index);

        for x_dpp in 0..dpp {
            let re = plane.sample_re(px, x_dpp, dpp);

            if let Some(slices) = slices.as_mut() {
                for y_dpp in 0..dpp {
                    let c = Complex::new(re, plane.sample_im(py, y_dpp, dpp));
                    sample(request, &plane, c, slices, sink);
                }
            }

            let done = T::of_index(index) * T::of_count(dpp) + T::of_count(x_dpp);
            sink.progress(request.batch, done / span);
        }

        sink.computed(index);
    }

    sink.progress(request.batch, T::one());
    Ok(())
}

/// One subsample: mask, iterate, and on escape project the window.
fn sample<T, S>(
    request: &RenderRequest<T>,
    plane: &PlaneMapper<T>,
    c: Complex<T>,
    slices: &mut [Complex<T>],
    sink: &mut S,
) where
    T: Real,
    S: RenderSink<T> + ?Sized,
{
    clear(slices);

    if let Some(mask) = &request.mask {
        if !mask.admits(&c, |x, y| sink.admit(x, y)) {
            return;
        }
    }

    let orbit = iterate(c, request.max_iter, request.slice_offset, slices);
    if orbit.escaped {
        project(plane, slices, orbit.iterations, |index, weight| {
            sink.contribute(index, weight)
        });
    }
}
