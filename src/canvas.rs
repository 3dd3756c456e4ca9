//! The host side of the kernel: an image buffer many batches can write to
//! at once, and the sink that connects a batch to it.
//!
//! Every cell carries a `computed` flag and an accumulated iteration
//! value.  Cells are atomics, so workers never take a lock; contributions
//! from different batches commute, which is what makes the order they
//! arrive in irrelevant.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use crate::kernel::RenderSink;
use crate::mask::Mask;
use crate::precision::Real;

/// How contributions to the same pixel combine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// Add every weight.
    Sum,
    /// Keep the largest weight seen.
    Max,
}

impl Default for Aggregate {
    fn default() -> Self {
        Aggregate::Sum
    }
}

/// The accumulating image plus the per-batch progress table.
#[derive(Debug)]
pub struct Canvas {
    width: u64,
    height: u64,
    aggregate: Aggregate,
    computed: Vec<AtomicBool>,
    iterations: Vec<AtomicI64>,
    // f64 bit patterns, one per batch
    progress: Vec<AtomicU64>,
}

impl Canvas {
    /// An empty canvas for a `width`×`height` image rendered in `batches`
    /// batches.
    pub fn new(width: u64, height: u64, batches: u64, aggregate: Aggregate) -> Self {
        let len = (width * height) as usize;
        Canvas {
            width,
            height,
            aggregate,
            computed: (0..len).map(|_| AtomicBool::new(false)).collect(),
            iterations: (0..len).map(|_| AtomicI64::new(0)).collect(),
            progress: (0..batches).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Rebuilds a canvas from stored cells, as read back from a raw dump.
    pub fn from_cells(width: u64, height: u64, aggregate: Aggregate, cells: &[(bool, i64)]) -> Self {
        let canvas = Canvas::new(width, height, 0, aggregate);
        for (i, &(computed, iterations)) in cells.iter().enumerate().take(canvas.iterations.len()) {
            canvas.computed[i].store(computed, Ordering::Relaxed);
            canvas.iterations[i].store(iterations, Ordering::Relaxed);
        }
        canvas
    }

    /// Image width in pixels.
    pub fn width(&self) -> u64 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    /// True for a canvas without pixels.
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// Folds one contribution into pixel `index`.  Indices past the end
    /// are ignored.
    pub fn add(&self, index: u64, weight: i64) {
        if let Some(cell) = self.iterations.get(index as usize) {
            match self.aggregate {
                Aggregate::Sum => cell.fetch_add(weight, Ordering::Relaxed),
                Aggregate::Max => cell.fetch_max(weight, Ordering::Relaxed),
            };
        }
    }

    /// Flags pixel `index` as done.
    pub fn mark_computed(&self, index: u64) {
        if let Some(cell) = self.computed.get(index as usize) {
            cell.store(true, Ordering::Relaxed);
        }
    }

    /// Whether pixel `index` has been flagged as done.
    pub fn is_computed(&self, index: u64) -> bool {
        self.computed
            .get(index as usize)
            .map_or(false, |c| c.load(Ordering::Relaxed))
    }

    /// The accumulated value of pixel `index`.
    pub fn iterations(&self, index: u64) -> i64 {
        self.iterations
            .get(index as usize)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// The largest accumulated value anywhere.
    pub fn brightest(&self) -> i64 {
        self.iterations
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .max()
            .unwrap_or(0)
    }

    /// Records the progress of one batch.
    pub fn set_progress(&self, batch: u64, progress: f64) {
        if let Some(cell) = self.progress.get(batch as usize) {
            cell.store(progress.to_bits(), Ordering::Relaxed);
        }
    }

    /// Progress of one batch.
    pub fn progress(&self, batch: u64) -> f64 {
        self.progress
            .get(batch as usize)
            .map_or(0.0, |c| f64::from_bits(c.load(Ordering::Relaxed)))
    }

    /// Mean progress over all batches.
    pub fn total_progress(&self) -> f64 {
        if self.progress.is_empty() {
            return 0.0;
        }
        let sum: f64 = (0..self.progress.len() as u64).map(|b| self.progress(b)).sum();
        sum / self.progress.len() as f64
    }

    /// A copy of every cell, row-major.
    pub fn cells(&self) -> Vec<(bool, i64)> {
        self.computed
            .iter()
            .zip(self.iterations.iter())
            .map(|(c, i)| (c.load(Ordering::Relaxed), i.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Connects one running batch to a shared [`Canvas`] and an optional
/// [`Mask`].  Each worker owns one; the canvas does the synchronization.
pub struct CanvasSink<'a> {
    canvas: &'a Canvas,
    mask: Option<&'a Mask>,
}

impl<'a> CanvasSink<'a> {
    /// Without a mask every sample inside the mask rectangle is admitted.
    pub fn new(canvas: &'a Canvas, mask: Option<&'a Mask>) -> Self {
        CanvasSink { canvas, mask }
    }
}

impl<'a, T: Real> RenderSink<T> for CanvasSink<'a> {
    fn admit(&mut self, mask_x: i32, mask_y: i32) -> bool {
        self.mask.map_or(true, |m| m.includes(mask_x, mask_y))
    }

    fn progress(&mut self, batch: u64, progress: T) {
        self.canvas.set_progress(batch, progress.as_f64());
    }

    fn contribute(&mut self, index: u64, weight: i64) {
        self.canvas.add(index, weight);
    }

    fn computed(&mut self, index: u64) {
        self.canvas.mark_computed(index);
    }
}
