#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sliced Buddhabrot renderer
//!
//! The Buddhabrot is a variant of the Mandelbrot set that plots where
//! points *go* rather than how fast they leave.  Every sample point on
//! the complex plane is iterated; if it escapes, the values it passed
//! through are themselves treated as coordinates, mapped back onto the
//! image, and the pixels they land on are brightened.
//!
//! This crate renders a "slice" of that picture: only a window of each
//! orbit (`slice_offset .. slice_offset + slice_count`) is projected, and
//! each projected point is weighted by how early in the window it sits.
//!
//! The work is split into batches by dealing pixels out round-robin.
//! [`render_batch`] renders one batch and is the whole numerical core; it
//! keeps no state and talks to its host only through a [`RenderSink`] and
//! a caller-owned trajectory buffer, so any scheduler can drive it.  The
//! rest of the crate is one such host: a lock-free [`Canvas`], a
//! thread-pool [`scheduler`], a bitmap [`Mask`], JSON [`Settings`] and the
//! [`export`] of raw dumps and PNG tiles.

pub mod canvas;
pub mod error;
pub mod export;
pub mod kernel;
pub mod mask;
pub mod orbit;
pub mod planes;
pub mod precision;
pub mod scheduler;
pub mod settings;

pub use canvas::{Aggregate, Canvas, CanvasSink};
pub use error::{Error, Result};
pub use kernel::{render_batch, trajectory_buffer, Callbacks, RenderRequest, RenderSink};
pub use mask::{Mask, MaskRegion};
pub use planes::{Bounds, PlaneMapper};
pub use precision::Real;
pub use scheduler::{Monitor, Snapshot};
pub use settings::Settings;
