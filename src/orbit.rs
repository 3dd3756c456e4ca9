// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time iteration and the back-projection of its orbit.
//!
//! Rather than keeping the whole orbit of a point, we keep a window of
//! it: the iterates with global indices `slice_offset ..
//! slice_offset + slices.len()`.  If the point escapes, each iterate in
//! the window is treated as a coordinate, mapped back onto the image,
//! and the pixel it lands on receives a weight that shrinks the later
//! the iterate sits in the window.

use num::Complex;

use crate::planes::PlaneMapper;
use crate::precision::Real;

/// How a sampled point's iteration ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Orbit {
    /// The iteration index at which the point escaped, or `max_iter + 1`
    /// if it never did.
    pub iterations: usize,
    /// True when the point escaped strictly before `max_iter`.
    pub escaped: bool,
}

/// Resets every slot of the window to `0+0i`.
pub fn clear<T: Real>(slices: &mut [Complex<T>]) {
    let zero = Complex::new(T::zero(), T::zero());
    for slot in slices.iter_mut() {
        *slot = zero;
    }
}

/// Iterates `z <- z² + c` from `z = 0`, recording the iterates that fall
/// inside the window.
///
/// The bailout is a box, not a circle: iteration continues while both
/// `|re|` and `|im|` stay below 2.  Slots for iterations that are never
/// reached keep whatever was in them, which is `0+0i` after [`clear`].
pub fn iterate<T: Real>(
    c: Complex<T>,
    max_iter: usize,
    slice_offset: usize,
    slices: &mut [Complex<T>],
) -> Orbit {
    let two = T::one() + T::one();
    let mut z = Complex::new(T::zero(), T::zero());
    let mut count: usize = 0;

    let iterations = loop {
        z = z * z + c;

        if let Some(slot) = count
            .checked_sub(slice_offset)
            .and_then(|i| slices.get_mut(i))
        {
            *slot = z;
        }

        if !(z.re.abs() < two && z.im.abs() < two) {
            break count;
        }
        if count >= max_iter {
            break count + 1;
        }
        count += 1;
    };

    Orbit {
        iterations,
        escaped: iterations < max_iter,
    }
}

/// Maps every slot of the window back onto the image.  For each slot `s`
/// that lands on a pixel, `emit` receives the pixel's linear index and the
/// weight `iterations - s`.
pub fn project<T, F>(plane: &PlaneMapper<T>, slices: &[Complex<T>], iterations: usize, mut emit: F)
where
    T: Real,
    F: FnMut(u64, i64),
{
    for (slice, point) in slices.iter().enumerate() {
        if let Some(offset) = plane.point_to_offset(point) {
            emit(offset, iterations as i64 - slice as i64);
        }
    }
}
