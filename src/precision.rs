//! The floating point width the renderer computes in.
//!
//! Every renderer type is generic over [`Real`], which is implemented for
//! `f32` and `f64`.  Conversions go through plain `as` casts so that each
//! width rounds exactly the way its native arithmetic does.

use num::Float;
use std::fmt::{Debug, Display};

/// A floating point type the kernel can iterate in.
pub trait Real: Float + Debug + Display + Send + Sync + 'static {
    /// Converts a pixel index or dimension.
    fn of_index(v: u64) -> Self;
    /// Converts a loop counter (subsample offset, supersampling factor).
    fn of_count(v: usize) -> Self;
    /// Narrows (or keeps) a settings value.
    fn of_f64(v: f64) -> Self;
    /// Widens to `f64` for reporting.
    fn as_f64(self) -> f64;
    /// Truncates toward zero, saturating at the `i32` range.
    fn trunc_i32(self) -> i32;
}

macro_rules! real {
    ($t: ty) => {
        impl Real for $t {
            #[inline]
            fn of_index(v: u64) -> Self {
                v as $t
            }
            #[inline]
            fn of_count(v: usize) -> Self {
                v as $t
            }
            #[inline]
            fn of_f64(v: f64) -> Self {
                v as $t
            }
            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn trunc_i32(self) -> i32 {
                self as i32
            }
        }
    };
}

real!(f32);
real!(f64);
