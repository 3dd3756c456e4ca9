//! The crate-wide error type.

use failure::Fail;
use std::io;

/// Everything that can go wrong between reading the settings and writing
/// the last tile.  The kernel itself only ever produces `Configuration`.
#[derive(Debug, Fail)]
pub enum Error {
    /// A render request that the kernel refuses to iterate.
    #[fail(display = "invalid render request: {}", _0)]
    Configuration(String),

    /// A settings value that cannot produce a valid render request.
    #[fail(display = "invalid settings: {}", _0)]
    Settings(String),

    /// Reading or writing a file failed.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),

    /// Decoding the mask or encoding a tile failed.
    #[fail(display = "image error: {}", _0)]
    Image(#[cause] image::ImageError),

    /// The settings file could not be parsed.
    #[fail(display = "malformed settings file: {}", _0)]
    Json(#[cause] serde_json::Error),

    /// A worker thread panicked inside a sink.
    #[fail(display = "a render worker panicked")]
    Worker,
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
