//! Texture codec: packed console layouts ⇄ linear [`PixelBuffer`]s.
//!
//! # Layout rules
//! Pixels are scanned row-major.  Four-bit formats hold two horizontally
//! adjacent pixels per byte, high nibble first.  Sixteen-bit words are
//! big-endian.
//!
//! # Alpha
//! One-bit alpha (IA4, RGBA16) decodes to exactly 0 or 255 and encodes as
//! `alpha != 0`.  A half-transparent input therefore comes back fully
//! opaque after a round trip.  Tooling built on the extracted artifacts
//! depends on this, so it is kept as is.

use std::io;
use thiserror::Error;

use crate::format::FormatTag;

mod decode;
mod encode;

pub use decode::{decode, decode_named};
pub use encode::{encode, encode_named};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    /// Tag outside the closed format set.
    #[error("Unknown texture format: {0}")]
    UnknownFormat(String),
    /// Raw block length does not match `width * height * bytes_per_pixel`.
    #[error("Short input: expected {expected} bytes, got {actual}")]
    ShortInput { expected: usize, actual: usize },
    #[error("{format} packs two pixels per byte; width {width} is odd")]
    OddWidth { format: FormatTag, width: u32 },
    #[error("Texture dimensions {width}x{height} overflow")]
    DimensionOverflow { width: u32, height: u32 },
    #[error("Pixel buffer holds {actual} bytes, dimensions require {expected}")]
    BufferMismatch { expected: usize, actual: usize },
    #[error("Cannot encode {layout} pixels as {format}")]
    UnsupportedLayout { layout: &'static str, format: FormatTag },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
