use byteorder::{BigEndian, ByteOrder};

use super::CodecError;
use crate::format::{expand3, expand4, expand5, FormatTag};
use crate::pixel::{PixelBuffer, PixelLayout};

/// Decode a raw block by tag name, e.g. straight from a placement script.
pub fn decode_named(raw: &[u8], width: u32, height: u32, format: &str) -> Result<PixelBuffer, CodecError> {
    decode(raw, width, height, FormatTag::from_name(format)?)
}

/// Decode `raw` into an RGB (no alpha) or RGBA buffer.
///
/// `raw.len()` must equal `format.byte_len(width, height)` exactly.
pub fn decode(raw: &[u8], width: u32, height: u32, format: FormatTag) -> Result<PixelBuffer, CodecError> {
    let expected = format.byte_len(width, height)?;
    if raw.len() != expected {
        return Err(CodecError::ShortInput { expected, actual: raw.len() });
    }

    let layout = if format.has_alpha() { PixelLayout::Rgba } else { PixelLayout::Rgb };
    let mut out = PixelBuffer::new(width, height, layout);

    match format {
        FormatTag::I4 => {
            for (i, &byte) in raw.iter().enumerate() {
                let hi = expand4(byte >> 4);
                let lo = expand4(byte & 0xF);
                out.set_pixel(i * 2,     &[hi, hi, hi]);
                out.set_pixel(i * 2 + 1, &[lo, lo, lo]);
            }
        }
        FormatTag::I8 => {
            for (i, &g) in raw.iter().enumerate() {
                out.set_pixel(i, &[g, g, g]);
            }
        }
        FormatTag::Ia4 => {
            for (i, &byte) in raw.iter().enumerate() {
                out.set_pixel(i * 2,     &ia4_nibble(byte >> 4));
                out.set_pixel(i * 2 + 1, &ia4_nibble(byte & 0xF));
            }
        }
        FormatTag::Ia8 => {
            for (i, &byte) in raw.iter().enumerate() {
                let g = expand4(byte >> 4);
                let a = expand4(byte & 0xF);
                out.set_pixel(i, &[g, g, g, a]);
            }
        }
        FormatTag::Ia16 => {
            for (i, px) in raw.chunks_exact(2).enumerate() {
                let (g, a) = (px[0], px[1]);
                out.set_pixel(i, &[g, g, g, a]);
            }
        }
        FormatTag::Rgba16 => {
            for (i, px) in raw.chunks_exact(2).enumerate() {
                let word = BigEndian::read_u16(px);
                let r = expand5((word >> 11) as u8);
                let g = expand5((word >> 6) as u8);
                let b = expand5((word >> 1) as u8);
                let a = if word & 0x1 != 0 { 255 } else { 0 };
                out.set_pixel(i, &[r, g, b, a]);
            }
        }
        FormatTag::Rgba32 => {
            for (i, px) in raw.chunks_exact(4).enumerate() {
                out.set_pixel(i, px);
            }
        }
    }

    Ok(out)
}

/// `ggga` nibble: 3-bit intensity widened to 8 bits, 1-bit alpha to 0/255.
#[inline]
fn ia4_nibble(nibble: u8) -> [u8; 4] {
    let g = expand3(nibble >> 1);
    let a = if nibble & 0x1 != 0 { 255 } else { 0 };
    [g, g, g, a]
}
