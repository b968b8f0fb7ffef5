use byteorder::{BigEndian, ByteOrder};

use super::CodecError;
use crate::format::{truncate3, truncate4, truncate5, FormatTag};
use crate::pixel::{PixelBuffer, PixelLayout};

/// Encode by tag name.
pub fn encode_named(buffer: &PixelBuffer, format: &str) -> Result<Vec<u8>, CodecError> {
    encode(buffer, FormatTag::from_name(format)?)
}

/// Pack `buffer` into the raw layout of `format`.
///
/// Channel fallback:
/// - intensity formats read the first channel of any layout;
/// - alpha comes from the last channel of `GrayAlpha`/`Rgba`, otherwise 255;
/// - `Gray` feeding a colour format is replicated into R, G and B;
/// - `GrayAlpha` cannot feed a colour format.
pub fn encode(buffer: &PixelBuffer, format: FormatTag) -> Result<Vec<u8>, CodecError> {
    let len = format.byte_len(buffer.width(), buffer.height())?;
    let layout = buffer.layout();
    let mut out = Vec::with_capacity(len);

    match format {
        FormatTag::I4 => {
            for pair in buffer.as_raw().chunks_exact(layout.channels() * 2) {
                let (p0, p1) = pair.split_at(layout.channels());
                out.push((truncate4(p0[0]) << 4) | truncate4(p1[0]));
            }
        }
        FormatTag::I8 => {
            out.extend(buffer.pixels().map(|px| px[0]));
        }
        FormatTag::Ia4 => {
            for pair in buffer.as_raw().chunks_exact(layout.channels() * 2) {
                let (p0, p1) = pair.split_at(layout.channels());
                out.push((ia4_nibble(p0, layout) << 4) | ia4_nibble(p1, layout));
            }
        }
        FormatTag::Ia8 => {
            out.extend(
                buffer
                    .pixels()
                    .map(|px| (truncate4(px[0]) << 4) | truncate4(alpha(px, layout))),
            );
        }
        FormatTag::Ia16 => {
            for px in buffer.pixels() {
                out.push(px[0]);
                out.push(alpha(px, layout));
            }
        }
        FormatTag::Rgba16 => {
            for px in buffer.pixels() {
                let [r, g, b, a] = rgba(px, layout, format)?;
                let word = (truncate5(r) as u16) << 11
                    | (truncate5(g) as u16) << 6
                    | (truncate5(b) as u16) << 1
                    | (a != 0) as u16;
                let mut bytes = [0u8; 2];
                BigEndian::write_u16(&mut bytes, word);
                out.extend_from_slice(&bytes);
            }
        }
        FormatTag::Rgba32 => {
            for px in buffer.pixels() {
                out.extend_from_slice(&rgba(px, layout, format)?);
            }
        }
    }

    debug_assert_eq!(out.len(), len);
    Ok(out)
}

#[inline]
fn alpha(px: &[u8], layout: PixelLayout) -> u8 {
    match layout {
        PixelLayout::GrayAlpha => px[1],
        PixelLayout::Rgba      => px[3],
        PixelLayout::Gray | PixelLayout::Rgb => 255,
    }
}

/// 3-bit intensity in the top of the nibble, `alpha != 0` in bit 0.
#[inline]
fn ia4_nibble(px: &[u8], layout: PixelLayout) -> u8 {
    (truncate3(px[0]) << 1) | (alpha(px, layout) != 0) as u8
}

fn rgba(px: &[u8], layout: PixelLayout, format: FormatTag) -> Result<[u8; 4], CodecError> {
    match layout {
        PixelLayout::Gray      => Ok([px[0], px[0], px[0], 255]),
        PixelLayout::Rgb       => Ok([px[0], px[1], px[2], 255]),
        PixelLayout::Rgba      => Ok([px[0], px[1], px[2], px[3]]),
        PixelLayout::GrayAlpha => Err(CodecError::UnsupportedLayout {
            layout: "intensity+alpha",
            format,
        }),
    }
}
