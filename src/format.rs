//! Format catalog: the closed set of packed texture layouts.
//!
//! # Identity rules
//! A format is named by a case-insensitive tag as it appears in placement
//! scripts (`I4`, `IA8`, `RGBA16`, ...).  `RGBA3` is a legacy spelling that
//! resolves to [`FormatTag::Rgba16`].  The set is frozen; an unrecognised
//! tag is reported as [`CodecError::UnknownFormat`] and never guessed at.
//!
//! # Bit widths
//! Narrow samples are widened to 8 bits by bit replication and narrowed
//! by plain right shifts.  Neither direction rounds.

use crate::codec::CodecError;

// ── Bit expansion / truncation ──────────────────────────────────────────────

/// 3-bit sample → 8 bits: `(v<<5)|(v<<2)|(v>>1)`.
#[inline]
pub fn expand3(v: u8) -> u8 {
    let v = v & 0x7;
    (v << 5) | (v << 2) | (v >> 1)
}

/// 4-bit sample → 8 bits: `(v<<4)|v`.
#[inline]
pub fn expand4(v: u8) -> u8 {
    let v = v & 0xF;
    (v << 4) | v
}

/// 5-bit sample → 8 bits: `(v<<3)|(v>>2)`.
#[inline]
pub fn expand5(v: u8) -> u8 {
    let v = v & 0x1F;
    (v << 3) | (v >> 2)
}

#[inline]
pub fn truncate3(v: u8) -> u8 { (v >> 5) & 0x7 }

#[inline]
pub fn truncate4(v: u8) -> u8 { (v >> 4) & 0xF }

#[inline]
pub fn truncate5(v: u8) -> u8 { (v >> 3) & 0x1F }

// ── SampleWidth ─────────────────────────────────────────────────────────────

/// Width of the narrowest colour/intensity sample a format stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    Bits3,
    Bits4,
    Bits5,
    Bits8,
}

impl SampleWidth {
    pub fn expand(self, v: u8) -> u8 {
        match self {
            SampleWidth::Bits3 => expand3(v),
            SampleWidth::Bits4 => expand4(v),
            SampleWidth::Bits5 => expand5(v),
            SampleWidth::Bits8 => v,
        }
    }

    pub fn truncate(self, v: u8) -> u8 {
        match self {
            SampleWidth::Bits3 => truncate3(v),
            SampleWidth::Bits4 => truncate4(v),
            SampleWidth::Bits5 => truncate5(v),
            SampleWidth::Bits8 => v,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            SampleWidth::Bits3 => 3,
            SampleWidth::Bits4 => 4,
            SampleWidth::Bits5 => 5,
            SampleWidth::Bits8 => 8,
        }
    }
}

// ── FormatTag ───────────────────────────────────────────────────────────────

/// Packed texture layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    I4,
    I8,
    Ia4,
    Ia8,
    Ia16,
    Rgba16,
    Rgba32,
}

impl FormatTag {
    pub const ALL: [FormatTag; 7] = [
        FormatTag::I4,
        FormatTag::I8,
        FormatTag::Ia4,
        FormatTag::Ia8,
        FormatTag::Ia16,
        FormatTag::Rgba16,
        FormatTag::Rgba32,
    ];

    /// Resolve a script tag.  Case-insensitive; `RGBA3` maps to `RGBA16`.
    pub fn from_name(s: &str) -> Result<Self, CodecError> {
        match s.to_ascii_uppercase().as_str() {
            "I4"               => Ok(FormatTag::I4),
            "I8"               => Ok(FormatTag::I8),
            "IA4"              => Ok(FormatTag::Ia4),
            "IA8"              => Ok(FormatTag::Ia8),
            "IA16"             => Ok(FormatTag::Ia16),
            "RGBA16" | "RGBA3" => Ok(FormatTag::Rgba16),
            "RGBA32"           => Ok(FormatTag::Rgba32),
            _                  => Err(CodecError::UnknownFormat(s.to_owned())),
        }
    }

    /// Canonical tag, as written by the script renderer.
    pub fn name(self) -> &'static str {
        match self {
            FormatTag::I4     => "I4",
            FormatTag::I8     => "I8",
            FormatTag::Ia4    => "IA4",
            FormatTag::Ia8    => "IA8",
            FormatTag::Ia16   => "IA16",
            FormatTag::Rgba16 => "RGBA16",
            FormatTag::Rgba32 => "RGBA32",
        }
    }

    #[inline]
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            FormatTag::I4  | FormatTag::Ia4                     => 4,
            FormatTag::I8  | FormatTag::Ia8                     => 8,
            FormatTag::Ia16 | FormatTag::Rgba16                 => 16,
            FormatTag::Rgba32                                   => 32,
        }
    }

    /// Bytes per pixel; `0.5` for the two-pixels-per-byte formats.
    pub fn bytes_per_pixel(self) -> f32 {
        self.bits_per_pixel() as f32 / 8.0
    }

    /// Channels the decoder produces: 3 (RGB) for pure intensity, else 4.
    pub fn channels(self) -> usize {
        match self {
            FormatTag::I4 | FormatTag::I8 => 3,
            _                             => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        self.channels() == 4
    }

    /// Whether the stored alpha is a single bit (nonzero-test on encode).
    pub fn one_bit_alpha(self) -> bool {
        matches!(self, FormatTag::Ia4 | FormatTag::Rgba16)
    }

    /// Width of the colour or intensity sample.
    pub fn sample_width(self) -> SampleWidth {
        match self {
            FormatTag::I4 | FormatTag::Ia8            => SampleWidth::Bits4,
            FormatTag::Ia4                            => SampleWidth::Bits3,
            FormatTag::Rgba16                         => SampleWidth::Bits5,
            FormatTag::I8 | FormatTag::Ia16
                | FormatTag::Rgba32                   => SampleWidth::Bits8,
        }
    }

    /// Exact byte length of a `width × height` block.
    ///
    /// Four-bit formats pack two horizontally adjacent pixels per byte, so
    /// their width must be even.
    pub fn byte_len(self, width: u32, height: u32) -> Result<usize, CodecError> {
        if self.bits_per_pixel() == 4 && width % 2 != 0 {
            return Err(CodecError::OddWidth { format: self, width });
        }
        let bits = (width as u64)
            .checked_mul(height as u64)
            .and_then(|px| px.checked_mul(self.bits_per_pixel() as u64))
            .ok_or(CodecError::DimensionOverflow { width, height })?;
        usize::try_from(bits / 8).map_err(|_| CodecError::DimensionOverflow { width, height })
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FormatTag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatTag::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_truncate_identities() {
        for v in 0..8u8  { assert_eq!(truncate3(expand3(v)), v); }
        for v in 0..16u8 { assert_eq!(truncate4(expand4(v)), v); }
        for v in 0..32u8 { assert_eq!(truncate5(expand5(v)), v); }
    }

    #[test]
    fn expansion_endpoints() {
        assert_eq!(expand3(0), 0);
        assert_eq!(expand3(7), 255);
        assert_eq!(expand4(0xF), 255);
        assert_eq!(expand5(0x1F), 255);
        assert_eq!(expand5(0x10), 0x84);
    }

    #[test]
    fn truncation_is_shift_not_rounding() {
        assert_eq!(truncate4(0x1F), 0x1);
        assert_eq!(truncate5(0x07), 0);
        assert_eq!(truncate3(0xFF), 7);
    }

    #[test]
    fn names_are_case_insensitive_with_alias() {
        assert_eq!(FormatTag::from_name("ia8").unwrap(), FormatTag::Ia8);
        assert_eq!(FormatTag::from_name("RGBA3").unwrap(), FormatTag::Rgba16);
        assert_eq!(FormatTag::from_name("rgba3").unwrap(), FormatTag::Rgba16);
        for tag in FormatTag::ALL {
            assert_eq!(FormatTag::from_name(tag.name()).unwrap(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        match FormatTag::from_name("XYZ") {
            Err(CodecError::UnknownFormat(s)) => assert_eq!(s, "XYZ"),
            other => panic!("expected UnknownFormat, got {other:?}"),
        }
    }

    #[test]
    fn byte_lengths() {
        assert_eq!(FormatTag::I4.byte_len(16, 16).unwrap(), 128);
        assert_eq!(FormatTag::Ia4.byte_len(2, 1).unwrap(), 1);
        assert_eq!(FormatTag::I8.byte_len(16, 16).unwrap(), 256);
        assert_eq!(FormatTag::Rgba16.byte_len(32, 32).unwrap(), 2048);
        assert_eq!(FormatTag::Rgba32.byte_len(3, 5).unwrap(), 60);
        assert_eq!(FormatTag::I4.bytes_per_pixel(), 0.5);
    }

    #[test]
    fn odd_width_rejected_for_nibble_formats() {
        assert!(matches!(
            FormatTag::I4.byte_len(3, 2),
            Err(CodecError::OddWidth { width: 3, .. })
        ));
        assert!(FormatTag::I8.byte_len(3, 2).is_ok());
    }
}
