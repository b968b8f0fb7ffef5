//! Linear 8-bit pixel buffers exchanged with the image I/O layer.

use crate::codec::CodecError;

/// Channel arrangement of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// One intensity channel.
    Gray,
    /// Intensity, alpha.
    GrayAlpha,
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Gray      => 1,
            PixelLayout::GrayAlpha => 2,
            PixelLayout::Rgb       => 3,
            PixelLayout::Rgba      => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelLayout::GrayAlpha | PixelLayout::Rgba)
    }
}

/// Row-major grid of `width × height` pixels, `layout.channels()` bytes each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width:  u32,
    height: u32,
    layout: PixelLayout,
    data:   Vec<u8>,
}

impl PixelBuffer {
    /// Zero-filled buffer.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        let len = width as usize * height as usize * layout.channels();
        Self { width, height, layout, data: vec![0u8; len] }
    }

    /// Wrap existing samples; the length must match the dimensions exactly.
    pub fn from_raw(
        width:  u32,
        height: u32,
        layout: PixelLayout,
        data:   Vec<u8>,
    ) -> Result<Self, CodecError> {
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(CodecError::BufferMismatch { expected, actual: data.len() });
        }
        Ok(Self { width, height, layout, data })
    }

    pub fn width(&self) -> u32 { self.width }

    pub fn height(&self) -> u32 { self.height }

    pub fn layout(&self) -> PixelLayout { self.layout }

    pub fn as_raw(&self) -> &[u8] { &self.data }

    pub fn into_raw(self) -> Vec<u8> { self.data }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Samples of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.layout.channels();
        let i = (y as usize * self.width as usize + x as usize) * c;
        &self.data[i..i + c]
    }

    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.layout.channels())
    }

    pub(crate) fn set_pixel(&mut self, index: usize, px: &[u8]) {
        let c = self.layout.channels();
        self.data[index * c..index * c + c].copy_from_slice(px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_checks_length() {
        assert!(PixelBuffer::from_raw(2, 2, PixelLayout::Rgb, vec![0; 12]).is_ok());
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, PixelLayout::Rgba, vec![0; 12]),
            Err(CodecError::BufferMismatch { expected: 16, actual: 12 })
        ));
    }

    #[test]
    fn dimensions_are_fixed_at_construction() {
        let buf = PixelBuffer::new(3, 2, PixelLayout::Rgba);
        assert_eq!((buf.width(), buf.height(), buf.layout()), (3, 2, PixelLayout::Rgba));
        assert_eq!(buf.as_raw().len(), 3 * 2 * 4);
        assert_eq!(buf.pixel_count(), 6);
    }

    #[test]
    fn pixel_addressing_is_row_major() {
        let data: Vec<u8> = (0..8).collect();
        let buf = PixelBuffer::from_raw(2, 2, PixelLayout::GrayAlpha, data).unwrap();
        assert_eq!(buf.pixel(1, 0), &[2, 3]);
        assert_eq!(buf.pixel(0, 1), &[4, 5]);
        assert_eq!(buf.pixels().count(), 4);
    }
}
