//! PNG bridge for [`PixelBuffer`]s.
//!
//! Extraction saves decoded textures as RGB or RGBA PNGs.  Injection loads
//! an edited PNG, converts it to the channel layout the target format reads
//! (intensity, intensity+alpha, or RGBA) and resizes it to the placement's
//! exact dimensions.

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer};
use std::path::Path;
use thiserror::Error;

use crate::codec::CodecError;
use crate::format::FormatTag;
use crate::pixel::{PixelBuffer, PixelLayout};

#[derive(Error, Debug)]
pub enum ImageIoError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Pixel buffer does not match its dimensions")]
    Layout,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Resampling filter used when a replacement image has the wrong size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(f: ResizeFilter) -> Self {
        match f {
            ResizeFilter::Nearest    => FilterType::Nearest,
            ResizeFilter::Triangle   => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian   => FilterType::Gaussian,
            ResizeFilter::Lanczos3   => FilterType::Lanczos3,
        }
    }
}

/// Channel layout the injection path converts to before encoding `format`.
pub fn source_layout(format: FormatTag) -> PixelLayout {
    match format {
        FormatTag::I4  | FormatTag::I8                      => PixelLayout::Gray,
        FormatTag::Ia4 | FormatTag::Ia8 | FormatTag::Ia16   => PixelLayout::GrayAlpha,
        FormatTag::Rgba16 | FormatTag::Rgba32               => PixelLayout::Rgba,
    }
}

fn to_dynamic(buffer: &PixelBuffer) -> Result<DynamicImage, ImageIoError> {
    let (w, h) = (buffer.width(), buffer.height());
    let raw = buffer.as_raw().to_vec();
    let img = match buffer.layout() {
        PixelLayout::Gray      => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
        PixelLayout::GrayAlpha => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8),
        PixelLayout::Rgb       => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
        PixelLayout::Rgba      => ImageBuffer::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
    };
    img.ok_or(ImageIoError::Layout)
}

fn from_dynamic(img: &DynamicImage, layout: PixelLayout) -> Result<PixelBuffer, ImageIoError> {
    let (w, h) = (img.width(), img.height());
    let raw = match layout {
        PixelLayout::Gray      => img.to_luma8().into_raw(),
        PixelLayout::GrayAlpha => img.to_luma_alpha8().into_raw(),
        PixelLayout::Rgb       => img.to_rgb8().into_raw(),
        PixelLayout::Rgba      => img.to_rgba8().into_raw(),
    };
    Ok(PixelBuffer::from_raw(w, h, layout, raw)?)
}

/// Write `buffer` as a PNG at `path`.  Parent directories must exist.
pub fn save_png<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> Result<(), ImageIoError> {
    to_dynamic(buffer)?.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Load any supported image file in its native channel layout (8-bit).
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<PixelBuffer, ImageIoError> {
    let img = image::open(path)?;
    let layout = match (img.color().has_color(), img.color().has_alpha()) {
        (false, false) => PixelLayout::Gray,
        (false, true)  => PixelLayout::GrayAlpha,
        (true,  false) => PixelLayout::Rgb,
        (true,  true)  => PixelLayout::Rgba,
    };
    from_dynamic(&img, layout)
}

/// Load a replacement texture ready for [`encode`](crate::codec::encode):
/// converted to [`source_layout`] of `format` and resized to exactly
/// `width × height`.
pub fn load_for_format<P: AsRef<Path>>(
    path:   P,
    format: FormatTag,
    width:  u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<PixelBuffer, ImageIoError> {
    let img = image::open(path)?;
    prepare(img, format, width, height, filter)
}

/// Convert then resize an in-memory image, as [`load_for_format`] does.
pub fn prepare(
    img:    DynamicImage,
    format: FormatTag,
    width:  u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<PixelBuffer, ImageIoError> {
    let layout = source_layout(format);
    let converted = to_dynamic(&from_dynamic(&img, layout)?)?;
    let sized = if converted.width() == width && converted.height() == height {
        converted
    } else {
        tracing::debug!(
            "Resizing {}x{} -> {}x{} ({:?})",
            converted.width(), converted.height(), width, height, filter,
        );
        converted.resize_exact(width, height, filter.into())
    };
    from_dynamic(&sized, layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_layouts() {
        assert_eq!(source_layout(FormatTag::I4), PixelLayout::Gray);
        assert_eq!(source_layout(FormatTag::Ia16), PixelLayout::GrayAlpha);
        assert_eq!(source_layout(FormatTag::Rgba16), PixelLayout::Rgba);
    }

    #[test]
    fn png_roundtrip_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        let data: Vec<u8> = (0..4 * 2 * 4).map(|i| (i * 7) as u8).collect();
        let buf = PixelBuffer::from_raw(4, 2, PixelLayout::Rgba, data).unwrap();
        save_png(&buf, &path).unwrap();
        assert_eq!(load_image(&path).unwrap(), buf);
    }

    #[test]
    fn prepare_resizes_and_converts() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 8, image::Rgba([200, 200, 200, 255])));
        let buf = prepare(img, FormatTag::Ia8, 4, 2, ResizeFilter::Nearest).unwrap();
        assert_eq!((buf.width(), buf.height(), buf.layout()), (4, 2, PixelLayout::GrayAlpha));
        assert_eq!(buf.pixel(3, 1)[1], 255);
    }
}
