//! Square cover art.
//!
//! Resizing strategy: the shorter side is scaled to the target length
//! (preserving aspect ratio), then the longer side is cropped around its
//! centre down to the same length. Portrait and landscape images go through
//! the same arithmetic with the axes swapped.

use crate::error::{ErrorKind, Result};
use crate::{ImageResizer, TempFile};
use exn::ResultExt;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::instrument;

/// Where the scaled image is cropped to end up square.
///
/// When the number of pixels to lose is odd, the leading edge (top or left)
/// loses `floor(loss / 2)` and the trailing edge one more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareGeometry {
    /// Dimensions after the aspect-preserving resize.
    pub scaled: (u32, u32),
    /// Top-left corner of the crop within the scaled image.
    pub offset: (u32, u32),
    /// Edge length of the final square.
    pub length: u32,
}

impl SquareGeometry {
    pub fn new(width: u32, height: u32, length: u32) -> Result<Self> {
        if width == 0 || height == 0 || length == 0 {
            exn::bail!(ErrorKind::EmptyImage);
        }
        let scaled = if width < height {
            // Portrait: width fits, height is cropped.
            (length, scale_long_side(height, width, length))
        } else {
            // Landscape or already square: height fits, width is cropped.
            (scale_long_side(width, height, length), length)
        };
        let offset = ((scaled.0 - length) / 2, (scaled.1 - length) / 2);
        Ok(Self { scaled, offset, length })
    }
}

/// `floor(long * length / short)`, never less than `length` since `long >= short`.
fn scale_long_side(long: u32, short: u32, length: u32) -> u32 {
    let scaled = u64::from(long) * u64::from(length) / u64::from(short);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(length)
}

/// Resizes and centre-crops `image` to exactly `length`×`length` pixels.
pub fn square(image: &DynamicImage, length: u32) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    let geometry = SquareGeometry::new(width, height, length)?;
    let (scaled_width, scaled_height) = geometry.scaled;
    let resized = image.resize_exact(scaled_width, scaled_height, FilterType::Lanczos3);
    let (x, y) = geometry.offset;
    Ok(resized.crop_imm(x, y, length, length))
}

/// [`ImageResizer`] that decodes any supported format, drops the alpha
/// channel and writes the square as a JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegSquare;

impl ImageResizer for JpegSquare {
    #[instrument(skip(self), fields(source = %source.display()))]
    fn square(&self, source: &Path, length: u32) -> Result<TempFile> {
        let image = image::open(source).or_raise(|| ErrorKind::ImageDecode(source.to_path_buf()))?;
        let image = DynamicImage::ImageRgb8(image.to_rgb8());
        let squared = square(&image, length)?;
        let mut cover = tempfile::Builder::new().prefix("cover-").suffix(".jpg").tempfile().or_raise(|| ErrorKind::Io)?;
        {
            let mut writer = BufWriter::new(cover.as_file_mut());
            squared.write_to(&mut writer, ImageFormat::Jpeg).or_raise(|| ErrorKind::ImageEncode)?;
            writer.flush().or_raise(|| ErrorKind::Io)?;
        }
        tracing::debug!(length, cover = %cover.path().display(), "Cover art prepared");
        Ok(cover)
    }
}
