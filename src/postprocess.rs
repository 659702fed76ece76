//! Crop and re-encode of a captured image
//!
//! The pipeline only needs one operation from an image library: cut a region
//! out of a file and write it back in place. [`PostProcessor`] is that seam;
//! [`ImagePostProcessor`] fulfils it with the `image` crate.

use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, Limits, RgbaImage};
use log::debug;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Rectangle to keep, in pixels from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// A `width x height` region anchored at the origin
    pub fn top_left(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Overwrites an image file with a cropped, re-encoded copy of itself
pub trait PostProcessor {
    fn crop_and_save(&self, path: &Path, region: CropRegion, quality: u8) -> Result<()>;
}

/// [`PostProcessor`] backed by the `image` crate
///
/// The output format follows the file extension: JPEG is written at the
/// requested quality, PNG is lossless and ignores it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePostProcessor;

impl PostProcessor for ImagePostProcessor {
    fn crop_and_save(&self, path: &Path, region: CropRegion, quality: u8) -> Result<()> {
        let format = ImageFormat::from_path(path).map_err(|e| {
            Error::PostProcessFailed(format!("Unsupported output {}: {}", path.display(), e))
        })?;

        let source = ImageReader::open(path)
            .map_err(|e| Error::PostProcessFailed(format!("Failed to open {}: {}", path.display(), e)))?
            .with_guessed_format()
            .map_err(|e| Error::PostProcessFailed(format!("Failed to read {}: {}", path.display(), e)))?
            .decode()?;

        debug!(
            "Cropping {} from {}x{} to {:?}",
            path.display(),
            source.width(),
            source.height(),
            region
        );
        let cropped = crop_exact(&source, region)?;

        let file = File::create(path).map_err(|e| {
            Error::PostProcessFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;
        let writer = BufWriter::new(file);

        match format {
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(cropped.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality.clamp(1, 100)))?;
            }
            ImageFormat::Png => {
                cropped.write_with_encoder(PngEncoder::new(writer))?;
            }
            other => {
                return Err(Error::PostProcessFailed(format!(
                    "Cannot encode {:?} output",
                    other
                )));
            }
        }
        Ok(())
    }
}

/// Cut `region` out of `image`, always returning exactly `region.width x
/// region.height`. Pixels outside the source are transparent.
///
/// A padded canvas larger than the `image` crate's default allocation limit
/// is refused with [`Error::PostProcessFailed`].
pub fn crop_exact(image: &DynamicImage, region: CropRegion) -> Result<DynamicImage> {
    let CropRegion { x, y, width, height } = region;
    let fits = x.saturating_add(width) <= image.width() && y.saturating_add(height) <= image.height();
    if fits {
        return Ok(image.crop_imm(x, y, width, height));
    }

    check_canvas(width, height)?;
    let mut canvas = RgbaImage::new(width, height);
    let visible_w = width.min(image.width().saturating_sub(x));
    let visible_h = height.min(image.height().saturating_sub(y));
    if visible_w > 0 && visible_h > 0 {
        let visible = image.crop_imm(x, y, visible_w, visible_h).to_rgba8();
        image::imageops::replace(&mut canvas, &visible, 0, 0);
    }
    Ok(DynamicImage::ImageRgba8(canvas))
}

// RGBA8 canvas size, bounded by usize and the decoder's default budget.
fn check_canvas(width: u32, height: u32) -> Result<()> {
    let bytes = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|n| n.checked_mul(4))
        .filter(|&n| usize::try_from(n).is_ok());
    let limit = Limits::default().max_alloc.unwrap_or(u64::MAX);
    match bytes {
        Some(n) if n <= limit => Ok(()),
        _ => Err(Error::PostProcessFailed(format!(
            "Crop region {}x{} is too large to allocate",
            width, height
        ))),
    }
}
