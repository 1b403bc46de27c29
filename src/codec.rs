//! Image decode/encode boundary.
//!
//! The scanning stages only see in-memory `RgbImage` buffers. Callers use
//! these helpers to get images in and out of files and byte streams.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, RgbImage};
use tracing::{debug, instrument};

use crate::error::{Result, ScanError};

/// JPEG quality for saved scans
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

fn ensure_non_empty(img: RgbImage) -> Result<RgbImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ScanError::invalid("decoded image has no pixels"));
    }
    Ok(img)
}

/// Decode raw encoded bytes (JPEG, PNG, ...) into an RGB buffer.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(data)?;
    debug!(width = img.width(), height = img.height(), "Image decoded");
    ensure_non_empty(img.to_rgb8())
}

/// Open and decode an image file into an RGB buffer.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>) -> Result<RgbImage> {
    let img = ImageReader::open(path.as_ref())?
        .with_guessed_format()?
        .decode()?;
    debug!(width = img.width(), height = img.height(), "Image opened");
    ensure_non_empty(img.to_rgb8())
}

fn check_quality(quality: u8) -> Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(ScanError::invalid(format!(
            "JPEG quality must be within 1..=100, got {}",
            quality
        )));
    }
    Ok(())
}

/// Encode `img` as JPEG at the given quality (1-100).
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    check_quality(quality)?;
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(img)
        .map_err(|err| ScanError::Encode(err.to_string()))?;
    Ok(bytes)
}

/// Encode `img` as JPEG and write it to `path`.
#[instrument(skip(img), fields(path = %path.as_ref().display()))]
pub fn save_jpeg(img: &RgbImage, path: impl AsRef<Path>, quality: u8) -> Result<()> {
    check_quality(quality)?;
    let file = File::create(path.as_ref())?;
    JpegEncoder::new_with_quality(BufWriter::new(file), quality)
        .encode_image(img)
        .map_err(|err| ScanError::Encode(err.to_string()))?;
    debug!("JPEG written");
    Ok(())
}
