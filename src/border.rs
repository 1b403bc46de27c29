use image::{imageops, Rgb, RgbImage};
use tracing::{debug, instrument};

use crate::error::{Result, ScanError};
use crate::geometry::check_output_size;

/// Border fill colour
pub const BORDER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Default margin added around a scanned page, in pixels
pub const DEFAULT_PADDING: i32 = 20;

/// Surround `img` with a white margin of `padding` pixels on every side.
///
/// Always allocates a new `(W + 2p) x (H + 2p)` buffer, even for `padding == 0`.
#[instrument(skip(img), fields(width = img.width(), height = img.height()))]
pub fn add_border(img: &RgbImage, padding: i32) -> Result<RgbImage> {
    if padding < 0 {
        return Err(ScanError::invalid(format!(
            "border padding must be non-negative, got {}",
            padding
        )));
    }

    let pad = padding as u32;
    let (width, height) = img.dimensions();
    let new_width = width
        .checked_add(pad.saturating_mul(2))
        .ok_or_else(|| ScanError::invalid("bordered image width overflows"))?;
    let new_height = height
        .checked_add(pad.saturating_mul(2))
        .ok_or_else(|| ScanError::invalid("bordered image height overflows"))?;
    check_output_size(new_width, new_height)?;

    let mut output = RgbImage::from_pixel(new_width, new_height, BORDER_COLOR);
    imageops::replace(&mut output, img, pad as i64, pad as i64);

    debug!(new_width, new_height, "Border added");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_dimensions_and_fill() {
        let img = RgbImage::from_pixel(30, 10, Rgb([5, 6, 7]));
        let result = add_border(&img, 4).unwrap();

        assert_eq!(result.dimensions(), (38, 18));
        assert_eq!(*result.get_pixel(0, 0), BORDER_COLOR);
        assert_eq!(*result.get_pixel(37, 17), BORDER_COLOR);
        assert_eq!(*result.get_pixel(3, 9), BORDER_COLOR);
        assert_eq!(*result.get_pixel(4, 4), Rgb([5, 6, 7]));
        assert_eq!(*result.get_pixel(33, 13), Rgb([5, 6, 7]));
        assert_eq!(*result.get_pixel(34, 13), BORDER_COLOR);
    }

    #[test]
    fn test_zero_padding_copies_content() {
        let img = RgbImage::from_fn(12, 9, |x, y| Rgb([x as u8, y as u8, 42]));
        let result = add_border(&img, 0).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_negative_padding_fails() {
        let img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        assert!(matches!(add_border(&img, -1), Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_huge_padding_fails() {
        let img = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        assert!(matches!(add_border(&img, i32::MAX), Err(ScanError::InvalidInput(_))));
    }
}
