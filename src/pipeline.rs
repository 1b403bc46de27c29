use image::RgbImage;
use tracing::{info, instrument};

use crate::border::{add_border, DEFAULT_PADDING};
use crate::enhance::{enhance, EnhancementParams};
use crate::error::Result;
use crate::geometry::Quadrilateral;
use crate::transform::rectify;

/// Which optional stages `scan` runs, and with what settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub enhance: bool,
    pub add_border: bool,
    pub enhancement: EnhancementParams,
    pub border_padding: i32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            enhance: true,
            add_border: true,
            enhancement: EnhancementParams::default(),
            border_padding: DEFAULT_PADDING,
        }
    }
}

impl ScanOptions {
    /// Rectification only
    pub fn rectify_only() -> Self {
        Self {
            enhance: false,
            add_border: false,
            ..Self::default()
        }
    }
}

/// Turn the region bounded by `quad` into a flat, scan-like page.
///
/// Rectifies, then enhances and borders as `options` request. Any failing
/// stage aborts the whole call; intermediate images are never returned.
#[instrument(skip(img, quad), fields(width = img.width(), height = img.height()))]
pub fn scan(img: &RgbImage, quad: &Quadrilateral, options: &ScanOptions) -> Result<RgbImage> {
    let mut page = rectify(img, quad)?;

    if options.enhance {
        page = enhance(&page, &options.enhancement)?;
    }

    if options.add_border {
        page = add_border(&page, options.border_padding)?;
    }

    info!(
        out_w = page.width(),
        out_h = page.height(),
        "Scan complete"
    );
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::geometry::Point2D;
    use image::Rgb;

    fn sample_quad() -> Quadrilateral {
        Quadrilateral::new(
            [(50.0, 40.0), (350.0, 30.0), (360.0, 270.0), (40.0, 280.0)].map(Point2D::from),
        )
    }

    fn sample_image() -> RgbImage {
        RgbImage::from_fn(400, 300, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn test_default_scan_dimensions() {
        let result = scan(&sample_image(), &sample_quad(), &ScanOptions::default()).unwrap();
        assert_eq!(result.dimensions(), (360, 280));
        assert_eq!(*result.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_rectify_only_matches_rectify() {
        let img = sample_image();
        let quad = sample_quad();
        let scanned = scan(&img, &quad, &ScanOptions::rectify_only()).unwrap();
        let rectified = rectify(&img, &quad).unwrap();
        assert_eq!(scanned, rectified);
        assert_eq!(scanned.dimensions(), (320, 240));
    }

    #[test]
    fn test_border_without_enhancement() {
        let options = ScanOptions {
            enhance: false,
            border_padding: 5,
            ..ScanOptions::default()
        };
        let img = sample_image();
        let quad = sample_quad();
        let scanned = scan(&img, &quad, &options).unwrap();
        let expected = add_border(&rectify(&img, &quad).unwrap(), 5).unwrap();
        assert_eq!(scanned, expected);
    }

    #[test]
    fn test_failing_stage_aborts_scan() {
        let options = ScanOptions {
            border_padding: -3,
            ..ScanOptions::default()
        };
        let result = scan(&sample_image(), &sample_quad(), &options);
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_oversized_quad_fails_without_panicking() {
        let quad = Quadrilateral::new(
            [(0.0, 0.0), (1e12, 0.0), (1e12, 1e12), (0.0, 1e12)].map(Point2D::from),
        );
        let result = scan(&sample_image(), &quad, &ScanOptions::default());
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_coincident_corners_still_scan() {
        let p = Point2D::new(200.0, 150.0);
        let quad = Quadrilateral::new([p; 4]);
        let result = scan(&sample_image(), &quad, &ScanOptions::default()).unwrap();
        assert_eq!(result.dimensions(), (140, 140));
    }
}
