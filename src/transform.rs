use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ScanError};
use crate::geometry::{
    check_output_size, destination_corners, order_corners, perspective_transform,
    target_dimensions, Quadrilateral,
};

/// Fill for destination pixels whose source lies outside the image
const OUTSIDE: Rgb<u8> = Rgb([0, 0, 0]);

/// Produce a top-down view of the region bounded by `quad`.
///
/// The output is at least 100x100 regardless of how small or degenerate the
/// quadrilateral is. Degenerate corners give a black page of that size.
/// Pages larger than [`MAX_OUTPUT_PIXELS`](crate::geometry::MAX_OUTPUT_PIXELS)
/// are rejected with `InvalidInput` before anything is allocated.
#[instrument(skip_all, fields(width = img.width(), height = img.height()))]
pub fn rectify(img: &RgbImage, quad: &Quadrilateral) -> Result<RgbImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ScanError::invalid("source image is empty"));
    }

    let ordered = order_corners(quad);
    let (out_w, out_h) = target_dimensions(&ordered);
    check_output_size(out_w, out_h)?;

    debug!(
        top_left = ?ordered.top_left,
        top_right = ?ordered.top_right,
        bottom_right = ?ordered.bottom_right,
        bottom_left = ?ordered.bottom_left,
        out_w,
        out_h,
        "Corners ordered"
    );

    let src = ordered.to_array();
    let dst = destination_corners(out_w, out_h);

    let mut output = RgbImage::new(out_w, out_h);
    match perspective_transform(&src, &dst) {
        Some(projection) => {
            warp_into(img, &projection, Interpolation::Bilinear, OUTSIDE, &mut output)
        }
        None => warn!(out_w, out_h, "Degenerate quadrilateral, returning a blank page"),
    }

    info!(out_w, out_h, "Rectification complete");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2D;

    fn quad(points: [(f64, f64); 4]) -> Quadrilateral {
        Quadrilateral::new(points.map(Point2D::from))
    }

    fn assert_near(actual: &Rgb<u8>, expected: [u8; 3]) {
        for c in 0..3 {
            assert!(
                (actual[c] as i32 - expected[c] as i32).abs() <= 1,
                "{:?} vs {:?}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_rectify_skewed_page_dimensions() {
        let img = RgbImage::from_pixel(400, 300, Rgb([180, 170, 160]));
        let q = quad([(50.0, 40.0), (350.0, 30.0), (360.0, 270.0), (40.0, 280.0)]);
        let result = rectify(&img, &q).unwrap();
        assert_eq!(result.dimensions(), (320, 240));

        // Everything maps inside the uniform source
        assert_near(result.get_pixel(160, 120), [180, 170, 160]);
        assert_near(result.get_pixel(1, 1), [180, 170, 160]);
    }

    #[test]
    fn test_rectify_full_frame_matches_crop() {
        let img = RgbImage::from_fn(201, 151, |x, y| {
            if x < 100 { Rgb([250, 250, 250]) } else { Rgb([10, 10, 10]) }
        });
        let q = quad([(0.0, 0.0), (200.0, 0.0), (200.0, 150.0), (0.0, 150.0)]);
        let result = rectify(&img, &q).unwrap();
        assert_eq!(result.dimensions(), (200, 150));
        assert_near(result.get_pixel(10, 75), [250, 250, 250]);
        assert_near(result.get_pixel(190, 75), [10, 10, 10]);
    }

    #[test]
    fn test_rectify_coincident_corners_floor() {
        let img = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let p = (10.0, 10.0);
        let result = rectify(&img, &quad([p, p, p, p])).unwrap();
        assert_eq!(result.dimensions(), (100, 100));
    }

    #[test]
    fn test_rectify_outside_source_is_black() {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let q = quad([(500.0, 500.0), (800.0, 500.0), (800.0, 700.0), (500.0, 700.0)]);
        let result = rectify(&img, &q).unwrap();
        assert_eq!(result.dimensions(), (300, 200));
        assert_eq!(*result.get_pixel(150, 100), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_rectify_rejects_oversized_page() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let huge = quad([(0.0, 0.0), (1e12, 0.0), (1e12, 1e12), (0.0, 1e12)]);
        assert!(matches!(rectify(&img, &huge), Err(ScanError::InvalidInput(_))));

        let wide = quad([(0.0, 0.0), (1e6, 0.0), (1e6, 1e6), (0.0, 1e6)]);
        assert!(matches!(rectify(&img, &wide), Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_rectify_degenerate_page_is_black() {
        let img = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let line = quad([(0.0, 0.0), (20.0, 20.0), (40.0, 40.0), (0.0, 40.0)]);
        let result = rectify(&img, &line).unwrap();
        assert!(result.pixels().all(|p| *p == OUTSIDE));
    }

    #[test]
    fn test_rectify_rejects_empty_image() {
        let img = RgbImage::new(0, 0);
        let q = quad([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(matches!(rectify(&img, &q), Err(ScanError::InvalidInput(_))));
    }
}
