use std::cmp::Ordering;

use imageproc::geometric_transformations::Projection;

use crate::error::{Result, ScanError};

/// Smallest width or height a rectified page may have, in pixels
pub const MIN_OUTPUT_SIDE: u32 = 100;

/// Largest page, in pixels, any stage will allocate
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 28;

/// A point in source-image pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    fn lexicographic_cmp(&self, other: &Point2D) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// The document boundary as marked by the caller: exactly four points, in any order.
///
/// Collinear or coincident corners are accepted. They produce a small,
/// well-formed page of undefined visual quality rather than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral([Point2D; 4]);

impl Quadrilateral {
    pub fn new(points: [Point2D; 4]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point2D; 4] {
        &self.0
    }

    /// Assign top-left/top-right/bottom-right/bottom-left roles
    pub fn order(&self) -> OrderedQuad {
        order_corners(self)
    }
}

impl TryFrom<&[Point2D]> for Quadrilateral {
    type Error = ScanError;

    fn try_from(points: &[Point2D]) -> Result<Self> {
        let points: [Point2D; 4] = points.try_into().map_err(|_| {
            ScanError::invalid(format!(
                "a quadrilateral needs exactly 4 corners, got {}",
                points.len()
            ))
        })?;
        Ok(Self(points))
    }
}

impl TryFrom<Vec<Point2D>> for Quadrilateral {
    type Error = ScanError;

    fn try_from(points: Vec<Point2D>) -> Result<Self> {
        Self::try_from(points.as_slice())
    }
}

impl TryFrom<Vec<(f64, f64)>> for Quadrilateral {
    type Error = ScanError;

    fn try_from(pairs: Vec<(f64, f64)>) -> Result<Self> {
        let points: Vec<Point2D> = pairs.into_iter().map(Point2D::from).collect();
        Self::try_from(points)
    }
}

/// Quadrilateral corners with fixed semantic roles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedQuad {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_right: Point2D,
    pub bottom_left: Point2D,
}

impl OrderedQuad {
    /// Corners as an array in TL, TR, BR, BL order
    pub fn to_array(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Reinterpret the ordered corners as a plain quadrilateral
    pub fn to_quad(&self) -> Quadrilateral {
        Quadrilateral::new(self.to_array())
    }
}

/// Pick the point minimizing (or maximizing) `metric`.
///
/// Ties go to the lexicographically smallest point by (x, y), so the
/// choice only depends on the set of points and never on input order.
fn extreme_by<F>(points: &[Point2D; 4], metric: F, want_max: bool) -> Point2D
where
    F: Fn(&Point2D) -> f64,
{
    let mut best = points[0];
    for candidate in &points[1..] {
        let ord = metric(candidate).total_cmp(&metric(&best));
        let better = if want_max {
            ord == Ordering::Greater
        } else {
            ord == Ordering::Less
        };
        if better || (ord == Ordering::Equal && candidate.lexicographic_cmp(&best).is_lt()) {
            best = *candidate;
        }
    }
    best
}

/// Canonicalize four unordered points into (TL, TR, BR, BL).
///
/// `x + y` is smallest at the top-left and largest at the bottom-right;
/// `y - x` is smallest at the top-right and largest at the bottom-left.
/// Assumes the document is roughly upright in the frame.
pub fn order_corners(quad: &Quadrilateral) -> OrderedQuad {
    let points = quad.points();
    let sum = |p: &Point2D| p.x + p.y;
    let diff = |p: &Point2D| p.y - p.x;

    OrderedQuad {
        top_left: extreme_by(points, sum, false),
        top_right: extreme_by(points, diff, false),
        bottom_right: extreme_by(points, sum, true),
        bottom_left: extreme_by(points, diff, true),
    }
}

/// Width and height of the rectified page.
///
/// Each side is the longer of its two opposite edges, truncated to whole
/// pixels and floored at [`MIN_OUTPUT_SIDE`].
pub fn target_dimensions(ordered: &OrderedQuad) -> (u32, u32) {
    let width_bottom = ordered.bottom_right.distance(&ordered.bottom_left);
    let width_top = ordered.top_right.distance(&ordered.top_left);
    let height_right = ordered.top_right.distance(&ordered.bottom_right);
    let height_left = ordered.top_left.distance(&ordered.bottom_left);

    let width = truncate_side(width_bottom).max(truncate_side(width_top));
    let height = truncate_side(height_right).max(truncate_side(height_left));

    (width.max(MIN_OUTPUT_SIDE), height.max(MIN_OUTPUT_SIDE))
}

fn truncate_side(length: f64) -> u32 {
    if length.is_finite() && length > 0.0 {
        length.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Reject page sizes whose pixel count exceeds [`MAX_OUTPUT_PIXELS`]
pub fn check_output_size(width: u32, height: u32) -> Result<()> {
    match (width as u64).checked_mul(height as u64) {
        Some(pixels) if pixels <= MAX_OUTPUT_PIXELS => Ok(()),
        _ => Err(ScanError::invalid(format!(
            "output page of {}x{} pixels exceeds the limit of {} pixels",
            width, height, MAX_OUTPUT_PIXELS
        ))),
    }
}

/// Corners of a `width` x `height` pixel grid in TL, TR, BR, BL order
pub fn destination_corners(width: u32, height: u32) -> [Point2D; 4] {
    let right = width.saturating_sub(1) as f64;
    let bottom = height.saturating_sub(1) as f64;
    [
        Point2D::new(0.0, 0.0),
        Point2D::new(right, 0.0),
        Point2D::new(right, bottom),
        Point2D::new(0.0, bottom),
    ]
}

/// Projective transform mapping each `src[i]` onto `dst[i]`.
///
/// Returns `None` when the correspondences are degenerate: coincident or
/// collinear corners on either side, or a solve that fails numerically.
pub fn perspective_transform(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Option<Projection> {
    if has_collinear_triple(src) || has_collinear_triple(dst) {
        return None;
    }

    let to_f32 = |p: Point2D| (p.x as f32, p.y as f32);
    Projection::from_control_points(src.map(to_f32), dst.map(to_f32))
}

/// True when any three of the four points lie on one line.
fn has_collinear_triple(points: &[Point2D; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (points[i], points[j], points[k]);
        let twice_area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        twice_area.abs() < 1e-9
    })
}
