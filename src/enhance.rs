use image::{GrayImage, Luma, Rgb, RgbImage};
use tracing::{debug, info, instrument};

use crate::error::{Result, ScanError};

/// Tiles per axis for the local equalization grid
pub const TILE_GRID: u32 = 8;

/// How many times the mean bin count a histogram bin may hold before clipping
pub const CLIP_LIMIT: f64 = 2.0;

const HIST_BINS: usize = 256;

/// Global brightness/contrast shift applied after local equalization.
///
/// Both values live in [-100, 100]. `(0, 0)` means local equalization only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnhancementParams {
    pub brightness: i32,
    pub contrast: i32,
}

impl EnhancementParams {
    pub fn new(brightness: i32, contrast: i32) -> Result<Self> {
        let params = Self {
            brightness,
            contrast,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("brightness", self.brightness), ("contrast", self.contrast)] {
            if !(-100..=100).contains(&value) {
                return Err(ScanError::invalid(format!(
                    "{} must be within [-100, 100], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// True when the global remap would leave pixels untouched
    pub fn is_neutral(&self) -> bool {
        self.brightness == 0 && self.contrast == 0
    }

    /// `(alpha, beta)` for `alpha * v + beta`
    pub fn gain_and_bias(&self) -> (f64, f64) {
        (1.0 + self.contrast as f64 / 100.0, self.brightness as f64)
    }
}

// -- Colour space ---------------------------------------------------------------

// D65 reference white
const WHITE_X: f64 = 0.950456;
const WHITE_Z: f64 = 1.088754;
const LAB_EPSILON: f64 = 0.008856;
const LAB_KAPPA: f64 = 903.3;

fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f64) -> f64 {
    let t = f * f * f;
    if t > LAB_EPSILON {
        t
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// sRGB pixel to 8-bit lightness plus unscaled a*/b* chroma.
///
/// Lightness is stored as `L * 255 / 100` so it spans the full byte range.
fn rgb_to_lab(pixel: &Rgb<u8>) -> (u8, [f64; 2]) {
    let r = srgb_to_linear(pixel[0]);
    let g = srgb_to_linear(pixel[1]);
    let b = srgb_to_linear(pixel[2]);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        LAB_KAPPA * y
    };

    let l8 = (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8;
    (l8, [500.0 * (fx - fy), 200.0 * (fy - fz)])
}

fn lab_to_rgb(l8: u8, chroma: [f64; 2]) -> Rgb<u8> {
    let l = l8 as f64 * 100.0 / 255.0;
    let fy = (l + 16.0) / 116.0;
    let fx = fy + chroma[0] / 500.0;
    let fz = fy - chroma[1] / 200.0;

    let y = if l > LAB_KAPPA * LAB_EPSILON {
        fy * fy * fy
    } else {
        l / LAB_KAPPA
    };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875991 * y + 0.041556 * z;
    let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)])
}

// -- Tiled contrast-limited equalization ----------------------------------------

/// Build the clipped-histogram equalization map for one tile.
fn tile_lut(hist: &mut [u32; HIST_BINS], area: u32) -> [u8; HIST_BINS] {
    let clip = ((CLIP_LIMIT * area as f64 / HIST_BINS as f64) as u32).max(1);

    let mut clipped = 0u32;
    for count in hist.iter_mut() {
        if *count > clip {
            clipped += *count - clip;
            *count = clip;
        }
    }

    let batch = clipped / HIST_BINS as u32;
    let mut residual = clipped - batch * HIST_BINS as u32;
    for count in hist.iter_mut() {
        *count += batch;
    }
    if residual > 0 {
        let step = (HIST_BINS / residual as usize).max(1);
        let mut bin = 0;
        while bin < HIST_BINS && residual > 0 {
            hist[bin] += 1;
            residual -= 1;
            bin += step;
        }
    }

    let scale = 255.0 / area as f64;
    let mut lut = [0u8; HIST_BINS];
    let mut cumulative = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *entry = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Start offsets of `grid` near-equal spans covering `len` pixels, plus `len`.
fn tile_bounds(len: u32, grid: u32) -> Vec<u32> {
    (0..=grid)
        .map(|i| (i as u64 * len as u64 / grid as u64) as u32)
        .collect()
}

/// Left tile index, right tile index and right-hand weight for coordinate `pos`.
fn blend_weights(pos: u32, tile_size: f64, grid: u32) -> (usize, usize, f64) {
    let t = (pos as f64 + 0.5) / tile_size - 0.5;
    let lower = t.floor();
    let weight = t - lower;
    let last = grid as i64 - 1;
    let first = (lower as i64).clamp(0, last) as usize;
    let second = (lower as i64 + 1).clamp(0, last) as usize;
    (first, second, weight)
}

/// Contrast-limited adaptive histogram equalization of a single channel.
///
/// The image is split into a [`TILE_GRID`] x [`TILE_GRID`] grid (fewer tiles
/// along an axis shorter than that). Each tile gets its own clipped
/// equalization map, and every pixel blends the maps of the four nearest
/// tile centres.
pub fn equalize_adaptive(channel: &GrayImage) -> GrayImage {
    let (width, height) = channel.dimensions();
    if width == 0 || height == 0 {
        return channel.clone();
    }

    let grid_x = TILE_GRID.min(width);
    let grid_y = TILE_GRID.min(height);
    let xs = tile_bounds(width, grid_x);
    let ys = tile_bounds(height, grid_y);

    let mut luts = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y as usize {
        for tx in 0..grid_x as usize {
            let mut hist = [0u32; HIST_BINS];
            for y in ys[ty]..ys[ty + 1] {
                for x in xs[tx]..xs[tx + 1] {
                    hist[channel.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (xs[tx + 1] - xs[tx]) * (ys[ty + 1] - ys[ty]);
            luts.push(tile_lut(&mut hist, area));
        }
    }

    debug!(grid_x, grid_y, "Tile equalization maps built");

    let tile_w = width as f64 / grid_x as f64;
    let tile_h = height as f64 / grid_y as f64;
    let lut_at = |tx: usize, ty: usize| &luts[ty * grid_x as usize + tx];

    GrayImage::from_fn(width, height, |x, y| {
        let v = channel.get_pixel(x, y)[0] as usize;
        let (tx1, tx2, xa) = blend_weights(x, tile_w, grid_x);
        let (ty1, ty2, ya) = blend_weights(y, tile_h, grid_y);

        let top = lut_at(tx1, ty1)[v] as f64 * (1.0 - xa) + lut_at(tx2, ty1)[v] as f64 * xa;
        let bottom = lut_at(tx1, ty2)[v] as f64 * (1.0 - xa) + lut_at(tx2, ty2)[v] as f64 * xa;
        let value = top * (1.0 - ya) + bottom * ya;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Apply `clamp(round(alpha * v + beta), 0, 255)` to every channel.
pub fn adjust_brightness_contrast(img: &RgbImage, params: &EnhancementParams) -> RgbImage {
    let (alpha, beta) = params.gain_and_bias();
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = (alpha * *c as f64 + beta).round().clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Make a rectified page read like an evenly lit scan.
///
/// Lightness is equalized locally in L*a*b* space while the chroma channels
/// pass through untouched. A global brightness/contrast remap follows when
/// `params` is not neutral. Dimensions are preserved and the result is a
/// pure function of the input.
#[instrument(skip(img), fields(width = img.width(), height = img.height()))]
pub fn enhance(img: &RgbImage, params: &EnhancementParams) -> Result<RgbImage> {
    params.validate()?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::invalid("cannot enhance an empty image"));
    }

    let mut lightness = GrayImage::new(width, height);
    let mut chroma = Vec::with_capacity(width as usize * height as usize);
    for (x, y, pixel) in img.enumerate_pixels() {
        let (l, ab) = rgb_to_lab(pixel);
        lightness.put_pixel(x, y, Luma([l]));
        chroma.push(ab);
    }

    let equalized = equalize_adaptive(&lightness);

    // enumerate_pixels walks rows in the same order chroma was filled
    let recombined = RgbImage::from_fn(width, height, |x, y| {
        let idx = y as usize * width as usize + x as usize;
        lab_to_rgb(equalized.get_pixel(x, y)[0], chroma[idx])
    });

    let output = if params.is_neutral() {
        recombined
    } else {
        debug!(
            brightness = params.brightness,
            contrast = params.contrast,
            "Applying global brightness/contrast"
        );
        adjust_brightness_contrast(&recombined, params)
    };

    info!("Enhancement complete");
    Ok(output)
}
