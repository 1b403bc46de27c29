use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::border::DEFAULT_PADDING;
use crate::codec::DEFAULT_JPEG_QUALITY;
use crate::enhance::EnhancementParams;
use crate::error::Result;
use crate::geometry::{Point2D, Quadrilateral};
use crate::pdf::DEFAULT_TITLE;
use crate::pipeline::ScanOptions;

#[derive(Parser, Debug)]
#[command(name = "flatscan")]
#[command(version, about = "Rectify photographed documents into flat, evenly lit scans")]
pub struct Cli {
    /// Show debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rectify and enhance one photographed page
    Scan(ScanArgs),
    /// Combine scanned pages into a single PDF
    Pdf(PdfArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// The four document corners as X,Y pairs, in any order
    #[arg(
        short,
        long,
        required = true,
        num_args = 4,
        allow_hyphen_values = true,
        value_parser = parse_point
    )]
    pub corners: Vec<Point2D>,

    /// Output path [default: input_scanned.jpg]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip local contrast enhancement
    #[arg(long)]
    pub no_enhance: bool,

    /// Skip the white border
    #[arg(long)]
    pub no_border: bool,

    /// Global brightness shift applied after enhancement
    #[arg(long, default_value_t = 0, allow_hyphen_values = true,
          value_parser = clap::value_parser!(i32).range(-100..=100))]
    pub brightness: i32,

    /// Global contrast change applied after enhancement
    #[arg(long, default_value_t = 0, allow_hyphen_values = true,
          value_parser = clap::value_parser!(i32).range(-100..=100))]
    pub contrast: i32,

    /// Border width in pixels
    #[arg(long, default_value_t = DEFAULT_PADDING,
          value_parser = clap::value_parser!(i32).range(0..))]
    pub padding: i32,

    /// JPEG quality of the written scan
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,
}

impl ScanArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().unwrap_or_default().to_string_lossy();
            let parent = self.input.parent().unwrap_or(Path::new("."));
            parent.join(format!("{}_scanned.jpg", stem))
        })
    }

    pub fn quadrilateral(&self) -> Result<Quadrilateral> {
        Quadrilateral::try_from(self.corners.as_slice())
    }

    pub fn scan_options(&self) -> Result<ScanOptions> {
        Ok(ScanOptions {
            enhance: !self.no_enhance,
            add_border: !self.no_border,
            enhancement: EnhancementParams::new(self.brightness, self.contrast)?,
            border_padding: self.padding,
        })
    }
}

#[derive(Args, Debug)]
pub struct PdfArgs {
    /// Scanned page images, in page order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output PDF path
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// Document title stored in the PDF metadata
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,
}

fn parse_point(s: &str) -> std::result::Result<Point2D, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid corner '{}', expected X,Y", s));
    }

    let x: f64 = parts[0]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid x coordinate: {}", parts[0]))?;
    let y: f64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid y coordinate: {}", parts[1]))?;

    if !x.is_finite() || !y.is_finite() {
        return Err("Corner coordinates must be finite".to_string());
    }

    Ok(Point2D::new(x, y))
}
