use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use flatscan::cli::{Command, PdfArgs, ScanArgs};
use flatscan::{codec, pdf, scan, Cli};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_scan(args: &ScanArgs, verbose: bool) -> Result<()> {
    let quad = args.quadrilateral().context("Invalid corner points")?;
    let options = args.scan_options().context("Invalid scan options")?;

    let img = codec::open(&args.input)
        .with_context(|| format!("Failed to load input image: {:?}", args.input))?;

    if verbose {
        eprintln!("Loaded image: {:?} ({}x{})", args.input, img.width(), img.height());
        let ordered = quad.order();
        eprintln!(
            "Corners: TL=({:.1}, {:.1}) TR=({:.1}, {:.1}) BR=({:.1}, {:.1}) BL=({:.1}, {:.1})",
            ordered.top_left.x,
            ordered.top_left.y,
            ordered.top_right.x,
            ordered.top_right.y,
            ordered.bottom_right.x,
            ordered.bottom_right.y,
            ordered.bottom_left.x,
            ordered.bottom_left.y
        );
        eprintln!();
    }

    let page = scan(&img, &quad, &options).context("Failed to scan document")?;

    let output_path = args.output_path();
    codec::save_jpeg(&page, &output_path, args.quality)
        .with_context(|| format!("Failed to save output: {:?}", output_path))?;

    eprintln!("Saved scanned page: {:?}", output_path);
    eprintln!(
        "Dimensions: {}x{} -> {}x{}",
        img.width(),
        img.height(),
        page.width(),
        page.height()
    );

    Ok(())
}

fn run_pdf(args: &PdfArgs) -> Result<()> {
    let pages = pdf::load_pages(&args.inputs).context("Failed to load pages")?;
    if pages.len() < args.inputs.len() {
        eprintln!(
            "Skipped {} missing page(s)",
            args.inputs.len() - pages.len()
        );
    }

    pdf::write_pdf(&pages, &args.title, &args.output)
        .with_context(|| format!("Failed to write PDF: {:?}", args.output))?;

    eprintln!("Saved PDF: {:?} ({} pages)", args.output, pages.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Scan(args) => run_scan(args, cli.verbose),
        Command::Pdf(args) => run_pdf(args),
    }
}
