//! Page sequencer: combines scanned pages into one multi-page PDF.
//!
//! Uses `printpdf` 0.8's data-oriented API. Each page is sized to its image
//! at [`PAGE_DPI`], so pages keep their pixel proportions and nothing is
//! scaled or cropped.

use std::path::Path;

use image::RgbImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::error::{Result, ScanError};

/// Resolution used to turn page pixels into physical page size
pub const PAGE_DPI: f32 = 96.0;

/// Default document title embedded in the PDF metadata
pub const DEFAULT_TITLE: &str = "Scanned Document";

fn pixels_to_mm(pixels: u32) -> Mm {
    Mm(pixels as f32 / PAGE_DPI * 25.4)
}

fn image_page(doc: &mut PdfDocument, img: &RgbImage) -> PdfPage {
    let (width, height) = img.dimensions();
    let raw = RawImage {
        pixels: RawImageData::U8(img.as_raw().clone()),
        width: width as usize,
        height: height as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };
    let xobject_id = doc.add_image(&raw);

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(PAGE_DPI),
            rotate: None,
        },
    }];

    PdfPage::new(pixels_to_mm(width), pixels_to_mm(height), ops)
}

/// Build a PDF with one page per image, in order.
#[instrument(skip(pages), fields(page_count = pages.len()))]
pub fn images_to_pdf(pages: &[RgbImage], title: &str) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(ScanError::invalid("no pages to put in the PDF"));
    }
    if let Some(index) = pages.iter().position(|p| p.width() == 0 || p.height() == 0) {
        return Err(ScanError::invalid(format!("page {} has no pixels", index + 1)));
    }

    let mut doc = PdfDocument::new(title);
    let pdf_pages: Vec<PdfPage> = pages.iter().map(|img| image_page(&mut doc, img)).collect();
    doc.with_pages(pdf_pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if output.is_empty() {
        return Err(ScanError::Pdf("printpdf produced an empty document".to_string()));
    }

    debug!(warnings = warnings.len(), bytes = output.len(), "PDF serialised");
    Ok(output)
}

/// Build a PDF from already encoded pages (JPEG, PNG, ...), in order.
pub fn encoded_pages_to_pdf<B: AsRef<[u8]>>(pages: &[B], title: &str) -> Result<Vec<u8>> {
    let decoded = pages
        .iter()
        .map(|bytes| codec::decode(bytes.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    images_to_pdf(&decoded, title)
}

/// Load page images in order, skipping paths that do not exist.
///
/// Fails with `InvalidInput` when no page is left. Any other read or decode
/// failure aborts the whole load.
pub fn load_pages<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RgbImage>> {
    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Skipping missing page {}", path.display());
            continue;
        }
        pages.push(codec::open(path)?);
    }

    if pages.is_empty() {
        return Err(ScanError::invalid("none of the given pages exist"));
    }
    debug!(loaded = pages.len(), requested = paths.len(), "Pages loaded");
    Ok(pages)
}

/// Build a PDF from images and write it to `path`.
pub fn write_pdf(pages: &[RgbImage], title: &str, path: impl AsRef<Path>) -> Result<()> {
    let bytes = images_to_pdf(pages, title)?;
    std::fs::write(path.as_ref(), &bytes)?;
    info!(pages = pages.len(), "Wrote PDF to {}", path.as_ref().display());
    Ok(())
}
