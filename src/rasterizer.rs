//! # PDF Rasterizer
//!
//! Turns PDF bytes into page images using the poppler command line tools:
//! `pdfinfo` to count pages and `pdftocairo` to render them as PNG. All
//! intermediate files live in a temporary directory that is removed when
//! the call returns, whichever way it returns.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::RasterizerConfig;
use crate::errors::error_logging::log_conversion_error;
use crate::errors::{AppError, AppResult};
use crate::models::PageImage;

/// Readers accept the header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";
const PAGE_FILE_PREFIX: &str = "page";

/// Adapter around the external PDF-to-image converter
#[derive(Debug, Clone, Default)]
pub struct PdfRasterizer {
    config: RasterizerConfig,
}

impl PdfRasterizer {
    pub fn new(config: RasterizerConfig) -> Self {
        Self { config }
    }

    /// Reject uploads that are too large or are not PDFs at all.
    pub fn validate_document(&self, pdf_bytes: &[u8]) -> AppResult<()> {
        if pdf_bytes.is_empty() {
            return Err(AppError::Validation("PDF document is empty".to_string()));
        }
        if pdf_bytes.len() > self.config.max_document_bytes {
            return Err(AppError::Validation(format!(
                "PDF document is {} bytes, the limit is {}",
                pdf_bytes.len(),
                self.config.max_document_bytes
            )));
        }
        let head = &pdf_bytes[..pdf_bytes.len().min(HEADER_SEARCH_WINDOW)];
        if !head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
            return Err(AppError::Validation(
                "Document does not look like a PDF (missing %PDF- header)".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of pages in the document, as reported by `pdfinfo`.
    pub fn page_count(&self, pdf_bytes: &[u8]) -> AppResult<u32> {
        self.validate_document(pdf_bytes)?;
        let workspace = tempfile::tempdir()
            .map_err(|e| AppError::Internal(format!("Failed to create temp directory: {e}")))?;
        let pdf_path = write_document(workspace.path(), pdf_bytes)?;
        self.page_count_at(&pdf_path, pdf_bytes.len())
    }

    /// Render every page at the configured resolution, in page order.
    ///
    /// # Errors
    ///
    /// - `Validation` for oversized or non-PDF input
    /// - `PageCountUnavailable` when `pdfinfo` fails or reports no page count
    /// - `ConversionFailed` when rendering fails or does not yield exactly
    ///   pages 1 to N, N being the `pdfinfo` page count
    pub fn rasterize(&self, pdf_bytes: &[u8]) -> AppResult<Vec<PageImage>> {
        let start_time = std::time::Instant::now();
        self.validate_document(pdf_bytes)?;

        let workspace = tempfile::tempdir()
            .map_err(|e| AppError::Internal(format!("Failed to create temp directory: {e}")))?;
        let pdf_path = write_document(workspace.path(), pdf_bytes)?;

        let expected_pages = self.page_count_at(&pdf_path, pdf_bytes.len())?;
        if expected_pages == 0 {
            let err = AppError::ConversionFailed("PDF document has no pages".to_string());
            log_conversion_error(&err, "rasterize", Some(pdf_bytes.len()), None);
            return Err(err);
        }

        let output_root = workspace.path().join(PAGE_FILE_PREFIX);
        let output = Command::new(&self.config.pdftocairo_cmd)
            .arg("-png")
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg(&pdf_path)
            .arg(&output_root)
            .output()
            .map_err(|e| {
                let err = AppError::ConversionFailed(format!(
                    "Failed to run '{}' (is poppler installed?): {e}",
                    self.config.pdftocairo_cmd
                ));
                log_conversion_error(&err, "rasterize", Some(pdf_bytes.len()), Some(self.config.pdftocairo_cmd.as_str()));
                err
            })?;

        if !output.status.success() {
            let err = AppError::ConversionFailed(format!(
                "pdftocairo failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
            log_conversion_error(&err, "rasterize", Some(pdf_bytes.len()), Some(self.config.pdftocairo_cmd.as_str()));
            return Err(err);
        }

        let page_files = collect_page_files(workspace.path())?;
        let rendered: Vec<u32> = page_files.iter().map(|(number, _)| *number).collect();
        // Page numbers are positional downstream, so a gap would shift every later page
        if !rendered.iter().copied().eq(1..=expected_pages) {
            let err = AppError::ConversionFailed(format!(
                "pdftocairo rendered pages {:?}, expected 1 to {}",
                rendered, expected_pages
            ));
            log_conversion_error(&err, "rasterize", Some(pdf_bytes.len()), Some(self.config.pdftocairo_cmd.as_str()));
            return Err(err);
        }

        let mut pages = Vec::with_capacity(page_files.len());
        for (page_number, path) in &page_files {
            let image = image::open(path).map_err(|e| {
                AppError::ConversionFailed(format!("Failed to decode rendered page {page_number}: {e}"))
            })?;
            debug!(
                "Loaded rendered page {}: {}x{}",
                page_number,
                image.width(),
                image.height()
            );
            pages.push(PageImage::from_dynamic(image));
        }

        info!(
            "Rasterized {} page(s) at {} DPI in {}ms",
            pages.len(),
            self.config.dpi,
            start_time.elapsed().as_millis()
        );

        Ok(pages)
    }

    fn page_count_at(&self, pdf_path: &Path, document_size: usize) -> AppResult<u32> {
        let output = Command::new(&self.config.pdfinfo_cmd)
            .arg(pdf_path)
            .output()
            .map_err(|e| {
                AppError::PageCountUnavailable(format!(
                    "Failed to run '{}' (is poppler installed?): {e}",
                    self.config.pdfinfo_cmd
                ))
            });

        let result = output.and_then(|output| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            parse_page_count(&stdout).ok_or_else(|| {
                AppError::PageCountUnavailable(format!(
                    "pdfinfo ({}) reported no page count: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ))
            })
        });

        if let Err(err) = &result {
            log_conversion_error(err, "page_count", Some(document_size), Some(self.config.pdfinfo_cmd.as_str()));
        }
        result
    }
}

/// Extract the `Pages:` value from `pdfinfo` output.
pub fn parse_page_count(pdfinfo_output: &str) -> Option<u32> {
    pdfinfo_output.lines().find_map(|line| {
        let value = line.strip_prefix("Pages:")?;
        value.trim().parse().ok()
    })
}

/// Page number encoded in a `pdftocairo` output name such as `page-07.png`.
fn page_file_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let number = stem.strip_prefix(PAGE_FILE_PREFIX)?.strip_prefix('-')?;
    number.parse().ok()
}

/// Rendered page files in page order.
fn collect_page_files(dir: &Path) -> AppResult<Vec<(u32, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::ConversionFailed(format!("Failed to list rendered pages: {e}")))?;

    let mut pages: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter_map(|path| page_file_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

fn write_document(dir: &Path, pdf_bytes: &[u8]) -> AppResult<PathBuf> {
    let path = dir.join("document.pdf");
    std::fs::write(&path, pdf_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to write PDF to temp directory: {e}")))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_document() {
        let rasterizer = PdfRasterizer::default();
        assert!(rasterizer.validate_document(b"%PDF-1.7\n...").is_ok());
        // Leading junk before the header is tolerated
        assert!(rasterizer.validate_document(b"\x00\x00junk%PDF-1.4").is_ok());

        assert!(matches!(
            rasterizer.validate_document(b""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            rasterizer.validate_document(b"PK\x03\x04 not a pdf"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_document_is_rejected() {
        let rasterizer = PdfRasterizer::new(RasterizerConfig {
            max_document_bytes: 16,
            ..RasterizerConfig::default()
        });
        let err = rasterizer.validate_document(&[b'%'; 17]).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn test_parse_page_count() {
        let output = "Producer:       LibreOffice\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(output), Some(12));
        assert_eq!(parse_page_count("Syntax Error: Couldn't read xref table"), None);
    }

    #[test]
    fn test_page_file_number() {
        assert_eq!(page_file_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_file_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_file_number(Path::new("/tmp/x/document.pdf")), None);
        assert_eq!(page_file_number(Path::new("/tmp/x/page-a.png")), None);
    }

    #[test]
    fn test_collect_page_files_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "document.pdf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = collect_page_files(dir.path()).unwrap();
        let numbers: Vec<u32> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    /// Executable shell script standing in for a poppler tool
    #[cfg(unix)]
    fn write_stub(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Rasterizer whose `pdfinfo` reports `pages` and whose `pdftocairo`
    /// copies every PNG of `fixtures` next to the requested output root,
    /// recording that root in `fixtures/output_root`.
    #[cfg(unix)]
    fn stub_rasterizer(bin: &Path, fixtures: &Path, pages: u32) -> PdfRasterizer {
        let pdfinfo = write_stub(bin, "pdfinfo", &format!("echo 'Producer:       scanner'\necho 'Pages:          {pages}'"));
        let pdftocairo = write_stub(
            bin,
            "pdftocairo",
            &format!(
                "cp {dir}/*.png \"$(dirname \"$5\")/\"\necho \"$5\" > {dir}/output_root",
                dir = fixtures.display()
            ),
        );
        PdfRasterizer::new(RasterizerConfig {
            pdfinfo_cmd: pdfinfo,
            pdftocairo_cmd: pdftocairo,
            ..RasterizerConfig::default()
        })
    }

    #[cfg(unix)]
    fn gray_page(width: u32) -> image::GrayImage {
        image::GrayImage::from_pixel(width, 4, image::Luma([200]))
    }

    #[cfg(unix)]
    #[test]
    fn test_rasterize_loads_pages_in_order() {
        let bin = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        gray_page(11).save(fixtures.path().join("page-01.png")).unwrap();
        image::RgbImage::from_pixel(22, 4, image::Rgb([10, 20, 30]))
            .save(fixtures.path().join("page-02.png"))
            .unwrap();
        gray_page(33).save(fixtures.path().join("page-03.png")).unwrap();
        let rasterizer = stub_rasterizer(bin.path(), fixtures.path(), 3);

        let pages = rasterizer.rasterize(b"%PDF-1.4\n%%EOF").unwrap();

        let widths: Vec<u32> = pages.iter().map(|p| p.width()).collect();
        let channels: Vec<u8> = pages.iter().map(|p| p.channels()).collect();
        assert_eq!(widths, vec![11, 22, 33]);
        assert_eq!(channels, vec![1, 3, 1]);

        // The render workspace is gone once rasterize returns
        let output_root = std::fs::read_to_string(fixtures.path().join("output_root")).unwrap();
        let workspace = Path::new(output_root.trim()).parent().unwrap();
        assert!(!workspace.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_rasterize_rejects_missing_page() {
        let bin = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        gray_page(11).save(fixtures.path().join("page-1.png")).unwrap();
        gray_page(33).save(fixtures.path().join("page-3.png")).unwrap();
        let rasterizer = stub_rasterizer(bin.path(), fixtures.path(), 3);

        let err = rasterizer.rasterize(b"%PDF-1.4\n%%EOF").unwrap_err();

        match err {
            AppError::ConversionFailed(message) => assert!(message.contains("[1, 3]")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_rasterize_rejects_extra_page() {
        let bin = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        gray_page(11).save(fixtures.path().join("page-1.png")).unwrap();
        gray_page(22).save(fixtures.path().join("page-2.png")).unwrap();
        let rasterizer = stub_rasterizer(bin.path(), fixtures.path(), 1);

        let err = rasterizer.rasterize(b"%PDF-1.4\n%%EOF").unwrap_err();
        assert!(matches!(err, AppError::ConversionFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_pdftocairo_is_conversion_failure() {
        let bin = tempfile::tempdir().unwrap();
        let rasterizer = PdfRasterizer::new(RasterizerConfig {
            pdfinfo_cmd: write_stub(bin.path(), "pdfinfo", "echo 'Pages: 2'"),
            pdftocairo_cmd: write_stub(bin.path(), "pdftocairo", "echo 'Syntax Error' >&2\nexit 1"),
            ..RasterizerConfig::default()
        });

        let err = rasterizer.rasterize(b"%PDF-1.4\n%%EOF").unwrap_err();

        match err {
            AppError::ConversionFailed(message) => assert!(message.contains("Syntax Error")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_page_count() {
        let bin = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        let rasterizer = stub_rasterizer(bin.path(), fixtures.path(), 7);
        assert_eq!(rasterizer.page_count(b"%PDF-1.7\n%%EOF").unwrap(), 7);

        let silent = PdfRasterizer::new(RasterizerConfig {
            pdfinfo_cmd: write_stub(bin.path(), "pdfinfo-silent", "exit 1"),
            ..RasterizerConfig::default()
        });
        assert!(matches!(
            silent.page_count(b"%PDF-1.7\n%%EOF"),
            Err(AppError::PageCountUnavailable(_))
        ));
        assert!(matches!(silent.page_count(b"not a pdf"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_missing_pdfinfo_is_page_count_unavailable() {
        let rasterizer = PdfRasterizer::new(RasterizerConfig {
            pdfinfo_cmd: "/nonexistent/bin/pdfinfo-for-tests".to_string(),
            ..RasterizerConfig::default()
        });
        let err = rasterizer.rasterize(b"%PDF-1.4\n%%EOF").unwrap_err();
        assert!(matches!(err, AppError::PageCountUnavailable(_)));
    }
}
