//! Text acquisition: native PDF text layer with an OCR fallback.
//!
//! The text layer read is attempted first; only when it yields nothing is the
//! document written to a scoped temporary file and handed to the OCR engine.
//! The temporary file is removed on every exit path.

use crate::extraction::error::ExtractionError;
use crate::services::metrics::OCR_FALLBACKS_TOTAL;
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

/// Reads the structural text layer of a document, if it has one.
pub trait TextLayer: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, AppError>;
}

/// Optical recognition over a document file on disk.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, path: &Path, language: &str) -> Result<String, AppError>;
}

/// Native PDF text layer via `pdf-extract`.
#[derive(Default)]
pub struct PdfTextLayer;

impl PdfTextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl TextLayer for PdfTextLayer {
    fn extract(&self, bytes: &[u8]) -> Result<String, AppError> {
        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read PDF text layer: {}", e))
        })?;
        Ok(text)
    }
}

/// Tesseract-based OCR. The PDF is rasterized page by page with `pdftoppm`
/// into a temporary directory, then each page image is recognized with the
/// `tesseract` CLI in sparse-text segmentation mode.
pub struct TesseractOcr {
    timeout: Duration,
    psm: u32,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(timeout: Duration, psm: u32, dpi: u32) -> Self {
        Self { timeout, psm, dpi }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, path: &Path, language: &str) -> Result<String, AppError> {
        // Removed on drop, including the rendered page images.
        let raster_dir = tempfile::tempdir()?;
        let page_prefix = raster_dir.path().join("page");

        let pdf_arg = path
            .to_str()
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Non-UTF8 temp file path")))?;
        let prefix_arg = page_prefix
            .to_str()
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Non-UTF8 temp dir path")))?;

        let dpi = self.dpi.to_string();
        run_command(
            "pdftoppm",
            &["-r", &dpi, "-png", pdf_arg, prefix_arg],
            self.timeout,
        )
        .await?;

        let mut pages: Vec<PathBuf> = std::fs::read_dir(raster_dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        pages.sort();

        if pages.is_empty() {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "pdftoppm produced no page images"
            )));
        }

        let psm = self.psm.to_string();
        let mut recognized = String::new();
        for page in &pages {
            let page_arg = page.to_str().ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Non-UTF8 page image path"))
            })?;
            let output = run_command(
                "tesseract",
                &[page_arg, "stdout", "-l", language, "--psm", &psm],
                self.timeout,
            )
            .await?;
            recognized.push_str(&String::from_utf8_lossy(&output.stdout));
            recognized.push('\n');
        }

        Ok(recognized)
    }
}

/// Run an external tool with piped output and a hard timeout, mapping
/// non-zero exit and stderr into an error.
async fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<Output, AppError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    tracing::debug!(
        program = %program,
        args = ?args,
        timeout_secs = %timeout.as_secs(),
        "Executing command"
    );

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| {
            AppError::InternalError(anyhow::anyhow!(
                "{} timed out after {} seconds",
                program,
                timeout.as_secs()
            ))
        })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(program = %program, stderr = %stderr, "Command failed");
        return Err(AppError::InternalError(anyhow::anyhow!(
            "{} failed: {}",
            program,
            stderr
        )));
    }

    Ok(output)
}

/// Deletes the wrapped file when dropped, so the OCR temp copy is cleaned up
/// on success, recognition failure and panic alike.
struct TempFileGuard(PathBuf);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

/// Orchestrates the two text sources for one uploaded document.
pub struct TextAcquisition {
    text_layer: Arc<dyn TextLayer>,
    ocr: Arc<dyn OcrEngine>,
    language: String,
}

impl TextAcquisition {
    pub fn new(text_layer: Arc<dyn TextLayer>, ocr: Arc<dyn OcrEngine>, language: String) -> Self {
        Self {
            text_layer,
            ocr,
            language,
        }
    }

    /// Produce a plain-text representation of the document bytes.
    ///
    /// The OCR engine is never invoked for documents whose text layer is
    /// non-empty. A text-layer read error is treated the same as an empty
    /// layer: scanned bills routinely fail structural extraction.
    pub async fn extract_text(&self, bytes: &[u8]) -> Result<String, AppError> {
        let text = match self.text_layer.extract(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Text layer read failed, treating document as scanned");
                String::new()
            }
        };

        if !text.trim().is_empty() {
            return Ok(text);
        }

        tracing::info!("Document has no text layer, falling back to OCR");
        OCR_FALLBACKS_TOTAL.inc();

        let temp_path = std::env::temp_dir().join(format!("{}.pdf", Uuid::new_v4()));
        let _guard = TempFileGuard(temp_path.clone());
        tokio::fs::write(&temp_path, bytes).await?;

        let recognized = self.ocr.recognize(&temp_path, &self.language).await?;
        if recognized.trim().is_empty() {
            return Err(ExtractionError::NoUsableText.into());
        }

        Ok(recognized)
    }
}
