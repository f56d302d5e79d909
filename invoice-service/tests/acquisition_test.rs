//! Text acquisition behavior with mocked text sources: OCR is only reached
//! when the text layer is empty, and the temp copy never survives the call.

use async_trait::async_trait;
use invoice_service::extraction::{OcrEngine, TextAcquisition, TextLayer};
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FixedTextLayer {
    text: &'static str,
}

impl TextLayer for FixedTextLayer {
    fn extract(&self, _bytes: &[u8]) -> Result<String, AppError> {
        Ok(self.text.to_string())
    }
}

struct FailingTextLayer;

impl TextLayer for FailingTextLayer {
    fn extract(&self, _bytes: &[u8]) -> Result<String, AppError> {
        Err(AppError::BadRequest(anyhow::anyhow!("corrupt text layer")))
    }
}

/// Records every invocation: how often it ran, which path it was given and
/// whether that path existed while the engine was running.
struct RecordingOcr {
    calls: AtomicUsize,
    seen: Mutex<Option<(PathBuf, bool)>>,
    response: Result<&'static str, ()>,
}

impl RecordingOcr {
    fn returning(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(None),
            response: Ok(text),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(None),
            response: Err(()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn seen_path(&self) -> Option<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrEngine for RecordingOcr {
    async fn recognize(&self, path: &Path, _language: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock().unwrap() = Some((path.to_path_buf(), path.exists()));
        match self.response {
            Ok(text) => Ok(text.to_string()),
            Err(()) => Err(AppError::InternalError(anyhow::anyhow!(
                "recognition failed"
            ))),
        }
    }
}

fn acquisition(layer_text: &'static str, ocr: Arc<RecordingOcr>) -> TextAcquisition {
    TextAcquisition::new(
        Arc::new(FixedTextLayer { text: layer_text }),
        ocr,
        "por".to_string(),
    )
}

#[tokio::test]
async fn text_layer_present_never_invokes_ocr() {
    let ocr = RecordingOcr::returning("não deveria ser usado");
    let acquisition = acquisition("Fatura CEMIG texto nativo", ocr.clone());

    let text = acquisition.extract_text(b"%PDF-1.4").await.unwrap();

    assert_eq!(text, "Fatura CEMIG texto nativo");
    assert_eq!(ocr.call_count(), 0);
}

#[tokio::test]
async fn whitespace_only_layer_falls_back_to_ocr_exactly_once() {
    let ocr = RecordingOcr::returning("texto reconhecido");
    let acquisition = acquisition("  \n\t ", ocr.clone());

    let text = acquisition.extract_text(b"%PDF-1.4").await.unwrap();

    assert_eq!(text, "texto reconhecido");
    assert_eq!(ocr.call_count(), 1);

    let (path, existed_during_call) = ocr.seen_path().expect("OCR saw no path");
    assert!(existed_during_call, "temp file was not written before OCR");
    assert!(!path.exists(), "temp file survived a successful OCR pass");
}

#[tokio::test]
async fn temp_file_is_deleted_when_ocr_fails() {
    let ocr = RecordingOcr::failing();
    let acquisition = acquisition("", ocr.clone());

    let result = acquisition.extract_text(b"%PDF-1.4").await;

    assert!(result.is_err());
    assert_eq!(ocr.call_count(), 1);

    let (path, existed_during_call) = ocr.seen_path().expect("OCR saw no path");
    assert!(existed_during_call);
    assert!(!path.exists(), "temp file survived a failed OCR pass");
}

#[tokio::test]
async fn empty_ocr_output_is_an_acquisition_error() {
    let ocr = RecordingOcr::returning("   ");
    let acquisition = acquisition("", ocr.clone());

    let err = acquisition.extract_text(b"%PDF-1.4").await.unwrap_err();

    assert!(err.to_string().contains("no readable text"));

    let (path, _) = ocr.seen_path().expect("OCR saw no path");
    assert!(!path.exists());
}

#[tokio::test]
async fn text_layer_error_is_treated_as_scanned_document() {
    let ocr = RecordingOcr::returning("texto reconhecido");
    let acquisition = TextAcquisition::new(Arc::new(FailingTextLayer), ocr.clone(), "por".into());

    let text = acquisition.extract_text(b"not a pdf").await.unwrap();

    assert_eq!(text, "texto reconhecido");
    assert_eq!(ocr.call_count(), 1);
}
