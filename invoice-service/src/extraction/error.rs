use service_core::error::AppError;
use thiserror::Error;

/// Failures raised by the extraction pipeline. Both reject the document:
/// nothing is persisted for an upload that produces one of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// Neither the native text layer nor OCR produced usable text.
    #[error("document produced no readable text")]
    NoUsableText,

    /// A mandatory field's pattern did not match the document text. The
    /// field name is surfaced to diagnose layout mismatches.
    #[error("required field '{0}' not found in document")]
    FieldNotFound(&'static str),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        AppError::BadRequest(anyhow::anyhow!(err))
    }
}
