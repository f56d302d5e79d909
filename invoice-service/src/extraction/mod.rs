//! Document → structured record pipeline.
//!
//! Stages run in order per upload: text acquisition (native layer, OCR
//! fallback), field extraction over the known CEMIG layout, assembly into
//! the invoice aggregate. The classifier is a standalone triage utility.

pub mod assembler;
pub mod classifier;
pub mod error;
pub mod fields;
pub mod text;

pub use assembler::{assemble, InvoiceAggregate};
pub use classifier::{classify, UNKNOWN_CATEGORY};
pub use error::ExtractionError;
pub use fields::{extract, EnergyReading, RawFields};
pub use text::{OcrEngine, PdfTextLayer, TesseractOcr, TextAcquisition, TextLayer};
