//! OCR and orientation correction.
//!
//! Tesseract is the default OCR backend. Any `OcrBackend` can be plugged into
//! the `OrientationResolver`, which runs OCR on all four 90° rotations of a
//! scanned page and keeps the best-scoring one.

mod backend;
mod model_utils;
mod orientation;
mod tesseract;

pub use backend::{OcrBackend, OcrConfig, OcrError, OcrResult};
pub use model_utils::check_binary;
pub use orientation::{
    select_best, Orientation, OrientationResolver, OrientationScorer, Rotation,
    TokenFrequencyScorer,
};
pub use tesseract::TesseractBackend;
