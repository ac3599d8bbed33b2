//! scanarchive - scanned document archive.
//!
//! Ingests scanned pages from a staging area, corrects their orientation with
//! OCR, and keeps one metadata block per document in a flat archive file
//! that can be listed and searched.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod ocr;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{ArchiveError, Result};
