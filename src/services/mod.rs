//! Service layer: staging, ingestion, upload and search.
//!
//! This module contains domain logic separated from UI concerns.
//! Services report progress through events so the CLI can render it.

pub mod ingest;
pub mod search;
pub mod staging;
pub mod upload;

pub use ingest::{
    load_seed, BatchOutcome, BatchReport, ImageFailure, IngestEvent, IngestObserver,
    IngestOptions, IngestPipeline, IngestReport, NoopObserver, SkipReason,
};
pub use search::{find_offsets, search_documents, SearchEngine, SearchHit, SearchHitSummary};
pub use staging::{list_batches, StagedBatch, StagedImage};
pub use upload::{parse_fields, CommandUploader, NoUpload, UploadError, UploadFields, Uploader};
