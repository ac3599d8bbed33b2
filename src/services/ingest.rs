//! Ingestion pipeline.
//!
//! Walks the staging area batch by batch. Every image in a batch gets a fresh
//! identifier, is moved into the archive under its canonical name, has its
//! orientation corrected by OCR, is uploaded, and finally gets its metadata
//! block appended to the archive store. Separated from UI concerns: progress
//! is reported through an [`IngestObserver`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use super::staging::{list_batches, StagedBatch, StagedImage};
use super::upload::Uploader;
use crate::archive::{decode, encode, ArchiveStore, IdAllocator};
use crate::error::{ArchiveError, Result};
use crate::models::{Document, Field, Metadata};
use crate::ocr::{OrientationResolver, Rotation};
use crate::storage::{image_file_name, relocate, ArchiveLayout};

/// Why a batch was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The batch folder has no `*.txt` seed file.
    NoSeedFile,
    /// Every field of the seed record is empty.
    EmptySeed,
    /// The seed file could not be read, decoded, or re-encoded.
    UnreadableSeed(String),
    /// The batch folder itself could not be listed.
    UnreadableBatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSeedFile => write!(f, "no metadata seed file"),
            SkipReason::EmptySeed => write!(f, "metadata seed is empty"),
            SkipReason::UnreadableSeed(e) => write!(f, "unreadable metadata seed: {}", e),
            SkipReason::UnreadableBatch(e) => write!(f, "unreadable batch folder: {}", e),
        }
    }
}

/// Events emitted during ingestion.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    BatchStarted {
        batch: String,
        images: usize,
    },
    BatchSkipped {
        batch: String,
        reason: SkipReason,
    },
    /// Dry run: the batch would be ingested.
    BatchPlanned {
        batch: String,
        images: usize,
    },
    ImageStarted {
        batch: String,
        source: PathBuf,
    },
    ImageCompleted {
        batch: String,
        id: u64,
        image_file: String,
        rotation: Rotation,
    },
    ImageFailed {
        batch: String,
        source: PathBuf,
        id: Option<u64>,
        error: String,
    },
    BatchCompleted {
        batch: String,
        succeeded: usize,
        failed: usize,
        removed: bool,
    },
}

/// Receives ingestion progress.
pub trait IngestObserver: Send + Sync {
    fn on_event(&self, _event: IngestEvent) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IngestObserver for NoopObserver {}

impl IngestObserver for tokio::sync::mpsc::UnboundedSender<IngestEvent> {
    fn on_event(&self, event: IngestEvent) {
        let _ = self.send(event);
    }
}

/// A staged image that could not be archived.
#[derive(Debug)]
pub struct ImageFailure {
    pub source: PathBuf,
    /// The identifier consumed by the attempt. It is burned, never reissued.
    pub id: Option<u64>,
    pub error: ArchiveError,
}

#[derive(Debug)]
pub enum BatchOutcome {
    Skipped(SkipReason),
    /// Dry run: the batch would be ingested.
    Planned { images: usize },
    Ingested {
        documents: Vec<Document>,
        failures: Vec<ImageFailure>,
        /// Whether the batch folder was deleted afterwards.
        removed: bool,
    },
}

#[derive(Debug)]
pub struct BatchReport {
    pub dir: PathBuf,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn documents(&self) -> &[Document] {
        match &self.outcome {
            BatchOutcome::Ingested { documents, .. } => documents,
            _ => &[],
        }
    }

    pub fn failures(&self) -> &[ImageFailure] {
        match &self.outcome {
            BatchOutcome::Ingested { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// Result of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub batches: Vec<BatchReport>,
}

impl IngestReport {
    /// Documents created by this run, in identifier order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.batches.iter().flat_map(BatchReport::documents)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImageFailure> {
        self.batches.iter().flat_map(BatchReport::failures)
    }

    pub fn skipped(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b.outcome, BatchOutcome::Skipped(_)))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Ingestion options.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Delete a batch folder once every image in it was archived.
    pub remove_completed_batches: bool,
    /// Only report what would be ingested.
    pub dry_run: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            remove_completed_batches: true,
            dry_run: false,
        }
    }
}

/// Moves staged scans into the archive.
pub struct IngestPipeline {
    layout: ArchiveLayout,
    allocator: IdAllocator,
    store: ArchiveStore,
    resolver: OrientationResolver,
    uploader: Box<dyn Uploader>,
    options: IngestOptions,
}

impl IngestPipeline {
    pub fn new(
        layout: ArchiveLayout,
        resolver: OrientationResolver,
        uploader: Box<dyn Uploader>,
    ) -> Self {
        Self {
            allocator: IdAllocator::new(&layout.counter_path),
            store: ArchiveStore::new(&layout.archive_path),
            layout,
            resolver,
            uploader,
            options: IngestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Process every batch under `staging_dir` in name order.
    ///
    /// Fails up front if the counter or archive file is unusable. After that,
    /// per-image failures are recorded in the report and the run continues.
    pub fn run(&self, staging_dir: &Path, observer: &dyn IngestObserver) -> Result<IngestReport> {
        if !self.options.dry_run {
            self.preflight()?;
        }

        let mut report = IngestReport::default();
        for dir in list_batches(staging_dir)? {
            report.batches.push(self.ingest_batch(&dir, observer));
        }
        Ok(report)
    }

    fn preflight(&self) -> Result<()> {
        let next = self.allocator.peek()?;
        if !self.store.path().is_file() {
            return Err(ArchiveError::Configuration(format!(
                "archive file {} does not exist (run `scanarchive init`)",
                self.store.path().display()
            )));
        }
        self.layout.ensure_directories()?;
        tracing::debug!("next document id is {}", next);
        Ok(())
    }

    /// Ingest one batch folder. Problems with the batch as a whole are
    /// reported as a skip; per-image failures are collected in the report.
    pub fn ingest_batch(&self, dir: &Path, observer: &dyn IngestObserver) -> BatchReport {
        let skip = |name: String, reason: SkipReason| {
            tracing::warn!("skipping batch {}: {}", name, reason);
            observer.on_event(IngestEvent::BatchSkipped {
                batch: name,
                reason: reason.clone(),
            });
            BatchReport {
                dir: dir.to_path_buf(),
                outcome: BatchOutcome::Skipped(reason),
            }
        };

        let batch = match StagedBatch::scan(dir) {
            Ok(batch) => batch,
            Err(e) => {
                let name = StagedBatch::name_of(dir);
                return skip(name, SkipReason::UnreadableBatch(e.to_string()));
            }
        };
        let name = batch.name();

        let seed = match load_seed(&batch) {
            Ok(seed) => seed,
            Err(reason) => return skip(name, reason),
        };

        if self.options.dry_run {
            observer.on_event(IngestEvent::BatchPlanned {
                batch: name,
                images: batch.images.len(),
            });
            return BatchReport {
                dir: batch.dir,
                outcome: BatchOutcome::Planned {
                    images: batch.images.len(),
                },
            };
        }

        observer.on_event(IngestEvent::BatchStarted {
            batch: name.clone(),
            images: batch.images.len(),
        });

        let mut documents = Vec::new();
        let mut failures = Vec::new();

        for image in &batch.images {
            observer.on_event(IngestEvent::ImageStarted {
                batch: name.clone(),
                source: image.path.clone(),
            });

            let (id, result) = match self.allocator.next_id() {
                Ok(id) => (Some(id), self.archive_image(id, image, &seed)),
                Err(e) => (None, Err(e)),
            };

            match result {
                Ok((doc, rotation)) => {
                    observer.on_event(IngestEvent::ImageCompleted {
                        batch: name.clone(),
                        id: doc.id(),
                        image_file: doc.image_file().to_string(),
                        rotation,
                    });
                    documents.push(doc);
                }
                Err(error) => {
                    tracing::error!(
                        "failed to ingest {} (id {:?}): {}",
                        image.path.display(),
                        id,
                        error
                    );
                    observer.on_event(IngestEvent::ImageFailed {
                        batch: name.clone(),
                        source: image.path.clone(),
                        id,
                        error: error.to_string(),
                    });
                    failures.push(ImageFailure {
                        source: image.path.clone(),
                        id,
                        error,
                    });
                }
            }
        }

        let removed = failures.is_empty()
            && self.options.remove_completed_batches
            && match fs::remove_dir_all(&batch.dir) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("could not remove batch folder {}: {}", batch.dir.display(), e);
                    false
                }
            };

        observer.on_event(IngestEvent::BatchCompleted {
            batch: name,
            succeeded: documents.len(),
            failed: failures.len(),
            removed,
        });

        BatchReport {
            dir: batch.dir,
            outcome: BatchOutcome::Ingested {
                documents,
                failures,
                removed,
            },
        }
    }

    /// Allocate an identifier and archive one staged image.
    pub fn ingest_image(&self, image: &StagedImage, seed: &Metadata) -> Result<Document> {
        let id = self.allocator.next_id()?;
        self.archive_image(id, image, seed).map(|(doc, _)| doc)
    }

    fn archive_image(
        &self,
        id: u64,
        image: &StagedImage,
        seed: &Metadata,
    ) -> Result<(Document, Rotation)> {
        let image_file = image_file_name(id, &image.extension);
        let mut doc = Document::from_image_name(&image_file, &self.layout)?;

        relocate(&image.path, doc.image_path())?;

        let orientation = self.resolver.resolve(doc.image_path())?;
        if orientation.rotation != Rotation::Deg0 {
            write_image(&orientation.image, doc.image_path())?;
        }
        doc.set_text(orientation.text);
        doc.write_text()?;

        let uploaded = self.uploader.upload(doc.image_path())?;

        let mut metadata = seed.clone();
        metadata.merge(uploaded);
        metadata.set(Field::FileName, image_file.as_str());
        doc.metadata = metadata;

        self.store.append_if_absent(&doc.metadata)?;

        tracing::info!(
            "archived {} as {} (rotated {})",
            image.path.display(),
            image_file,
            orientation.rotation
        );
        Ok((doc, orientation.rotation))
    }
}

/// Read and validate a batch's seed record.
pub fn load_seed(batch: &StagedBatch) -> std::result::Result<Metadata, SkipReason> {
    let path = batch.seed_file.as_ref().ok_or(SkipReason::NoSeedFile)?;
    let raw = fs::read_to_string(path).map_err(|e| SkipReason::UnreadableSeed(e.to_string()))?;
    let seed = decode(&raw).map_err(|e| SkipReason::UnreadableSeed(e.to_string()))?;
    if seed.is_blank() {
        return Err(SkipReason::EmptySeed);
    }
    // Every record built from the seed must encode, or each image would burn
    // an identifier only to fail at append.
    encode(&seed).map_err(|e| SkipReason::UnreadableSeed(e.to_string()))?;
    Ok(seed)
}

/// Overwrite an archived image in its original encoding.
fn write_image(image: &DynamicImage, path: &Path) -> Result<()> {
    let bytes = fs::read(path)?;
    let format = image::guess_format(&bytes).map_err(std::io::Error::other)?;
    image
        .save_with_format(path, format)
        .map_err(std::io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn batch_with_seed(dir: &Path, seed: Option<&str>) -> StagedBatch {
        if let Some(contents) = seed {
            fs::write(dir.join("seed.txt"), contents).unwrap();
        }
        StagedBatch::scan(dir).unwrap()
    }

    #[test]
    fn test_load_seed() {
        let dir = tempdir().unwrap();
        let batch = batch_with_seed(dir.path(), Some("Title: [Letters]\nBox Number: [4]\n"));
        let seed = load_seed(&batch).unwrap();
        assert_eq!(seed.get(Field::Title), "Letters");
        assert_eq!(seed.get(Field::BoxNumber), "4");
    }

    #[test]
    fn test_load_seed_skip_reasons() {
        let missing = tempdir().unwrap();
        assert_eq!(
            load_seed(&batch_with_seed(missing.path(), None)),
            Err(SkipReason::NoSeedFile)
        );

        let blank = tempdir().unwrap();
        assert_eq!(
            load_seed(&batch_with_seed(blank.path(), Some("File Name: []\nTitle: []\n"))),
            Err(SkipReason::EmptySeed)
        );

        let garbled = tempdir().unwrap();
        assert!(matches!(
            load_seed(&batch_with_seed(garbled.path(), Some("just some notes"))),
            Err(SkipReason::UnreadableSeed(_))
        ));

        let unencodable = tempdir().unwrap();
        assert!(matches!(
            load_seed(&batch_with_seed(unencodable.path(), Some("Title: [a] b]\n"))),
            Err(SkipReason::UnreadableSeed(e)) if e.contains(']')
        ));
    }

    #[test]
    fn test_report_counts() {
        let report = IngestReport {
            batches: vec![
                BatchReport {
                    dir: PathBuf::from("a"),
                    outcome: BatchOutcome::Skipped(SkipReason::EmptySeed),
                },
                BatchReport {
                    dir: PathBuf::from("b"),
                    outcome: BatchOutcome::Ingested {
                        documents: Vec::new(),
                        failures: vec![ImageFailure {
                            source: PathBuf::from("b/1.png"),
                            id: Some(7),
                            error: ArchiveError::NotFound(PathBuf::from("b/1.png")),
                        }],
                        removed: false,
                    },
                },
            ],
        };
        assert_eq!(report.skipped(), 1);
        assert!(report.has_failures());
        assert_eq!(report.documents().count(), 0);
    }
}
