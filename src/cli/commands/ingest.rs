//! Ingest command.

use std::path::PathBuf;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use super::resolver_from_settings;
use crate::config::Settings;
use crate::services::{
    BatchOutcome, CommandUploader, IngestEvent, IngestOptions, IngestPipeline, NoUpload,
    Uploader,
};
use crate::storage::ArchiveLayout;

/// Ingest every staged batch.
pub async fn cmd_ingest(
    settings: &Settings,
    staging: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let staging_dir = staging.unwrap_or_else(|| settings.staging_dir.clone());
    let layout = ArchiveLayout::from_settings(settings);

    let resolver = resolver_from_settings(settings);
    if !dry_run && !resolver.backend().is_available() {
        println!(
            "{} OCR backend '{}' is not available",
            style("✗").red(),
            resolver.backend().name()
        );
        println!("  {}", style(resolver.backend().availability_hint()).dim());
        anyhow::bail!("OCR backend unavailable");
    }

    let uploader: Box<dyn Uploader> = match settings.upload {
        Some(ref upload) => Box::new(CommandUploader::from_config(upload)),
        None => Box::new(NoUpload),
    };

    println!(
        "{} {} batches in {}",
        style("→").cyan(),
        if dry_run { "Planning" } else { "Ingesting" },
        staging_dir.display()
    );

    let pipeline = IngestPipeline::new(layout, resolver, uploader).with_options(IngestOptions {
        remove_completed_batches: settings.remove_completed_batches,
        dry_run,
    });

    // Create event channel for progress tracking
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<IngestEvent>();

    // Spawn event handler for UI
    let event_handler = tokio::spawn(async move {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        while let Some(event) = event_rx.recv().await {
            match event {
                IngestEvent::BatchStarted { batch, images } => {
                    pb.suspend(|| {
                        println!(
                            "{} {} ({} images)",
                            style("→").cyan(),
                            style(&batch).bold(),
                            images
                        )
                    });
                }
                IngestEvent::BatchSkipped { batch, reason } => {
                    pb.suspend(|| {
                        println!(
                            "{} Skipped {}: {}",
                            style("!").yellow(),
                            style(&batch).bold(),
                            reason
                        )
                    });
                }
                IngestEvent::BatchPlanned { batch, images } => {
                    pb.suspend(|| {
                        println!(
                            "  {} {} would ingest {} images",
                            style("→").dim(),
                            style(&batch).bold(),
                            images
                        )
                    });
                }
                IngestEvent::ImageStarted { source, .. } => {
                    pb.set_message(format!("OCR {}", source.display()));
                }
                IngestEvent::ImageCompleted {
                    id,
                    image_file,
                    rotation,
                    ..
                } => {
                    pb.suspend(|| {
                        println!(
                            "  {} #{} {} (rotated {})",
                            style("✓").green(),
                            id,
                            image_file,
                            rotation
                        )
                    });
                }
                IngestEvent::ImageFailed {
                    source, id, error, ..
                } => {
                    let id = id.map(|id| format!("#{} ", id)).unwrap_or_default();
                    pb.suspend(|| {
                        eprintln!(
                            "  {} {}{} failed: {}",
                            style("✗").red(),
                            id,
                            source.display(),
                            error
                        )
                    });
                }
                IngestEvent::BatchCompleted {
                    batch,
                    succeeded,
                    failed,
                    removed,
                } => {
                    pb.suspend(|| {
                        if failed == 0 {
                            println!(
                                "  {} {}: {} archived{}",
                                style("✓").green(),
                                batch,
                                succeeded,
                                if removed { ", folder removed" } else { "" }
                            );
                        } else {
                            println!(
                                "  {} {}: {} archived, {} failed (folder kept)",
                                style("!").yellow(),
                                batch,
                                succeeded,
                                failed
                            );
                        }
                    });
                }
            }
        }
        pb.finish_and_clear();
    });

    let report = tokio::task::spawn_blocking(move || {
        let report = pipeline.run(&staging_dir, &event_tx);
        drop(event_tx);
        report
    })
    .await??;
    event_handler.await?;

    if dry_run {
        let planned: usize = report
            .batches
            .iter()
            .map(|b| match b.outcome {
                BatchOutcome::Planned { images } => images,
                _ => 0,
            })
            .sum();
        println!(
            "{} Dry run: {} images in {} batches, {} skipped",
            style("✓").green(),
            planned,
            report.batches.len() - report.skipped(),
            report.skipped()
        );
        return Ok(());
    }

    let archived = report.documents().count();
    let failures: Vec<_> = report.failures().collect();
    println!(
        "{} Ingested {} documents ({} batches skipped)",
        style("✓").green(),
        archived,
        report.skipped()
    );

    if !failures.is_empty() {
        println!(
            "\n{} {} images need manual remediation:",
            style("!").yellow(),
            failures.len()
        );
        for failure in &failures {
            let id = failure
                .id
                .map(|id| format!(" (id {} burned)", id))
                .unwrap_or_default();
            println!(
                "  {} {}{}: {}",
                style("✗").red(),
                failure.source.display(),
                id,
                failure.error
            );
        }
        anyhow::bail!("{} images failed to ingest", failures.len());
    }

    Ok(())
}
