//! Document listing and display commands.

use console::style;

use crate::archive::ArchiveStore;
use crate::config::Settings;
use crate::models::{Document, DocumentSummary};
use crate::storage::ArchiveLayout;

async fn read_documents(settings: &Settings) -> anyhow::Result<Vec<Document>> {
    let layout = ArchiveLayout::from_settings(settings);
    let store = ArchiveStore::new(&layout.archive_path);
    let documents = tokio::task::spawn_blocking(move || store.read_documents(&layout)).await??;
    Ok(documents)
}

/// List archived documents in archive order.
pub async fn cmd_list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let documents = read_documents(settings).await?;

    if json {
        let summaries: Vec<DocumentSummary> = documents.iter().map(Document::summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("{} No documents archived yet", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("Archived Documents").bold());
    println!("{}", "-".repeat(60));
    println!("{:<8} {:<28} Title", "ID", "File");
    println!("{}", "-".repeat(60));
    for doc in &documents {
        println!("{:<8} {:<28} {}", doc.id(), doc.image_file(), doc.title());
    }
    println!("\n{} documents", documents.len());

    Ok(())
}

/// Print one document's metadata and text.
pub async fn cmd_show(settings: &Settings, id: u64) -> anyhow::Result<()> {
    let documents = read_documents(settings).await?;
    let Some(doc) = documents.into_iter().find(|d| d.id() == id) else {
        anyhow::bail!("document {} not found", id);
    };

    println!("\n{}", style(format!("Document #{}", doc.id())).bold());
    for (label, value) in doc.metadata_as_ordered_pairs() {
        println!("  {}: {}", style(label).dim(), value);
    }

    let presence = |exists: bool| {
        if exists {
            style("present").green()
        } else {
            style("missing").red()
        }
    };
    println!(
        "\n  {} {} ({})",
        style("Image:").dim(),
        doc.image_path().display(),
        presence(doc.has_image_file())
    );
    println!(
        "  {} {} ({})",
        style("Text:").dim(),
        doc.text_path().display(),
        presence(doc.has_text_file())
    );

    println!("\n{}", style("Extracted Text").bold());
    if doc.text().trim().is_empty() {
        println!("  {}", style("(empty)").dim());
    } else {
        println!("{}", doc.text().trim_end());
    }

    Ok(())
}
