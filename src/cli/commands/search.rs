//! Search command.

use console::style;

use crate::archive::ArchiveStore;
use crate::config::Settings;
use crate::services::{SearchEngine, SearchHitSummary};
use crate::storage::ArchiveLayout;

/// Case-insensitive search over metadata and extracted text.
pub async fn cmd_search(settings: &Settings, term: &str, json: bool) -> anyhow::Result<()> {
    let layout = ArchiveLayout::from_settings(settings);
    let store = ArchiveStore::new(&layout.archive_path);

    let term_owned = term.to_string();
    let hits = tokio::task::spawn_blocking(move || {
        SearchEngine::new(&store, &layout).search(&term_owned)
    })
    .await??;

    if json {
        let summaries: Vec<SearchHitSummary> = hits.iter().map(|h| h.summary()).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("{} No search matches found.", style("!").yellow());
        return Ok(());
    }

    println!(
        "{} {} documents match '{}'",
        style("✓").green(),
        hits.len(),
        term
    );
    for hit in &hits {
        let doc = &hit.document;
        println!(
            "\n{} {}",
            style(format!("#{}", doc.id())).bold(),
            style(doc.image_file()).cyan()
        );
        if !doc.title().is_empty() {
            println!("  {}", doc.title());
        }
        if !hit.meta_matches.is_empty() {
            println!(
                "  {} metadata: {}",
                style("→").dim(),
                hit.meta_matches.join(", ")
            );
        }
        if !hit.text_matches.is_empty() {
            println!(
                "  {} text: {} matches at {:?}",
                style("→").dim(),
                hit.text_matches.len(),
                hit.text_matches
            );
        }
    }

    Ok(())
}
