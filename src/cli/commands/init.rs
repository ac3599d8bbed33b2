//! Initialize command.

use console::style;

use crate::archive::{ArchiveStore, IdAllocator};
use crate::config::Settings;
use crate::storage::ArchiveLayout;

/// Create the data, image, text and staging directories, the counter and
/// the metadata file.
pub async fn cmd_init(settings: &Settings, start: u64) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let layout = ArchiveLayout::from_settings(settings);

    let (allocator, created) = IdAllocator::init(&layout.counter_path, start)?;
    if created {
        println!(
            "  {} Created counter {} (next id {})",
            style("✓").green(),
            allocator.path().display(),
            start
        );
    } else {
        println!(
            "  {} Counter {} already exists (next id {})",
            style("!").yellow(),
            allocator.path().display(),
            allocator.peek()?
        );
    }

    let (store, created) = ArchiveStore::init(&layout.archive_path)?;
    if created {
        println!(
            "  {} Created archive {}",
            style("✓").green(),
            store.path().display()
        );
    } else {
        println!(
            "  {} Archive {} already exists",
            style("!").yellow(),
            store.path().display()
        );
    }

    println!(
        "{} Initialized scanarchive in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!(
        "  Stage batches under {}",
        style(settings.staging_dir.display()).cyan()
    );

    Ok(())
}
