//! Orientation preview command.

use std::path::Path;

use console::style;

use super::resolver_from_settings;
use crate::config::Settings;
use crate::ocr::Rotation;

/// Run OCR on all four rotations of an image and report the scores.
pub async fn cmd_orient(settings: &Settings, image: &Path) -> anyhow::Result<()> {
    let resolver = resolver_from_settings(settings);
    if !resolver.backend().is_available() {
        println!(
            "{} OCR backend '{}' is not available",
            style("✗").red(),
            resolver.backend().name()
        );
        println!("  {}", style(resolver.backend().availability_hint()).dim());
        anyhow::bail!("OCR backend unavailable");
    }

    let path = image.to_path_buf();
    let orientation = tokio::task::spawn_blocking(move || resolver.resolve(&path)).await??;

    println!("\n{}", style(image.display()).bold());
    for (rotation, score) in Rotation::ALL.iter().zip(orientation.scores) {
        let marker = if *rotation == orientation.rotation {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!("  {} {:>4}  score {}", marker, rotation.to_string(), score);
    }
    println!(
        "{} Best orientation: {} ({} characters of text)",
        style("→").cyan(),
        orientation.rotation,
        orientation.text.chars().count()
    );

    Ok(())
}
