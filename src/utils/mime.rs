//! Content-based image type detection.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An image format recognized from a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageType {
    pub mime: &'static str,
    pub extension: &'static str,
}

/// Detect an image type from file content. Returns `None` for unreadable,
/// empty, or non-image files.
pub fn detect_image_type(path: &Path) -> Option<ImageType> {
    // Read first 8KB for magic byte detection
    let mut file = File::open(path).ok()?;
    let mut buffer = [0u8; 8192];
    let bytes_read = file.read(&mut buffer).ok()?;

    if bytes_read == 0 {
        return None;
    }

    let detected = infer::get(&buffer[..bytes_read])?;
    if detected.matcher_type() != infer::MatcherType::Image {
        return None;
    }

    Some(ImageType {
        mime: detected.mime_type(),
        extension: detected.extension(),
    })
}
