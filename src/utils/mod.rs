//! Shared utility functions.
//!
//! - `mime`: content-based image type detection

mod mime;

pub use mime::{detect_image_type, ImageType};
