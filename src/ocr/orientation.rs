//! Orientation correction for scanned pages.
//!
//! A page may arrive in any of the four cardinal orientations, and OCR on a
//! sideways or upside-down page produces noise. The resolver runs OCR on all
//! four 90° rotations and keeps the one whose text scores highest. The
//! default score is the number of case-insensitive occurrences of "the",
//! which works for English-language material and will misjudge sparse or
//! non-English pages. Ties go to the earliest rotation evaluated.

use std::path::Path;

use image::{DynamicImage, ImageReader};
use serde::Serialize;

use super::backend::{OcrBackend, OcrError};

/// Counter-clockwise rotation applied to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotations in evaluation order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Apply this rotation (counter-clockwise) to an image.
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            Rotation::Deg0 => image.clone(),
            Rotation::Deg90 => image.rotate270(),
            Rotation::Deg180 => image.rotate180(),
            Rotation::Deg270 => image.rotate90(),
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Scores OCR output; higher means more likely correctly oriented.
pub trait OrientationScorer: Send + Sync {
    fn score(&self, text: &str) -> usize;
}

/// Counts case-insensitive, non-overlapping occurrences of a token.
#[derive(Debug, Clone)]
pub struct TokenFrequencyScorer {
    token: String,
}

impl TokenFrequencyScorer {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_lowercase(),
        }
    }
}

impl Default for TokenFrequencyScorer {
    fn default() -> Self {
        Self::new("the")
    }
}

impl OrientationScorer for TokenFrequencyScorer {
    fn score(&self, text: &str) -> usize {
        if self.token.is_empty() {
            return 0;
        }
        text.to_lowercase().matches(self.token.as_str()).count()
    }
}

/// Index of the first maximum score, if any.
pub fn select_best(scores: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// The winning orientation of a page.
#[derive(Debug, Clone)]
pub struct Orientation {
    pub rotation: Rotation,
    /// The source image with `rotation` applied.
    pub image: DynamicImage,
    /// OCR text of the rotated image.
    pub text: String,
    /// Scores for every rotation, in [`Rotation::ALL`] order.
    pub scores: [usize; 4],
}

/// Picks the best of four rotations of a scanned page.
pub struct OrientationResolver {
    backend: Box<dyn OcrBackend>,
    scorer: Box<dyn OrientationScorer>,
}

impl OrientationResolver {
    /// Resolver with the default "the"-frequency scorer.
    pub fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self {
            backend,
            scorer: Box::new(TokenFrequencyScorer::default()),
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn OrientationScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Load an image file and resolve its orientation. The decoder is picked
    /// from the file's content, not its extension.
    pub fn resolve(&self, image_path: &Path) -> Result<Orientation, OcrError> {
        let image = ImageReader::open(image_path)?
            .with_guessed_format()?
            .decode()?;
        tracing::debug!(
            "resolving orientation of {} ({}x{})",
            image_path.display(),
            image.width(),
            image.height()
        );
        self.resolve_image(&image)
    }

    /// Run OCR on every rotation of `image` and keep the best.
    pub fn resolve_image(&self, image: &DynamicImage) -> Result<Orientation, OcrError> {
        let scratch = tempfile::tempdir()?;
        let mut candidates = Vec::with_capacity(Rotation::ALL.len());

        for rotation in Rotation::ALL {
            let rotated = rotation.apply(image);
            let scratch_path = scratch
                .path()
                .join(format!("rotation-{}.png", rotation.degrees()));
            rotated.save(&scratch_path)?;

            let result = self.backend.ocr_image(&scratch_path)?;
            let score = self.scorer.score(&result.text);
            tracing::debug!(
                "{} at {}: score {} ({} ms)",
                result.backend,
                rotation,
                score,
                result.processing_time_ms
            );
            candidates.push((rotation, rotated, result.text, score));
        }

        let mut scores = [0usize; 4];
        for (slot, candidate) in scores.iter_mut().zip(&candidates) {
            *slot = candidate.3;
        }

        let best = select_best(&scores).unwrap_or(0);
        let (rotation, image, text, _) = candidates.swap_remove(best);

        Ok(Orientation {
            rotation,
            image,
            text,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrResult;
    use image::RgbImage;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns canned OCR text in call order.
    struct ScriptedOcr {
        outputs: Mutex<VecDeque<String>>,
    }

    impl ScriptedOcr {
        fn new(outputs: &[&str]) -> Self {
            Self {
                outputs: Mutex::new(outputs.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    impl OcrBackend for ScriptedOcr {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
            image::open(image_path)?;
            let text = self
                .outputs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| OcrError::OcrFailed("script exhausted".to_string()))?;
            Ok(OcrResult {
                text,
                backend: "scripted",
                processing_time_ms: 0,
            })
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(4, 2))
    }

    fn repeat_the(n: usize) -> String {
        vec!["the"; n].join(" ")
    }

    #[test]
    fn test_scorer_counts_case_insensitive_substrings() {
        let scorer = TokenFrequencyScorer::default();
        assert_eq!(scorer.score("The cat and THE dog"), 2);
        assert_eq!(scorer.score("other theories"), 2);
        assert_eq!(scorer.score("xz qv"), 0);
        assert_eq!(TokenFrequencyScorer::new("").score("the"), 0);
    }

    #[test]
    fn test_select_best_first_maximum() {
        assert_eq!(select_best(&[1, 5, 2, 0]), Some(1));
        assert_eq!(select_best(&[3, 3, 1, 0]), Some(0));
        assert_eq!(select_best(&[0, 0, 0, 0]), Some(0));
        assert_eq!(select_best(&[0, 1, 1, 1]), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_resolver_picks_highest_score() {
        let outputs = [repeat_the(1), repeat_the(5), repeat_the(2), String::new()];
        let refs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        let resolver = OrientationResolver::new(Box::new(ScriptedOcr::new(&refs)));

        let result = resolver.resolve_image(&page()).unwrap();
        assert_eq!(result.rotation, Rotation::Deg90);
        assert_eq!(result.scores, [1, 5, 2, 0]);
        assert_eq!(result.text, repeat_the(5));
        assert_eq!((result.image.width(), result.image.height()), (2, 4));
    }

    #[test]
    fn test_resolver_tie_keeps_earliest_rotation() {
        let outputs = [repeat_the(3), repeat_the(3), repeat_the(1), String::new()];
        let refs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        let resolver = OrientationResolver::new(Box::new(ScriptedOcr::new(&refs)));

        let result = resolver.resolve_image(&page()).unwrap();
        assert_eq!(result.rotation, Rotation::Deg0);
        assert_eq!((result.image.width(), result.image.height()), (4, 2));
    }

    #[test]
    fn test_resolver_ocrs_all_four_rotations() {
        let short = OrientationResolver::new(Box::new(ScriptedOcr::new(&["", "", ""])));
        assert!(short.resolve_image(&page()).is_err());

        let exact = OrientationResolver::new(Box::new(ScriptedOcr::new(&["", "", "", ""])));
        assert!(exact.resolve_image(&page()).is_ok());
    }

    #[test]
    fn test_rotation_apply_dimensions() {
        let img = page();
        let dims: Vec<(u32, u32)> = Rotation::ALL
            .iter()
            .map(|r| {
                let out = r.apply(&img);
                (out.width(), out.height())
            })
            .collect();
        assert_eq!(dims, vec![(4, 2), (2, 4), (4, 2), (2, 4)]);
    }

    #[test]
    fn test_custom_scorer() {
        struct LengthScorer;
        impl OrientationScorer for LengthScorer {
            fn score(&self, text: &str) -> usize {
                text.len()
            }
        }

        let resolver =
            OrientationResolver::new(Box::new(ScriptedOcr::new(&["a", "bb", "ccc", "dddd"])))
                .with_scorer(Box::new(LengthScorer));
        let result = resolver.resolve_image(&page()).unwrap();
        assert_eq!(result.rotation, Rotation::Deg270);
    }

    #[test]
    fn test_ocr_failure_propagates() {
        let resolver = OrientationResolver::new(Box::new(ScriptedOcr::new(&["the"])));
        assert!(resolver.resolve_image(&page()).is_err());
    }

    #[test]
    fn test_resolve_decodes_by_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let misnamed = dir.path().join("scan.jpg");
        page()
            .save_with_format(&misnamed, image::ImageFormat::Png)
            .unwrap();

        let resolver =
            OrientationResolver::new(Box::new(ScriptedOcr::new(&["the", "", "", ""])));
        let result = resolver.resolve(&misnamed).unwrap();
        assert_eq!(result.rotation, Rotation::Deg0);
        assert_eq!((result.image.width(), result.image.height()), (4, 2));
    }
}
