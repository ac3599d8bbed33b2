//! Configuration management for scanarchive using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default archive (metadata) filename.
pub const DEFAULT_ARCHIVE_FILENAME: &str = "metadata.txt";

/// Default identifier counter filename.
pub const DEFAULT_COUNTER_FILENAME: &str = "filecount.txt";

/// Default subdirectory for archived images.
pub const IMAGES_SUBDIR: &str = "completed_files";

/// Default subdirectory for extracted text.
pub const TEXTS_SUBDIR: &str = "completed_text_files";

/// Default staging subdirectory.
pub const STAGING_SUBDIR: &str = "loading_zone";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SCANARCHIVE_DATA_DIR";

/// External upload command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct UploadConfig {
    /// Command to execute.
    pub command: String,
    /// Arguments (can include a {file} placeholder).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[prefer(default)]
    pub args: Vec<String>,
}

/// OCR settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct OcrSection {
    /// Tesseract language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Token counted to score an orientation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_token: Option<String>,
}

impl OcrSection {
    pub fn is_default(&self) -> bool {
        self.language.is_none() && self.score_token.is_none()
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Directory holding archived images.
    pub images_dir: PathBuf,
    /// Directory holding extracted text.
    pub texts_dir: PathBuf,
    /// Directory scanned for batches to ingest.
    pub staging_dir: PathBuf,
    /// Archive filename, relative to the data directory.
    pub archive_filename: String,
    /// Counter filename, relative to the data directory.
    pub counter_filename: String,
    /// Tesseract language code.
    pub ocr_language: String,
    /// Token counted to score an orientation.
    pub score_token: String,
    /// Upload command, if any.
    pub upload: Option<UploadConfig>,
    /// Delete batch folders once every image in them was archived.
    pub remove_completed_batches: bool,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/scanarchive/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scanarchive");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            images_dir: data_dir.join(IMAGES_SUBDIR),
            texts_dir: data_dir.join(TEXTS_SUBDIR),
            staging_dir: data_dir.join(STAGING_SUBDIR),
            data_dir,
            archive_filename: DEFAULT_ARCHIVE_FILENAME.to_string(),
            counter_filename: DEFAULT_COUNTER_FILENAME.to_string(),
            ocr_language: "eng".to_string(),
            score_token: "the".to_string(),
            upload: None,
            remove_completed_batches: true,
        }
    }

    /// Move the data directory, carrying default subdirectories along.
    fn set_data_dir(&mut self, data_dir: PathBuf) {
        let defaults = Self::with_data_dir(self.data_dir.clone());
        if self.images_dir == defaults.images_dir {
            self.images_dir = data_dir.join(IMAGES_SUBDIR);
        }
        if self.texts_dir == defaults.texts_dir {
            self.texts_dir = data_dir.join(TEXTS_SUBDIR);
        }
        if self.staging_dir == defaults.staging_dir {
            self.staging_dir = data_dir.join(STAGING_SUBDIR);
        }
        self.data_dir = data_dir;
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(&self.archive_filename)
    }

    pub fn counter_path(&self) -> PathBuf {
        self.data_dir.join(&self.counter_filename)
    }

    /// Ensure the data, image, text and staging directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for (label, dir) in [
            ("data", &self.data_dir),
            ("images", &self.images_dir),
            ("texts", &self.texts_dir),
            ("staging", &self.staging_dir),
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        label,
                        dir.display(),
                        e
                    ),
                )
            })?;
        }
        Ok(())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Archived image directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<String>,
    /// Extracted text directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts_dir: Option<String>,
    /// Staging directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<String>,
    /// Archive filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_file: Option<String>,
    /// Counter filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_file: Option<String>,
    /// OCR settings.
    #[serde(default, skip_serializing_if = "OcrSection::is_default")]
    #[prefer(default)]
    pub ocr: OcrSection,
    /// Upload command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,
    /// Delete batch folders after a fully successful ingest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_completed_batches: Option<bool>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers scanarchive config files in standard locations.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("scanarchive").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("ignoring config {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.set_data_dir(self.resolve_path(data_dir, base_dir));
        }
        if let Some(ref dir) = self.images_dir {
            settings.images_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.texts_dir {
            settings.texts_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.staging_dir {
            settings.staging_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref name) = self.archive_file {
            settings.archive_filename = name.clone();
        }
        if let Some(ref name) = self.counter_file {
            settings.counter_filename = name.clone();
        }
        if let Some(ref language) = self.ocr.language {
            settings.ocr_language = language.clone();
        }
        if let Some(ref token) = self.ocr.score_token {
            settings.score_token = token.clone();
        }
        if let Some(ref upload) = self.upload {
            settings.upload = Some(upload.clone());
        }
        if let Some(remove) = self.remove_completed_batches {
            settings.remove_completed_batches = remove;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory (--target flag).
    pub data: Option<PathBuf>,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return match Config::load_from_path(config_path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring config {}: {}", config_path.display(), e);
                Config::default()
            }
        };
    }

    // Priority 2: Auto-discover via prefer
    Config::load().await
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_file_config(&options).await;
    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        current_dir()
    } else {
        config.base_dir().unwrap_or_else(current_dir)
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // SCANARCHIVE_DATA_DIR overrides the config file
    if let Some(data_dir) = std::env::var(DATA_DIR_ENV).ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using {} from environment: {}", DATA_DIR_ENV, data_dir);
        settings.set_data_dir(config.resolve_path(&data_dir, &current_dir()));
    }

    // --target takes precedence over everything
    if let Some(data_dir) = options.data {
        let data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            current_dir().join(data_dir)
        };
        settings.set_data_dir(data_dir);
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_layout() {
        let settings = Settings::with_data_dir(PathBuf::from("/data"));
        assert_eq!(settings.images_dir, PathBuf::from("/data/completed_files"));
        assert_eq!(settings.texts_dir, PathBuf::from("/data/completed_text_files"));
        assert_eq!(settings.staging_dir, PathBuf::from("/data/loading_zone"));
        assert_eq!(settings.archive_path(), PathBuf::from("/data/metadata.txt"));
        assert_eq!(settings.counter_path(), PathBuf::from("/data/filecount.txt"));
        assert!(settings.remove_completed_batches);
        assert!(settings.upload.is_none());
    }

    #[test]
    fn test_apply_relative_paths() {
        let config = Config {
            data_dir: Some("archive".to_string()),
            staging_dir: Some("/mnt/scanner".to_string()),
            archive_file: Some("records.txt".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::with_data_dir(PathBuf::from("/old"));
        config.apply_to_settings(&mut settings, Path::new("/etc/scan"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/scan/archive"));
        assert_eq!(
            settings.images_dir,
            PathBuf::from("/etc/scan/archive/completed_files")
        );
        assert_eq!(settings.staging_dir, PathBuf::from("/mnt/scanner"));
        assert_eq!(
            settings.archive_path(),
            PathBuf::from("/etc/scan/archive/records.txt")
        );
    }

    #[test]
    fn test_explicit_dirs_survive_data_dir_move() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/a"));
        settings.texts_dir = PathBuf::from("/texts");
        settings.set_data_dir(PathBuf::from("/b"));
        assert_eq!(settings.texts_dir, PathBuf::from("/texts"));
        assert_eq!(settings.images_dir, PathBuf::from("/b/completed_files"));
    }

    #[test]
    fn test_ensure_directories_covers_archive_layout() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().join("archive"));
        settings.ensure_directories().unwrap();

        let layout = crate::storage::ArchiveLayout::from_settings(&settings);
        assert!(layout.images_dir.is_dir());
        assert!(layout.texts_dir.is_dir());
        assert!(settings.staging_dir.is_dir());
        assert!(layout.archive_path.parent().unwrap().is_dir());
        assert!(layout.counter_path.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanarchive.toml");
        fs::write(
            &path,
            r#"
data_dir = "data"
remove_completed_batches = false

[ocr]
language = "deu"
score_token = "der"

[upload]
command = "upload-photo"
args = ["--file", "{file}"]
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.data_dir, dir.path().join("data"));
        assert_eq!(settings.ocr_language, "deu");
        assert_eq!(settings.score_token, "der");
        assert!(!settings.remove_completed_batches);
        assert_eq!(
            settings.upload,
            Some(UploadConfig {
                command: "upload-photo".to_string(),
                args: vec!["--file".to_string(), "{file}".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("scanarchive.yaml");
        fs::write(&yaml, "counter_file: ids.txt\n").unwrap();
        let json = dir.path().join("scanarchive.json");
        fs::write(&json, r#"{"archive_file": "records.txt"}"#).unwrap();

        let yaml_config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(yaml_config.counter_file.as_deref(), Some("ids.txt"));
        let json_config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(json_config.archive_file.as_deref(), Some("records.txt"));
    }

    #[tokio::test]
    async fn test_load_invalid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanarchive.toml");
        fs::write(&path, "data_dir = [").unwrap();
        assert!(Config::load_from_path(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_target_overrides_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanarchive.toml");
        fs::write(&path, "data_dir = \"from-config\"\n").unwrap();

        let (settings, _) = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            use_cwd: false,
            data: Some(dir.path().join("from-flag")),
        })
        .await;
        assert_eq!(settings.data_dir, dir.path().join("from-flag"));
        assert_eq!(
            settings.staging_dir,
            dir.path().join("from-flag").join("loading_zone")
        );
    }
}
