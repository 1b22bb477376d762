//! Runtime configuration.
//!
//! [`Config`] holds filesystem locations and the bind address; it is resolved
//! once at startup. [`Settings`] holds the tunable extraction limits and is
//! read from `settings.json` in the data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory (~/.local/share/docsift)
    pub data_dir: PathBuf,
    /// Object storage root; document storage paths resolve below it
    pub objects_dir: PathBuf,
    /// SQLite metadata database
    pub database_file: PathBuf,
    /// Extraction settings file
    pub settings_file: PathBuf,
    /// Address the HTTP trigger binds to
    pub bind_addr: String,
}

impl Config {
    /// Load configuration or use defaults.
    ///
    /// `DOCSIFT_DATA_DIR` and `DOCSIFT_BIND` override the defaults.
    pub fn load_or_default() -> Self {
        let data_dir = std::env::var_os("DOCSIFT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("docsift")
            });

        let bind_addr =
            std::env::var("DOCSIFT_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Self::with_data_dir(data_dir, bind_addr)
    }

    /// Build a configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf, bind_addr: String) -> Self {
        Self {
            objects_dir: data_dir.join("objects"),
            database_file: data_dir.join("docsift.db"),
            settings_file: data_dir.join("settings.json"),
            data_dir,
            bind_addr,
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.objects_dir)?;
        Ok(())
    }
}

/// Tunable extraction limits, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Buffers shorter than this are treated as empty files
    pub empty_file_threshold: usize,
    /// Maximum characters kept in `extracted_text` before the truncation notice
    pub max_text_chars: usize,
    pub pdf: PdfSettings,
    pub container: ContainerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            empty_file_threshold: 100,
            max_text_chars: 2_097_152,
            pdf: PdfSettings::default(),
            container: ContainerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read settings {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Invalid settings file {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    /// Write settings to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Limits for the heuristic PDF extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    /// Only this many leading bytes of a PDF are scanned
    pub max_scan_bytes: usize,
    /// Cap on `<...>` hex-string matches decoded
    pub max_hex_matches: usize,
    /// Cap on alphabetic word-sequence matches kept
    pub max_word_sequences: usize,
    /// Longest `BT ... ET` body considered a text object
    pub max_text_object_len: usize,
    /// Longest `(...) Tj` operand considered
    pub max_show_text_len: usize,
    pub scan: ScanThresholds,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            max_scan_bytes: 10 * 1024 * 1024,
            max_hex_matches: 2000,
            max_word_sequences: 1000,
            max_text_object_len: 2000,
            max_show_text_len: 200,
            scan: ScanThresholds::default(),
        }
    }
}

/// Empirical thresholds for flagging a PDF as scanned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanThresholds {
    /// Recovered text shorter than this (in chars) may indicate a scan
    pub text_ceiling: usize,
    /// Below this many chars the text is replaced by the OCR-required notice
    pub sentinel_below: usize,
    /// Stream count must exceed `page_count * stream_page_ratio`
    pub stream_page_ratio: f64,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            text_ceiling: 500,
            sentinel_below: 100,
            stream_page_ratio: 1.0,
        }
    }
}

/// Limits for the zip/XML container extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Highest slide index probed in a deck
    pub max_parts: usize,
    /// Append `[Speaker Notes]` blocks when a notes part exists
    pub include_speaker_notes: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            max_parts: 100,
            include_speaker_notes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&temp_dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_text_chars, 2_097_152);
        assert_eq!(settings.pdf.scan.text_ceiling, 500);
    }

    #[test]
    fn test_settings_partial_file_keeps_other_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"pdf": {"scan": {"text_ceiling": 800}}}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.pdf.scan.text_ceiling, 800);
        assert_eq!(settings.pdf.scan.sentinel_below, 100);
        assert_eq!(settings.pdf.max_hex_matches, 2000);
        assert_eq!(settings.empty_file_threshold, 100);
    }

    #[test]
    fn test_settings_invalid_json_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_settings_save_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.container.include_speaker_notes = false;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_config_paths_derive_from_data_dir() {
        let config = Config::with_data_dir(PathBuf::from("/tmp/ds"), "127.0.0.1:9".to_string());
        assert_eq!(config.objects_dir, PathBuf::from("/tmp/ds/objects"));
        assert_eq!(config.database_file, PathBuf::from("/tmp/ds/docsift.db"));
        assert_eq!(config.settings_file, PathBuf::from("/tmp/ds/settings.json"));
    }
}
