//! Runtime configuration.
//!
//! Every section is optional: a missing file section, or a missing field inside
//! one, falls back to the defaults below. Values can be layered from a TOML file
//! ([`QuillConfig::load`]) and from `QUILL_*` environment variables
//! ([`QuillConfig::from_env`] / [`QuillConfig::with_env_overrides`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Markdown shown when the active document has never been saved.
pub const DEFAULT_DOCUMENT_CONTENT: &str = "# Hello, Markdown!";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    pub storage: StorageConfig,
    pub render: RenderConfig,
    pub editor: EditorConfig,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database for the structured tier. `None` keeps it in memory.
    pub database_path: Option<PathBuf>,
    /// JSON file for the flat tier. `None` keeps it in memory.
    pub flat_path: Option<PathBuf>,
    /// Pretend there is no host context at all (pre-render passes), which binds
    /// the null store.
    pub headless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Let raw HTML embedded in markdown reach the sanitizer instead of
    /// escaping it up front.
    pub allow_raw_html: bool,
    /// Load a syntax set and emit highlighted code blocks.
    pub highlight_code: bool,
    /// Settling window for debounced preview renders.
    pub debounce_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            allow_raw_html: true,
            highlight_code: true,
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Id of the active document.
    pub document_id: i64,
    pub default_content: String,
    /// Settling window for debounced document saves.
    pub save_debounce_ms: u64,
    pub default_sample: String,
    pub default_theme: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            document_id: 1,
            default_content: DEFAULT_DOCUMENT_CONTENT.to_owned(),
            save_debounce_ms: 500,
            default_sample: "hello".to_owned(),
            default_theme: "light".to_owned(),
        }
    }
}

impl QuillConfig {
    /// Load a TOML config file.
    ///
    /// `$VAR` references in the file are substituted with the matching
    /// environment variable before parsing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        for (k, v) in std::env::vars() {
            contents = contents.replace(&format!("${}", k), &v);
        }
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Defaults with `QUILL_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of an existing config.
    ///
    /// - `QUILL_DB_PATH`: structured store database file
    /// - `QUILL_FLAT_PATH`: flat store JSON file
    /// - `QUILL_HEADLESS`: `1`/`true` binds the null store
    /// - `QUILL_RENDER_DEBOUNCE_MS`: preview settling window
    /// - `QUILL_SAVE_DEBOUNCE_MS`: save settling window
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("QUILL_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("QUILL_FLAT_PATH") {
            self.storage.flat_path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("QUILL_HEADLESS") {
            self.storage.headless = parse_flag("QUILL_HEADLESS", value)?;
        }
        if let Some(value) = lookup("QUILL_RENDER_DEBOUNCE_MS") {
            self.render.debounce_ms = parse_millis("QUILL_RENDER_DEBOUNCE_MS", value)?;
        }
        if let Some(value) = lookup("QUILL_SAVE_DEBOUNCE_MS") {
            self.editor.save_debounce_ms = parse_millis("QUILL_SAVE_DEBOUNCE_MS", value)?;
        }
        Ok(self)
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}

fn parse_millis(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}
