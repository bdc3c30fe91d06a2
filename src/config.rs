use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::EDITOR_STATE_KEY;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub html: HtmlConfig,
    pub markdown: MarkdownConfig,
    pub typst: TypstConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one file per stored key
    pub dir: PathBuf,
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".editor-state"),
            key: EDITOR_STATE_KEY.to_string(),
        }
    }
}

/// Settings consumed by the export converters.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    pub html: HtmlConfig,
    pub markdown: MarkdownConfig,
    pub typst: TypstConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    pub indent_size: u32,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self { indent_size: 40 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub indent_unit: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            indent_unit: "    ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TypstConfig {
    pub keep_headings_with_next: bool,
    pub unbreakable_list_items: usize,
}

impl Default for TypstConfig {
    fn default() -> Self {
        Self {
            keep_headings_with_next: true,
            unbreakable_list_items: 5,
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return the compiled defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unparsable config");
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }

    /// The converter sections, as the exporter takes them.
    pub fn export(&self) -> ExportConfig {
        ExportConfig {
            html: self.html.clone(),
            markdown: self.markdown.clone(),
            typst: self.typst.clone(),
        }
    }

    /// The defaults bundled in `default_config.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }
}
