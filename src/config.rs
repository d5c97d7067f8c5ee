//! Runtime configuration.
//!
//! Settings come from a JSON file (`--config`, or `~/.pms/config.json` when it
//! exists) layered over built-in defaults; command-line flags override both.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::window::DateWindow;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("project window starts {start} after it ends {end}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },

    #[error("delimiter '{0}' must be a single ASCII character")]
    Delimiter(char),
}

/// Header names of the task table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskColumns {
    pub number: String,
    pub title: String,
    pub description: String,
    pub expected_result: String,
    pub responsible: String,
    pub priority: String,
    pub recurrence: String,
    pub task_type: String,
    pub source: String,
    pub start_date: String,
    pub end_date: String,
}

impl Default for TaskColumns {
    fn default() -> Self {
        TaskColumns {
            number: "number".into(),
            title: "title".into(),
            description: "description".into(),
            expected_result: "expected_result".into(),
            responsible: "responsible".into(),
            priority: "priority".into(),
            recurrence: "recurrence".into(),
            task_type: "type".into(),
            source: "source".into(),
            start_date: "start_date".into(),
            end_date: "end_date".into(),
        }
    }
}

/// Header names of the document table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentColumns {
    pub seq: String,
    pub name: String,
    pub doc_type: String,
    pub url: String,
}

impl Default for DocumentColumns {
    fn default() -> Self {
        DocumentColumns {
            seq: "seq".into(),
            name: "name".into(),
            doc_type: "type".into(),
            url: "url".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project_start: NaiveDate,
    pub project_end: NaiveDate,
    pub delimiter: char,
    /// Skip rows with unrecognised recurrence labels instead of scheduling them quarterly.
    pub strict_categories: bool,
    pub task_columns: TaskColumns,
    pub document_columns: DocumentColumns,
}

impl Default for Config {
    fn default() -> Self {
        let window = DateWindow::project_default();
        Config {
            project_start: window.start,
            project_end: window.end,
            delimiter: ';',
            strict_categories: false,
            task_columns: TaskColumns::default(),
            document_columns: DocumentColumns::default(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, else the default location, else defaults.
    pub fn load(explicit: Option<&Path>, pms_dir: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = pms_dir.join("config.json");
                if !p.exists() {
                    return Ok(Config::default());
                }
                p
            }
        };
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_start > self.project_end {
            return Err(ConfigError::InvertedWindow {
                start: self.project_start,
                end: self.project_end,
            });
        }
        self.delimiter_byte()?;
        Ok(())
    }

    pub fn project_window(&self) -> DateWindow {
        DateWindow::new(self.project_start, self.project_end)
    }

    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::Delimiter(self.delimiter))
        }
    }
}

/// Directory holding the store and config: `$HOME/.pms`, or `./.pms` without a home.
pub fn default_pms_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pms")
}
