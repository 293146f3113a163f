//! Annotator configuration.
//!
//! The host UI builds an [`AnnotatorConfig`] (or loads one from JSON) and hands
//! it to [`crate::Annotator::new`]. Everything the core needs to size its
//! per-label state is fixed here, up front.

use serde::{Deserialize, Serialize};

use crate::codec::MAX_IDENTIFIER;
use crate::error::{AnnotationError, Result};
use crate::history::HistoryConfig;
use crate::palette::{Palette, Rgb};

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Configuration for an annotation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatorConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Label names, in label-index order
    pub labels: Vec<String>,

    /// Maximum number of undo steps kept per label
    #[serde(default = "default_max_history_record")]
    pub max_history_record: usize,

    /// Identifier written when a surface is (re)initialized
    #[serde(default)]
    pub default_object_number: u32,

    /// Initial display palette
    #[serde(default = "default_palette")]
    pub palette: Vec<Rgb>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_max_history_record() -> usize {
    HistoryConfig::default().max_history_record
}

fn default_palette() -> Vec<Rgb> {
    Palette::default().as_slice().to_vec()
}

impl AnnotatorConfig {
    /// Create a configuration for the given labels with default settings.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: CONFIG_VERSION,
            labels: labels.into_iter().map(Into::into).collect(),
            max_history_record: default_max_history_record(),
            default_object_number: 0,
            palette: default_palette(),
        }
    }

    /// Set the history depth.
    pub fn with_max_history_record(mut self, max_history_record: usize) -> Self {
        self.max_history_record = max_history_record;
        self
    }

    /// Set the initial palette.
    pub fn with_palette(mut self, palette: Vec<Rgb>) -> Self {
        self.palette = palette;
        self
    }

    /// History configuration applied to every label's ledger.
    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            max_history_record: self.max_history_record,
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.version > CONFIG_VERSION {
            return Err(AnnotationError::invalid_config(format!(
                "version {} is newer than supported version {}",
                self.version, CONFIG_VERSION
            )));
        }
        if self.labels.is_empty() {
            return Err(AnnotationError::invalid_config("no labels configured"));
        }
        for (i, name) in self.labels.iter().enumerate() {
            if self.labels[..i].contains(name) {
                return Err(AnnotationError::invalid_config(format!(
                    "duplicate label '{}'",
                    name
                )));
            }
        }
        if self.max_history_record == 0 {
            return Err(AnnotationError::invalid_config(
                "max_history_record must be at least 1",
            ));
        }
        if self.default_object_number >= MAX_IDENTIFIER {
            return Err(AnnotationError::invalid_config(format!(
                "default object number {} leaves no room for new objects",
                self.default_object_number
            )));
        }
        Ok(())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
