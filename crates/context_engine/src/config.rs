//! Engine configuration.
//!
//! Static settings for the whole pipeline, usually loaded from TOML:
//!
//! ```toml
//! order = ["group_flatten", "reaction_feedback", "page_editor_context"]
//!
//! [pipeline]
//! enable_logging = true
//!
//! [history_compression]
//! enabled = true
//! keep_recent = 12
//! ```
//!
//! Every section is optional and falls back to its defaults.

use crate::pipeline::PipelineConfig;
use crate::pipeline::processors::{
    GroupFlattenConfig, HistoryCompressionConfig, PageEditorConfig, ReactionFeedbackConfig,
    ToolStateConfig, UserMemoryConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Identifies a processor in the configured execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    GroupFlatten,
    HistoryCompression,
    ReactionFeedback,
    ToolState,
    UserMemory,
    PageEditorContext,
}

impl ProcessorKind {
    /// Default execution order.
    ///
    /// Structural passes run first so annotators see the final message list;
    /// providers run last, page context closest to the model call.
    pub const DEFAULT_ORDER: [ProcessorKind; 6] = [
        ProcessorKind::GroupFlatten,
        ProcessorKind::HistoryCompression,
        ProcessorKind::ReactionFeedback,
        ProcessorKind::ToolState,
        ProcessorKind::UserMemory,
        ProcessorKind::PageEditorContext,
    ];

    /// Name reported by the corresponding processor.
    pub fn processor_name(&self) -> &'static str {
        match self {
            ProcessorKind::GroupFlatten => "group_flatten",
            ProcessorKind::HistoryCompression => "history_compression",
            ProcessorKind::ReactionFeedback => "reaction_feedback",
            ProcessorKind::ToolState => "tool_state",
            ProcessorKind::UserMemory => "user_memory",
            ProcessorKind::PageEditorContext => "page_editor_context",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: PipelineConfig,

    /// Processors to run, in order. Processors left out do not run.
    pub order: Vec<ProcessorKind>,

    pub group_flatten: GroupFlattenConfig,
    pub history_compression: HistoryCompressionConfig,
    pub reaction_feedback: ReactionFeedbackConfig,
    pub tool_state: ToolStateConfig,
    pub user_memory: UserMemoryConfig,
    pub page_editor: PageEditorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            order: ProcessorKind::DEFAULT_ORDER.to_vec(),
            group_flatten: GroupFlattenConfig::default(),
            history_compression: HistoryCompressionConfig::default(),
            reaction_feedback: ReactionFeedbackConfig::default(),
            tool_state: ToolStateConfig::default(),
            user_memory: UserMemoryConfig::default(),
            page_editor: PageEditorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for kind in &self.order {
            if !seen.insert(kind) {
                return Err(ConfigError::Invalid(format!(
                    "processor '{}' appears more than once in order",
                    kind.processor_name()
                )));
            }
        }

        if self.history_compression.keep_recent == 0 {
            return Err(ConfigError::Invalid(
                "history_compression.keep_recent must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
