use std::path::Path;

use crate::annotate::AnnotateConfig;
use crate::error::ConfigError;
use crate::resolve::ResolveConfig;
use crate::score::LengthPolicy;

/// How a batch of sheets is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStrategy {
    /// One sheet after another on the calling thread.
    Sequential,
    /// Always fan out over the rayon pool.
    Parallel,
    /// Fan out only when the batch has more sheets than this.
    Auto(usize),
}

impl BatchStrategy {
    pub const DEFAULT_AUTO_THRESHOLD: usize = 4;

    pub fn should_use_parallel(&self, n_sheets: usize) -> bool {
        match self {
            Self::Sequential => false,
            Self::Parallel => true,
            Self::Auto(threshold) => n_sheets > *threshold,
        }
    }
}

impl Default for BatchStrategy {
    fn default() -> Self {
        Self::Auto(Self::DEFAULT_AUTO_THRESHOLD)
    }
}

/// Top-level grading configuration.
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GradeConfig {
    /// Blank / ambiguous gates for answer resolution.
    pub resolve: ResolveConfig,
    /// Behavior when a sheet and the key differ in length.
    pub length_policy: LengthPolicy,
    /// Annotated-image output.
    pub annotate: AnnotateConfig,
    /// Batch execution strategy.
    pub batch: BatchStrategy,
}

impl GradeConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
