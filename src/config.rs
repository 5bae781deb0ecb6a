//! Configuration management for docsight.
//!
//! Settings load from an optional TOML file (`docsight.toml`, either an
//! explicit path or the user config directory), with environment
//! overrides applied on top for the completion client.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::llm::{LlmConfig, RetryPolicy};

/// Per-stage input budgets, thresholds, and retry settings for the
/// analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Character budget for the tl;dr stage input.
    #[serde(default = "default_tldr_chars")]
    pub tldr_chars: usize,
    /// Character budget for the executive-summary stage input.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
    /// Character budget for the entity-extraction stage input.
    #[serde(default = "default_entity_chars")]
    pub entity_chars: usize,
    /// Character budget for the signal-analysis stage input.
    #[serde(default = "default_signal_chars")]
    pub signal_chars: usize,
    /// Character budget for the relationship-detection stage input.
    #[serde(default = "default_relationship_chars")]
    pub relationship_chars: usize,
    /// Character budget per section node.
    #[serde(default = "default_section_chars")]
    pub section_chars: usize,
    /// Character budget for the recommendation stage text sample.
    #[serde(default = "default_recommendation_chars")]
    pub recommendation_chars: usize,
    /// Sections whose content is at most this long are summarized
    /// verbatim without a completion call (full pipeline).
    #[serde(default = "default_section_threshold")]
    pub section_threshold: usize,
    /// Verbatim threshold used by the quick pipeline variant.
    #[serde(default = "default_quick_section_threshold")]
    pub quick_section_threshold: usize,
    /// Retries after the initial tl;dr attempt before the run aborts.
    #[serde(default = "default_tldr_retries")]
    pub tldr_retries: u32,
    /// Base backoff delay between tl;dr attempts, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_tldr_chars() -> usize {
    4000
}
fn default_summary_chars() -> usize {
    6000
}
fn default_entity_chars() -> usize {
    5000
}
fn default_signal_chars() -> usize {
    3000
}
fn default_relationship_chars() -> usize {
    4000
}
fn default_section_chars() -> usize {
    2000
}
fn default_recommendation_chars() -> usize {
    1000
}
fn default_section_threshold() -> usize {
    50
}
fn default_quick_section_threshold() -> usize {
    100
}
fn default_tldr_retries() -> u32 {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tldr_chars: default_tldr_chars(),
            summary_chars: default_summary_chars(),
            entity_chars: default_entity_chars(),
            signal_chars: default_signal_chars(),
            relationship_chars: default_relationship_chars(),
            section_chars: default_section_chars(),
            recommendation_chars: default_recommendation_chars(),
            section_threshold: default_section_threshold(),
            quick_section_threshold: default_quick_section_threshold(),
            tldr_retries: default_tldr_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl AnalysisConfig {
    /// Retry policy applied to the tl;dr stage.
    pub fn tldr_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.tldr_retries,
            base_delay_ms: self.retry_base_delay_ms,
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Settings {
    /// Load settings from an explicit path, or from the default config
    /// location when none is given. A missing file yields defaults.
    /// Environment overrides are applied to the LLM section either way.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut settings = match path {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
                toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?
            }
            None => Self::default(),
        };

        settings.llm = settings.llm.with_env_overrides();
        Ok(settings)
    }

    /// Default config file location: `<config dir>/docsight/docsight.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docsight").join("docsight.toml"))
    }
}
