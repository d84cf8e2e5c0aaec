//! Wizard configuration loaded from `wizard.toml`.
//!
//! Every field has a default, so an absent or partial file is fine.
//! `SETUP_WIZARD_OUTPUT_DIR` and `SETUP_WIZARD_LOG` take precedence over
//! the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::state_machine::Messages;

const DEFAULT_CONFIG_FILE: &str = "wizard.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WizardConfig {
    /// Version handed to every session as its install target.
    #[serde(default = "default_target_version")]
    pub target_version: String,

    /// Directory feature work writes into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on background worker threads.
    #[serde(default = "default_max_blocking_threads")]
    pub max_blocking_threads: usize,

    #[serde(default)]
    pub messages: MessagesConfig,

    #[serde(default = "default_features")]
    pub features: Vec<FeatureConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_done_message")]
    pub done: String,

    #[serde(default = "default_still_running_message")]
    pub still_running: String,
}

/// One yes/no step of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    pub question: String,
    /// Answer to use without asking.
    #[serde(default)]
    pub preset: Option<bool>,
}

fn default_target_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("wizard-output")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_blocking_threads() -> usize {
    4
}

fn default_done_message() -> String {
    Messages::default().done
}

fn default_still_running_message() -> String {
    Messages::default().still_running
}

fn default_features() -> Vec<FeatureConfig> {
    [
        ("chat", "Enable the chat formatting module?"),
        ("spawn", "Enable spawn point management?"),
        ("protect", "Enable world protection?"),
        ("geoip", "Enable GeoIP lookups for joining users?"),
    ]
    .into_iter()
    .map(|(name, question)| FeatureConfig {
        name: name.to_string(),
        question: question.to_string(),
        preset: None,
    })
    .collect()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            done: default_done_message(),
            still_running: default_still_running_message(),
        }
    }
}

impl From<&MessagesConfig> for Messages {
    fn from(config: &MessagesConfig) -> Self {
        Messages {
            done: config.done.clone(),
            still_running: config.still_running.clone(),
        }
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            target_version: default_target_version(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            max_blocking_threads: default_max_blocking_threads(),
            messages: MessagesConfig::default(),
            features: default_features(),
        }
    }
}

impl WizardConfig {
    /// Load from `path`, or from `wizard.toml` in the working directory.
    /// A missing default file means defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("SETUP_WIZARD_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("SETUP_WIZARD_LOG").filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn messages(&self) -> Messages {
        Messages::from(&self.messages)
    }
}
