//! Voting configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tally_utils::LogFormat;

use crate::ConfigError;

/// What a vote beyond the per-group cap does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Reserve, fail the join, refund, return `GroupCapacityExceeded`.
    #[default]
    Reject,
    /// If the member already holds `cap` votes on the group, report the vote
    /// as already cast without touching the budget.
    ///
    /// The check is a plain read ahead of the spend, so it is best effort: a
    /// join landing between the read and the spend is still caught by the
    /// conditional join, and the call then ends in `GroupCapacityExceeded`.
    NoopSuccess,
}

/// Configuration for vote casting and the stores behind it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotingConfig {
    /// Per-member vote cap on a single group.
    #[serde(default = "default_max_votes_per_group")]
    pub max_votes_per_group: u32,

    /// Budget each meeting member is seeded with.
    #[serde(default = "default_total_votes")]
    pub total_votes: u32,

    #[serde(default)]
    pub reentry_policy: ReentryPolicy,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory of the authoritative LMDB environment.
    #[serde(default = "default_lmdb_path")]
    pub lmdb_path: PathBuf,

    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// SQLite database file of the shadow store.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_max_votes_per_group() -> u32 {
    3
}

fn default_total_votes() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lmdb_path() -> PathBuf {
    PathBuf::from("./data/lmdb")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./data/shadow.sqlite3")
}

impl VotingConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            max_votes_per_group: default_max_votes_per_group(),
            total_votes: default_total_votes(),
            reentry_policy: ReentryPolicy::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            lmdb_path: default_lmdb_path(),
            lmdb_map_size: default_lmdb_map_size(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = VotingConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = VotingConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.max_votes_per_group, config.max_votes_per_group);
        assert_eq!(parsed.sqlite_path, config.sqlite_path);
        assert_eq!(parsed.reentry_policy, ReentryPolicy::Reject);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = VotingConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_votes_per_group, 3);
        assert_eq!(config.total_votes, 5);
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            max_votes_per_group = 1
            reentry_policy = "noop_success"
            log_format = "json"
        "#;
        let config = VotingConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.max_votes_per_group, 1);
        assert_eq!(config.reentry_policy, ReentryPolicy::NoopSuccess);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.total_votes, 5);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(matches!(
            VotingConfig::from_toml_str(r#"reentry_policy = "maybe""#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_returns_read_error() {
        let result = VotingConfig::from_toml_file(Path::new("/nonexistent/tally.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
