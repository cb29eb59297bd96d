//! Runtime configuration for embedding the ontology core.
//!
//! # Responsibility
//! - Resolve the database path and logging settings from defaults and env.
//!
//! # Invariants
//! - Blank environment values are ignored, never treated as empty paths.

use crate::logging::{default_log_level, LogTarget};
use std::path::PathBuf;

/// Database file name used when no path is configured.
pub const DEFAULT_DB_FILE_NAME: &str = "kindtree.sqlite3";

pub const ENV_DB_PATH: &str = "KINDTREE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "KINDTREE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "KINDTREE_LOG_DIR";

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file holding the ontology snapshot.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Directory for rolling log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Defaults overlaid with `KINDTREE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = non_blank(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = non_blank(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config
    }

    pub fn log_target(&self) -> LogTarget {
        match &self.log_dir {
            Some(dir) => LogTarget::Directory(dir.clone()),
            None => LogTarget::Stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DEFAULT_DB_FILE_NAME, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use crate::logging::LogTarget;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn defaults_use_temp_db_and_stderr() {
        let config = CoreConfig::from_lookup(|_| None);
        assert!(config.db_path.ends_with(DEFAULT_DB_FILE_NAME));
        assert_eq!(config.log_target(), LogTarget::Stderr);
    }

    #[test]
    fn lookup_values_override_defaults_and_blanks_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, " /data/kinds.sqlite3 "),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_LOG_DIR, "   "),
        ]);
        let config = CoreConfig::from_lookup(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/data/kinds.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }
}
