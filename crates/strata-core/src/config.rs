//! History configuration

use tracing::Level;

/// Runtime options for a version history and its diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Derive missing successor links when loading histories written before
    /// successors were persisted (default: true)
    pub migrate_legacy_successors: bool,
    /// Emit newline-delimited JSON logs
    pub log_json: bool,
    /// Default log level when `RUST_LOG` is not set
    pub log_level: Level,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            migrate_legacy_successors: true,
            log_json: false,
            log_level: Level::INFO,
        }
    }
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy_migration(mut self, enabled: bool) -> Self {
        self.migrate_legacy_successors = enabled;
        self
    }

    pub fn with_log_json(mut self, json: bool) -> Self {
        self.log_json = json;
        self
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - STRATA_MIGRATE_LEGACY (optional, "0"/"false"/"off" disables)
    /// - STRATA_LOG_FORMAT (optional, "json" enables JSON output)
    /// - STRATA_LOG (optional, trace|debug|info|warn|error)
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let migrate_legacy_successors = lookup("STRATA_MIGRATE_LEGACY")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(defaults.migrate_legacy_successors);
        let log_json = lookup("STRATA_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(defaults.log_json);
        let log_level = lookup("STRATA_LOG")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.log_level);

        Self {
            migrate_legacy_successors,
            log_json,
            log_level,
        }
    }
}
