//! Tracing setup for Strata binaries.
//!
//! `RUST_LOG` wins over the configured level. Only the first installation
//! in a process takes effect.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::HistoryConfig;

/// Install the global subscriber. Returns `false` if one was already set.
///
/// * `json`: one JSON object per event, with event fields at the top level.
/// * `level`: default verbosity when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let text = (!json).then(|| fmt::layer().with_target(false));
    let json = json.then(|| {
        fmt::layer()
            .with_target(false)
            .json()
            .flatten_event(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
        .is_ok()
}

/// Install the subscriber described by the log settings of `config`.
pub fn init_from_config(config: &HistoryConfig) -> bool {
    init_tracing(config.log_json, config.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_installation_wins() {
        init_tracing(false, Level::WARN);
        assert!(!init_from_config(&HistoryConfig::default().with_log_json(true)));
        tracing::info!("still logging");
    }
}
