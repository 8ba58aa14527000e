//! Configuration for the history system.

/// Number of snapshots kept per editing session when nothing else is configured.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Environment variable that overrides the history depth.
pub const MAX_ENTRIES_ENV: &str = "VIZ_HISTORY_MAX_ENTRIES";

/// Configuration for a `HistoryManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Max snapshots kept in the log. Oldest are evicted past this limit.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl HistoryConfig {
    /// Creates a config with the given depth, clamped to at least one entry.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
        }
    }

    /// Builds a config from the environment.
    ///
    /// Resolution order:
    /// 1. `VIZ_HISTORY_MAX_ENTRIES` environment variable
    /// 2. [`DEFAULT_MAX_ENTRIES`]
    pub fn from_env() -> Self {
        match std::env::var(MAX_ENTRIES_ENV) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(n) => Self::with_max_entries(n),
                Err(e) => {
                    tracing::warn!("Ignoring invalid {MAX_ENTRIES_ENV}={raw:?}: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
