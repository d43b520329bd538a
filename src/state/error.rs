//! Race state errors.

use thiserror::Error;

/// Errors raised by roster generation, schedule building and configuration.
///
/// Every failing operation aborts before committing anything, so the
/// controller state is exactly what it was before the call.
#[derive(Debug, Error)]
pub enum RaceError {
    /// A candidate pool holds fewer distinct entries than the roster needs.
    #[error("{pool} pool exhausted: {available} distinct entries, {required} required")]
    PoolExhausted {
        pool: &'static str,
        available: usize,
        required: usize,
    },

    /// Schedule building was asked to work from a roster of the wrong size.
    #[error("invalid schedule state: expected a roster of {expected} horses, got {actual}")]
    InvalidScheduleState { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl RaceError {
    /// Check if the error came from configuration rather than generation.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::ConfigParse(_))
    }
}
