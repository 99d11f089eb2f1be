use std::time::Duration;

/// Errors that abort the human half of a turn before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The session params or the FEN inside them could not be parsed.
    #[error("malformed game state: {0}")]
    MalformedState(String),

    /// A move slot is missing or has an unusable value.
    #[error("invalid slot {slot}: {reason}")]
    InvalidSlot { slot: &'static str, reason: String },
}

/// Errors raised while driving the engine subprocess.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine process could not be started.
    #[error("engine unavailable: {0}")]
    Unavailable(#[source] std::io::Error),

    /// Writing to or reading from the engine failed, or it answered out of protocol.
    #[error("engine protocol error during {step}: {reason}")]
    Protocol { step: &'static str, reason: String },

    /// The engine did not send the expected reply in time.
    #[error("engine did not answer {expected} within {after:?}")]
    Timeout {
        expected: &'static str,
        after: Duration,
    },

    /// The engine closed its output while a reply was outstanding.
    #[error("engine exited while waiting for {expected}")]
    Closed { expected: &'static str },

    /// The engine reported that it has no move in this position.
    #[error("engine has no move to play")]
    NoMove,
}

/// Errors from reading configuration out of the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
