use thiserror::Error;

/// Programmer/configuration errors. Everything a visitor can trigger at
/// runtime (out of range jumps, input while a transition is running) is a
/// silent policy rejection instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("a swipe deck needs at least one section")]
    EmptySections,

    #[error("{name} section index {index} is outside of 0..{count}")]
    SectionOutOfRange {
        name: &'static str,
        index: usize,
        count: usize,
    },

    #[error("invalid funnel config: {0}")]
    Invalid(String),

    #[error("failed to parse funnel config: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
