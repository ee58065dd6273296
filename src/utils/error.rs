//! Error handling for latexkit
//!
//! Malformed documents are not errors: the parser recovers and reports them
//! as diagnostics. The types here cover the few conditions that do stop a
//! parse, and problems loading options.

use thiserror::Error;

/// Fatal parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The host raised the cancellation flag while the parse was running
    #[error("parse cancelled")]
    Cancelled,
    /// Input longer than the 32-bit offsets of the syntax tree
    #[error("input too large: {len} bytes (maximum is {max})", max = u32::MAX)]
    InputTooLarge { len: usize },
}

/// Result type for parse operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Error loading [`ParseOptions`](crate::config::ParseOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[cfg(feature = "config")]
    #[error("invalid options file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid option: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        assert_eq!(ParseError::Cancelled.to_string(), "parse cancelled");
        let msg = ParseError::InputTooLarge { len: 5_000_000_000 }.to_string();
        assert!(msg.contains("5000000000"));
        assert!(msg.contains("4294967295"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid("cancel_check_interval must be positive".into());
        assert!(err.to_string().contains("cancel_check_interval"));
    }
}
