//! # Bot Error Types Module
//!
//! This module defines the error categories surfaced by the bot. Handlers and
//! loops work with `anyhow::Result`; `BotError` is used where the category
//! decides how the failure is reported (logged only, or logged and announced
//! to the user).

/// Custom error types for bot operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// Missing or malformed configuration
    Config(String),
    /// Photo could not be fetched or stored
    Download(String),
    /// The generator failed to produce an artifact
    Generation(String),
    /// The artifact could not be sent back to the chat
    Delivery(String),
    /// Chat platform transport failures (polling, send, delete)
    Transport(String),
    /// Free-text input rejected by validation
    InvalidInput(String),
}

impl BotError {
    /// Whether the user should receive a failure notice for this error
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            BotError::Download(_) | BotError::Generation(_) | BotError::Delivery(_)
        )
    }
}

impl std::fmt::Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BotError::Download(msg) => write!(f, "Download error: {msg}"),
            BotError::Generation(msg) => write!(f, "Generation error: {msg}"),
            BotError::Delivery(msg) => write!(f, "Delivery error: {msg}"),
            BotError::Transport(msg) => write!(f, "Transport error: {msg}"),
            BotError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for BotError {}

impl From<anyhow::Error> for BotError {
    fn from(err: anyhow::Error) -> Self {
        BotError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BotError::Generation("exit status 2".to_string());
        assert_eq!(err.to_string(), "Generation error: exit status 2");

        let err = BotError::InvalidInput("1500".to_string());
        assert_eq!(err.to_string(), "Invalid input: 1500");
    }

    #[test]
    fn test_user_facing_categories() {
        assert!(BotError::Download("x".into()).is_user_facing());
        assert!(BotError::Delivery("x".into()).is_user_facing());
        assert!(!BotError::Transport("x".into()).is_user_facing());
        assert!(!BotError::InvalidInput("x".into()).is_user_facing());
    }

    #[test]
    fn test_from_anyhow_is_transport() {
        let err: BotError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err, BotError::Transport("connection reset".to_string()));
    }
}
