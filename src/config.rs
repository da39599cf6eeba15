//! # Bot Configuration Module
//!
//! This module defines the runtime configuration of the bot: credentials,
//! storage directories, session expiry, polling and retry settings.
//! Values come from environment variables (optionally loaded from `.env`).

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::BotError;

// Constants for bot configuration
pub const DEFAULT_INPUT_DIR: &str = "./data/inputs";
pub const DEFAULT_OUTPUT_DIR: &str = "./data/outputs";
pub const DEFAULT_PRIMITIVE_BINARY: &str = "primitive";
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 15 * 60;
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;
pub const DEFAULT_POLL_TIMEOUT_SECS: u32 = 10;

/// Retry configuration for the update polling loop
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay after the first failure in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for the exponential delay in milliseconds
    pub max_delay_ms: u64,
    /// Maximum random jitter added to every delay in milliseconds
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000, // 1 second
            max_delay_ms: 30000, // 30 seconds
            jitter_ms: 500,
        }
    }
}

/// Configuration structure for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// Cache directory for downloaded photos
    pub input_dir: PathBuf,
    /// Directory for generated artifacts
    pub output_dir: PathBuf,
    /// Path or name of the `primitive` executable
    pub primitive_binary: PathBuf,
    /// Worker threads handed to the generator
    pub workers: usize,
    /// Inactivity after which a session is dropped
    pub session_timeout: Duration,
    /// Interval between expiry sweeps
    pub sweep_interval: Duration,
    /// Server-side long poll timeout in seconds
    pub poll_timeout_secs: u32,
    /// Polling loop retry policy
    pub retry: RetryConfig,
}

impl BotConfig {
    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BotError::Config("TELEGRAM_BOT_TOKEN must be set".to_string()))?;

        let workers = match lookup("PRIMITIVE_WORKERS") {
            Some(raw) => parse_number::<usize>("PRIMITIVE_WORKERS", &raw)?.max(1),
            None => default_workers(),
        };

        let session_timeout = match lookup("SESSION_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("SESSION_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_SESSION_TIMEOUT_SECS,
        };
        let sweep_interval = match lookup("SESSION_SWEEP_SECS") {
            Some(raw) => parse_number::<u64>("SESSION_SWEEP_SECS", &raw)?,
            None => DEFAULT_SESSION_SWEEP_SECS,
        };
        if sweep_interval == 0 {
            return Err(BotError::Config(
                "SESSION_SWEEP_SECS must be greater than zero".to_string(),
            ));
        }
        let poll_timeout_secs = match lookup("POLL_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u32>("POLL_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_POLL_TIMEOUT_SECS,
        };

        Ok(Self {
            token,
            input_dir: lookup("PRIMITIVE_INPUT_DIR")
                .unwrap_or_else(|| DEFAULT_INPUT_DIR.to_string())
                .into(),
            output_dir: lookup("PRIMITIVE_OUTPUT_DIR")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
                .into(),
            primitive_binary: lookup("PRIMITIVE_BINARY")
                .unwrap_or_else(|| DEFAULT_PRIMITIVE_BINARY.to_string())
                .into(),
            workers,
            session_timeout: Duration::from_secs(session_timeout),
            sweep_interval: Duration::from_secs(sweep_interval),
            poll_timeout_secs,
            retry: RetryConfig::default(),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, BotError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| BotError::Config(format!("{key} must be a number, got '{raw}'")))
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
