//! # Primitive Telegram Bot
//!
//! A Telegram bot that redraws user photos with geometric primitives.
//! Users configure the rendering through an inline menu; jobs are queued
//! and rendered one at a time by a background worker.

pub mod backoff;
pub mod bot;
pub mod config;
pub mod errors;
pub mod localization;
pub mod menu;
pub mod queue;
pub mod render;
pub mod session;
pub mod telegram;
