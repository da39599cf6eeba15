//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `dispatcher`: Polls updates and fans them out to handlers
//! - `message_handler`: Handles incoming photos and text messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `input_handler`: Waits for and validates typed setting values
//! - `worker`: Drains the work queue through the generator
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod dispatcher;
pub mod input_handler;
pub mod message_handler;
pub mod ui_builder;
pub mod worker;

use std::sync::Arc;

use crate::config::BotConfig;
use crate::queue::WorkQueue;
use crate::render::Generator;
use crate::session::SessionStore;
use crate::telegram::ChatApi;

// Re-export main handler functions
pub use callback_handler::callback_handler;
pub use dispatcher::run;
pub use message_handler::message_handler;
pub use worker::worker;

/// Shared state of a running bot
pub struct App<C, G> {
    pub client: C,
    pub generator: Arc<G>,
    pub sessions: Arc<SessionStore>,
    pub queue: WorkQueue,
    pub config: BotConfig,
}

impl<C: ChatApi, G: Generator> App<C, G> {
    pub fn new(client: C, generator: G, config: BotConfig) -> Arc<Self> {
        Arc::new(Self {
            client,
            generator: Arc::new(generator),
            sessions: Arc::new(SessionStore::new(config.session_timeout)),
            queue: WorkQueue::new(),
            config,
        })
    }
}
