//! # Session Store Module
//!
//! Per-user interactive state, from an uploaded photo through menu
//! navigation to job submission. The store owns the only copy of each
//! session; callers get clones and write back whole sessions.
//!
//! Sessions expire after a period of inactivity. A single background sweep
//! removes them and releases any pending free-text wait.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use teloxide::types::{ChatId, MessageId, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::menu::Activity;
use crate::render::RenderConfig;

/// A text message captured while a session waits for free-text input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub message_id: MessageId,
    pub text: String,
}

/// Handle to a running free-text waiter.
///
/// `sender` feeds the waiter; `cancel` tells it to stop. Cancelling is
/// non-blocking and sticky, so a waiter that has not started listening yet
/// still observes it.
#[derive(Debug, Clone)]
pub struct InputWait {
    pub sender: mpsc::Sender<TextInput>,
    pub cancel: CancellationToken,
}

impl InputWait {
    /// Create a wait handle together with the receiving half for the waiter
    pub fn channel() -> (Self, mpsc::Receiver<TextInput>) {
        let (sender, receiver) = mpsc::channel(1);
        let wait = Self {
            sender,
            cancel: CancellationToken::new(),
        };
        (wait, receiver)
    }

    /// Whether two handles refer to the same waiter
    pub fn same_wait(&self, other: &InputWait) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

/// One user's interactive state
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// The single message currently showing this session's menu
    pub menu_message_id: MessageId,
    pub activity: Activity,
    pub image_path: PathBuf,
    pub config: RenderConfig,
    /// Telegram language code of the user, if known
    pub language: Option<String>,
    /// Present only while `activity` is `AwaitingInput`
    pub input: Option<InputWait>,
    last_activity: Instant,
}

impl Session {
    pub fn new(
        user_id: UserId,
        chat_id: ChatId,
        menu_message_id: MessageId,
        image_path: PathBuf,
        config: RenderConfig,
        language: Option<String>,
    ) -> Self {
        Self {
            user_id,
            chat_id,
            menu_message_id,
            activity: Activity::Root,
            image_path,
            config,
            language,
            input: None,
            last_activity: Instant::now(),
        }
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.input.is_some()
    }

    /// Cancel the pending free-text wait, if any, and forget it
    pub fn release_input(&mut self) {
        if let Some(wait) = self.input.take() {
            wait.cancel.cancel();
        }
    }
}

/// Thread-safe registry of active sessions keyed by user
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
    timeout: Duration,
}

impl SessionStore {
    /// Create a store whose sessions expire after `timeout` of inactivity
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the session of `user_id`.
    ///
    /// With `is_new`, a previous session that is waiting for free-text input
    /// has its wait cancelled before the replacement is stored.
    pub fn set(&self, user_id: UserId, mut session: Session, is_new: bool) {
        session.last_activity = Instant::now();

        let mut sessions = self.lock();
        if is_new {
            if let Some(mut previous) = sessions.remove(&user_id) {
                if previous.is_waiting_for_input() {
                    debug!(user_id = %user_id, "Releasing input wait of replaced session");
                }
                previous.release_input();
            }
        }
        sessions.insert(user_id, session);
    }

    /// Return a copy of the session of `user_id`, refreshing its activity time
    pub fn get(&self, user_id: UserId) -> Option<Session> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&user_id)?;
        session.last_activity = Instant::now();
        Some(session.clone())
    }

    /// Apply `update` to the session of `user_id` if `condition` holds for it.
    ///
    /// The check and the write happen under one lock, so a session replaced
    /// in the meantime is never overwritten. Returns the updated copy.
    pub fn update_if<P, F>(&self, user_id: UserId, condition: P, update: F) -> Option<Session>
    where
        P: FnOnce(&Session) -> bool,
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&user_id).filter(|s| condition(&**s))?;
        update(&mut *session);
        session.last_activity = Instant::now();
        Some(session.clone())
    }

    /// Drop the session of `user_id`, releasing its wait
    pub fn remove(&self, user_id: UserId) -> Option<Session> {
        let mut removed = self.lock().remove(&user_id)?;
        removed.release_input();
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every session idle for longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.lock();
        let expired: Vec<UserId> = sessions
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.last_activity) > self.timeout)
            .map(|(id, _)| *id)
            .collect();

        for user_id in &expired {
            if let Some(mut session) = sessions.remove(user_id) {
                session.release_input();
                info!(user_id = %user_id, "Session expired");
            }
        }

        expired.len()
    }

    /// Run `sweep_expired` every `interval` until `shutdown` fires
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.sweep_expired();
                        if removed > 0 {
                            debug!(removed, remaining = store.len(), "Expiry sweep finished");
                        }
                    }
                }
            }
        })
    }
}
