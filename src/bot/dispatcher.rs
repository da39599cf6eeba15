//! Dispatcher module: the update polling loop
//!
//! Updates are fetched in batches starting at one past the highest update id
//! seen. Every update is handled in its own task so a slow user never holds
//! up the others; the offset moves on once the whole batch is spawned.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::errors::BotError;
use crate::render::Generator;
use crate::telegram::{ChatApi, Update, UpdateKind};

use super::{callback_handler, message_handler, worker, App};

async fn dispatch_update<C: ChatApi, G: Generator>(app: Arc<App<C, G>>, update: Update) {
    let update_id = update.id;
    let result = match update.kind {
        UpdateKind::Message(msg) => {
            info!(
                user_id = %msg.user_id,
                first_name = %msg.first_name,
                has_photo = !msg.photos.is_empty(),
                text = msg.text.as_deref().unwrap_or(""),
                "Got message"
            );
            message_handler(app, msg).await
        }
        UpdateKind::Callback(q) => {
            info!(user_id = %q.user_id, first_name = %q.first_name, data = %q.data, "Got callback query");
            callback_handler(app, q).await
        }
        UpdateKind::Other => {
            debug!(update_id, "Ignoring update");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(update_id, error = %e, "Failed to handle update");
    }
}

/// Spawn a handler task per update in arrival order.
///
/// Returns the offset for the next fetch, or `None` for an empty batch.
pub fn dispatch_batch<C: ChatApi, G: Generator>(
    app: &Arc<App<C, G>>,
    updates: Vec<Update>,
) -> (Option<i32>, Vec<JoinHandle<()>>) {
    let next_offset = updates.iter().map(|u| u.id).max().map(|id| id + 1);
    let handles = updates
        .into_iter()
        .map(|update| tokio::spawn(dispatch_update(Arc::clone(app), update)))
        .collect();
    (next_offset, handles)
}

/// Run the bot until `shutdown` fires.
///
/// Starts the session sweeper and the queue worker, then polls updates.
/// Fetch errors are retried with backoff without moving the offset.
pub async fn run<C: ChatApi, G: Generator>(app: Arc<App<C, G>>, shutdown: CancellationToken) {
    let sweeper = app
        .sessions
        .spawn_sweeper(app.config.sweep_interval, shutdown.clone());
    // Not awaited on shutdown: an in-flight job cannot be interrupted
    let _worker = tokio::spawn(worker(Arc::clone(&app), shutdown.clone()));

    let mut backoff = Backoff::new(app.config.retry.clone());
    let mut offset = 0;
    info!("Dispatcher started");

    loop {
        let fetched = tokio::select! {
            _ = shutdown.cancelled() => break,
            fetched = app.client.fetch_updates(offset) => fetched,
        };

        match fetched {
            Ok(updates) => {
                backoff.reset();
                let (next_offset, _) = dispatch_batch(&app, updates);
                if let Some(next_offset) = next_offset {
                    offset = next_offset;
                }
            }
            Err(e) => {
                let e = BotError::from(e);
                let delay = backoff.next_delay();
                warn!(
                    error = %e,
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Failed to fetch updates"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    info!("Dispatcher stopped");
    if let Err(e) = sweeper.await {
        error!(error = %e, "Session sweeper panicked");
    }
}
