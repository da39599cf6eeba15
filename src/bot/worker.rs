//! Worker module draining the work queue
//!
//! Exactly one worker runs per bot. It peeks the front job, renders it on a
//! blocking thread, sends the artifact and only then dequeues the job, so
//! the job stays visible to `/status` while it is processed.
//!
//! A failed job is reported to its chat and dropped; the worker moves on to
//! the next one instead of stopping.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::BotError;
use crate::localization::t_lang;
use crate::queue::Operation;
use crate::render::Generator;
use crate::telegram::ChatApi;

use super::App;

/// Deterministic artifact path: `{output_dir}/{chat_id}_{unix_ts}.{ext}`
pub fn output_path<C, G>(app: &App<C, G>, operation: &Operation, timestamp: i64) -> PathBuf {
    app.config.output_dir.join(format!(
        "{}_{}.{}",
        operation.chat_id, timestamp, operation.config.extension
    ))
}

/// Render one job and deliver the artifact
pub async fn process_operation<C: ChatApi, G: Generator>(
    app: &App<C, G>,
    operation: &Operation,
) -> Result<PathBuf, BotError> {
    let started = Instant::now();
    let output = output_path(app, operation, Utc::now().timestamp());
    let config = &operation.config;
    info!(
        chat_id = %operation.chat_id,
        input = %operation.image_path.display(),
        iterations = config.iterations,
        shape = config.shape.code(),
        alpha = config.alpha,
        repeat = config.repeat,
        size = config.output_size,
        extension = %config.extension,
        "Creating image"
    );

    let generator = Arc::clone(&app.generator);
    let input = operation.image_path.clone();
    let target = output.clone();
    let snapshot = config.clone();
    tokio::task::spawn_blocking(move || generator.create(&input, &target, &snapshot))
        .await
        .map_err(|e| BotError::Generation(format!("generator task failed: {e}")))?
        .map_err(|e| BotError::Generation(format!("{e:#}")))?;

    info!(
        chat_id = %operation.chat_id,
        output = %output.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Finished creating image"
    );

    app.client
        .send_document(operation.chat_id, &output)
        .await
        .map_err(|e| BotError::Delivery(e.to_string()))?;
    info!(chat_id = %operation.chat_id, output = %output.display(), "Sent result");

    Ok(output)
}

/// Drain the queue until `shutdown` fires
pub async fn worker<C: ChatApi, G: Generator>(app: Arc<App<C, G>>, shutdown: CancellationToken) {
    info!("Worker started");

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let Some(operation) = app.queue.peek() else {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = app.queue.wait_for_work() => continue,
            }
        };

        if let Err(e) = process_operation(&app, &operation).await {
            error!(
                chat_id = %operation.chat_id,
                user_id = %operation.owner,
                error = %e,
                "Failed to process operation"
            );
            if e.is_user_facing() {
                let notice = t_lang("error-generic", operation.language.as_deref());
                if let Err(e) = app.client.send_message(operation.chat_id, &notice, None).await {
                    error!(chat_id = %operation.chat_id, error = %e, "Failed to send failure notice");
                }
            }
        }

        app.queue.dequeue();
    }

    info!("Worker stopped");
}
