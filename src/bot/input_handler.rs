//! Input Handler module for typed setting values
//!
//! A waiter is spawned when the user asks to type a value. It receives the
//! user's next text messages through the session's input channel until one
//! parses and fits the field's range, the wait is cancelled, or the session
//! timeout passes without input.
//!
//! The waiter only ever writes to the session that still holds its own
//! wait handle. A session replaced while a value is being handled is left
//! untouched.

use anyhow::Result;
use std::sync::Arc;
use teloxide::types::UserId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::menu::{Activity, InputField};
use crate::render::Generator;
use crate::session::{InputWait, Session, TextInput};
use crate::telegram::ChatApi;

use super::callback_handler::render_menu;
use super::ui_builder::{input_keyboard, invalid_input_prompt};
use super::App;

/// Outcome of feeding one text message to a waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Value stored, wait finished
    Applied(u32),
    /// Value rejected, user prompted again
    Rejected,
    /// Session gone or no longer waiting for this field
    Abandoned,
}

/// Whether `session` is still waiting on `wait` for `field`
fn owns_wait(session: &Session, field: InputField, wait: &InputWait) -> bool {
    session.activity == Activity::AwaitingInput(field)
        && session.input.as_ref().is_some_and(|w| w.same_wait(wait))
}

/// Validate `input` and apply it to the session of `user_id`
pub async fn handle_input<C: ChatApi, G: Generator>(
    app: &App<C, G>,
    user_id: UserId,
    field: InputField,
    input: &TextInput,
    wait: &InputWait,
) -> Result<InputOutcome> {
    if wait.cancel.is_cancelled() {
        return Ok(InputOutcome::Abandoned);
    }

    let (session, outcome) = match field.parse(&input.text) {
        Ok(value) => {
            let updated = app.sessions.update_if(
                user_id,
                |s| owns_wait(s, field, wait),
                |s| {
                    field.apply(&mut s.config, value);
                    s.activity = Activity::Settings;
                    s.release_input();
                },
            );
            let Some(session) = updated else {
                return Ok(InputOutcome::Abandoned);
            };
            info!(user_id = %user_id, field = ?field, value, "Typed value applied");

            render_menu(app, &session).await?;
            (session, InputOutcome::Applied(value))
        }
        Err(reason) => {
            let session = app
                .sessions
                .get(user_id)
                .filter(|s| owns_wait(s, field, wait));
            let Some(session) = session else {
                return Ok(InputOutcome::Abandoned);
            };
            debug!(user_id = %user_id, field = ?field, reason = ?reason, "Typed value rejected");

            let language = session.language.as_deref();
            app.client
                .edit_message(
                    session.chat_id,
                    session.menu_message_id,
                    &invalid_input_prompt(field, &input.text, language),
                    Some(input_keyboard(field, language)),
                )
                .await?;
            (session, InputOutcome::Rejected)
        }
    };

    // Typed values are consumed; the menu message shows the result
    if let Err(e) = app.client.delete_message(session.chat_id, input.message_id).await {
        debug!(user_id = %user_id, error = %e, "Failed to delete typed input");
    }

    Ok(outcome)
}

/// Return an idle session to the picker it asked for input from
async fn expire_wait<C: ChatApi, G: Generator>(
    app: &App<C, G>,
    user_id: UserId,
    field: InputField,
    wait: &InputWait,
) {
    let updated = app.sessions.update_if(
        user_id,
        |s| owns_wait(s, field, wait),
        |s| {
            s.release_input();
            s.activity = field.picker();
        },
    );
    wait.cancel.cancel();

    if let Some(session) = updated {
        if let Err(e) = render_menu(app, &session).await {
            warn!(user_id = %user_id, error = %e, "Failed to redraw menu after input timeout");
        }
    }
}

/// Wait for typed values until one is applied or the wait ends
pub async fn await_input<C: ChatApi, G: Generator>(
    app: Arc<App<C, G>>,
    user_id: UserId,
    field: InputField,
    wait: InputWait,
    mut receiver: mpsc::Receiver<TextInput>,
) {
    let idle_limit = app.sessions.timeout();

    loop {
        let input = tokio::select! {
            _ = wait.cancel.cancelled() => {
                debug!(user_id = %user_id, "Input wait cancelled");
                return;
            }
            _ = tokio::time::sleep(idle_limit) => {
                debug!(user_id = %user_id, "Input wait timed out");
                expire_wait(&app, user_id, field, &wait).await;
                return;
            }
            input = receiver.recv() => match input {
                Some(input) => input,
                None => return,
            },
        };

        match handle_input(&app, user_id, field, &input, &wait).await {
            Ok(InputOutcome::Rejected) => continue,
            Ok(InputOutcome::Applied(_)) | Ok(InputOutcome::Abandoned) => return,
            Err(e) => {
                // The value may already be stored; keep listening only if not
                warn!(user_id = %user_id, error = %e, "Failed to process typed value");
                let still_waiting = app
                    .sessions
                    .get(user_id)
                    .is_some_and(|s| owns_wait(&s, field, &wait));
                if !still_waiting {
                    return;
                }
            }
        }
    }
}
