//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::localization::t_args_lang;
use crate::menu::{transition, Callback, Effect, InputField};
use crate::queue::Operation;
use crate::render::Generator;
use crate::session::{InputWait, Session};
use crate::telegram::{CallbackEvent, ChatApi};

use super::input_handler::await_input;
use super::ui_builder::render_screen;
use super::App;

/// Redraw the session's menu message for its current activity
pub async fn render_menu<C: ChatApi, G: Generator>(app: &App<C, G>, session: &Session) -> Result<()> {
    let (text, keyboard) = render_screen(session.activity, &session.config, session.language.as_deref());
    app.client
        .edit_message(session.chat_id, session.menu_message_id, &text, Some(keyboard))
        .await
}

async fn enqueue_operation<C: ChatApi, G: Generator>(app: &App<C, G>, session: Session) -> Result<()> {
    let operation = Operation {
        owner: session.user_id,
        chat_id: session.chat_id,
        image_path: session.image_path.clone(),
        config: session.config.clone(),
        language: session.language.clone(),
    };
    let position = app.queue.enqueue(operation);
    info!(user_id = %session.user_id, position, "Operation queued");

    app.sessions.set(session.user_id, session.clone(), false);

    let notice = t_args_lang(
        "queued-message",
        &[("position", &position.to_string())],
        session.language.as_deref(),
    );
    app.client.send_message(session.chat_id, &notice, None).await?;
    Ok(())
}

async fn start_input<C: ChatApi, G: Generator>(
    app: &Arc<App<C, G>>,
    mut session: Session,
    field: InputField,
) -> Result<()> {
    let (wait, receiver) = InputWait::channel();
    session.input = Some(wait.clone());

    // The waiter exists before the session becomes visible with its wait
    tokio::spawn(await_input(Arc::clone(app), session.user_id, field, wait, receiver));
    app.sessions.set(session.user_id, session.clone(), false);
    debug!(user_id = %session.user_id, field = ?field, "Waiting for typed value");

    render_menu(app, &session).await
}

async fn handle_callback<C: ChatApi, G: Generator>(app: &Arc<App<C, G>>, q: &CallbackEvent) -> Result<()> {
    let (Some(chat_id), Some(message_id)) = (q.chat_id, q.message_id) else {
        debug!(user_id = %q.user_id, "Callback without source message");
        return Ok(());
    };

    // Only the live menu of the current session may drive it
    let session = app
        .sessions
        .get(q.user_id)
        .filter(|s| s.menu_message_id == message_id);
    let Some(mut session) = session else {
        debug!(user_id = %q.user_id, message_id = %message_id.0, "Removing stale menu");
        if let Err(e) = app.client.delete_message(chat_id, message_id).await {
            warn!(user_id = %q.user_id, error = %e, "Failed to delete stale menu");
        }
        return Ok(());
    };

    let Some(callback) = Callback::parse(&q.data) else {
        debug!(user_id = %q.user_id, data = %q.data, "Ignoring unknown callback");
        return Ok(());
    };

    let Some(step) = transition(session.activity, &mut session.config, callback) else {
        debug!(user_id = %q.user_id, activity = ?session.activity, callback = ?callback, "Callback not valid here");
        return Ok(());
    };

    // Any accepted callback leaves a pending prompt
    session.release_input();
    session.activity = step.next;

    match step.effect {
        Effect::Render => {
            app.sessions.set(q.user_id, session.clone(), false);
            render_menu(app, &session).await
        }
        Effect::Enqueue => enqueue_operation(app, session).await,
        Effect::AwaitInput(field) => start_input(app, session, field).await,
    }
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler<C: ChatApi, G: Generator>(app: Arc<App<C, G>>, q: CallbackEvent) -> Result<()> {
    debug!(user_id = %q.user_id, data = %q.data, "Received callback query from user");

    let result = handle_callback(&app, &q).await;

    // Answer the callback query to remove the loading state
    if let Err(e) = app.client.answer_callback(&q.id, None).await {
        warn!(user_id = %q.user_id, error = %e, "Failed to answer callback query");
    }

    result
}
