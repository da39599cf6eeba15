//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::errors::BotError;
use crate::localization::t_lang;
use crate::menu::Activity;
use crate::render::{Generator, RenderConfig};
use crate::session::{Session, TextInput};
use crate::telegram::{ChatApi, IncomingMessage, Photo};

use super::ui_builder::{format_status, render_screen};
use super::App;

/// Smallest edge accepted when picking a photo resolution
pub const MIN_PHOTO_SIDE: u32 = 256;

/// Pick the smallest resolution with both sides at least [`MIN_PHOTO_SIDE`],
/// or the largest one available.
///
/// Telegram lists photo sizes from smallest to largest.
pub fn choose_photo(photos: &[Photo]) -> Option<&Photo> {
    photos
        .iter()
        .find(|p| p.width >= MIN_PHOTO_SIDE && p.height >= MIN_PHOTO_SIDE)
        .or_else(|| photos.last())
}

/// Check downloaded bytes against the formats the generator can read
pub fn is_supported_image(bytes: &[u8]) -> bool {
    match image::guess_format(bytes) {
        Ok(format) => matches!(
            format,
            image::ImageFormat::Png
                | image::ImageFormat::Jpeg
                | image::ImageFormat::Bmp
                | image::ImageFormat::Tiff
                | image::ImageFormat::WebP
        ),
        Err(_) => false,
    }
}

/// Download `photos` into the input cache, skipping files already present
pub async fn download_photo<C: ChatApi, G: Generator>(
    app: &App<C, G>,
    photos: &[Photo],
) -> Result<PathBuf, BotError> {
    let photo = choose_photo(photos)
        .ok_or_else(|| BotError::Download("message has no photo sizes".to_string()))?;

    let path = app.config.input_dir.join(format!("{}.jpg", photo.unique_id));
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Photo already cached");
        return Ok(path);
    }

    let bytes = app
        .client
        .download_file(&photo.file_id)
        .await
        .map_err(|e| BotError::Download(format!("couldn't download image: {e}")))?;

    if !is_supported_image(&bytes) {
        return Err(BotError::InvalidInput("unsupported image format".to_string()));
    }

    // Write through a temp file so concurrent readers never see a partial image
    let dir = app.config.input_dir.clone();
    let target = path.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut temp_file = NamedTempFile::new_in(&dir)?;
        temp_file.as_file_mut().write_all(&bytes)?;
        temp_file.persist(&target)?;
        Ok(())
    })
    .await
    .map_err(|e| BotError::Download(format!("couldn't save image: {e}")))?
    .map_err(|e| BotError::Download(format!("couldn't save image: {e}")))?;

    info!(path = %path.display(), "Photo saved");
    Ok(path)
}

async fn handle_photo_message<C: ChatApi, G: Generator>(app: &App<C, G>, msg: &IncomingMessage) -> Result<()> {
    let language = msg.language.as_deref();
    debug!(user_id = %msg.user_id, "Received photo message from user");

    // The previous menu dies with the session it belonged to
    if let Some(previous) = app.sessions.remove(msg.user_id) {
        if let Err(e) = app
            .client
            .delete_message(previous.chat_id, previous.menu_message_id)
            .await
        {
            warn!(user_id = %msg.user_id, error = %e, "Failed to delete previous menu");
        }
    }

    let image_path = match download_photo(app, &msg.photos).await {
        Ok(path) => path,
        Err(e) => {
            error!(user_id = %msg.user_id, error = %e, "Failed to prepare photo");
            let key = match e {
                BotError::InvalidInput(_) => "error-unsupported-format",
                _ => "error-generic",
            };
            app.client
                .send_message(msg.chat_id, &t_lang(key, language), None)
                .await?;
            return Ok(());
        }
    };

    let config = RenderConfig::new(app.config.workers);
    let (text, keyboard) = render_screen(Activity::Root, &config, language);
    let menu_message_id = app
        .client
        .send_message(msg.chat_id, &text, Some(keyboard))
        .await?;

    let session = Session::new(
        msg.user_id,
        msg.chat_id,
        menu_message_id,
        image_path,
        config,
        msg.language.clone(),
    );
    app.sessions.set(msg.user_id, session, true);
    info!(user_id = %msg.user_id, "Session started");

    Ok(())
}

async fn send_status<C: ChatApi, G: Generator>(app: &App<C, G>, msg: &IncomingMessage) -> Result<()> {
    let language = msg.language.as_deref();
    let operations = app.queue.operations(msg.user_id);

    if operations.is_empty() {
        app.client
            .send_message(msg.chat_id, &t_lang("status-empty", language), None)
            .await?;
        return Ok(());
    }

    for (operation, position) in operations {
        let status = format_status(&operation.config, position, language);
        app.client.send_message(msg.chat_id, &status, None).await?;
    }
    Ok(())
}

async fn handle_text_message<C: ChatApi, G: Generator>(
    app: &App<C, G>,
    msg: &IncomingMessage,
    text: &str,
) -> Result<()> {
    debug!(user_id = %msg.user_id, message_length = text.len(), "Received text message from user");

    // A pending input wait takes the text before any command handling
    let wait = app.sessions.get(msg.user_id).and_then(|s| s.input);
    if let Some(wait) = wait {
        let input = TextInput {
            message_id: msg.message_id,
            text: text.to_string(),
        };
        match wait.sender.send(input).await {
            Ok(()) => return Ok(()),
            Err(_) => debug!(user_id = %msg.user_id, "Input wait already finished"),
        }
    }

    match text.trim() {
        "/status" => send_status(app, msg).await,
        _ => {
            app.client
                .send_message(msg.chat_id, &t_lang("help-message", msg.language.as_deref()), None)
                .await?;
            Ok(())
        }
    }
}

pub async fn message_handler<C: ChatApi, G: Generator>(app: Arc<App<C, G>>, msg: IncomingMessage) -> Result<()> {
    if !msg.photos.is_empty() {
        handle_photo_message(&app, &msg).await?;
    } else if let Some(text) = msg.text.as_deref() {
        handle_text_message(&app, &msg, text).await?;
    } else {
        app.client
            .send_message(msg.chat_id, &t_lang("help-message", msg.language.as_deref()), None)
            .await?;
    }

    Ok(())
}
