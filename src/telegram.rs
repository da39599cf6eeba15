//! # Chat Platform Module
//!
//! The narrow slice of the Telegram Bot API the bot needs, expressed as the
//! [`ChatApi`] trait over plain event types. [`TelegramClient`] implements it
//! with teloxide; tests substitute an in-memory client.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, UpdateKind as TgUpdateKind,
};
use tracing::debug;

/// One inline keyboard button: label and callback token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl ToString) -> Self {
        Self {
            text: text.into(),
            data: data.to_string(),
        }
    }
}

/// Rows of inline buttons
pub type Keyboard = Vec<Vec<Button>>;

/// One resolution of an uploaded photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub file_id: String,
    /// Stable across bots and re-uploads; used as the cache key
    pub unique_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub first_name: String,
    pub language: Option<String>,
    pub text: Option<String>,
    /// Empty unless the message carries a photo
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEvent {
    pub id: String,
    pub user_id: UserId,
    pub first_name: String,
    pub language: Option<String>,
    /// Chat and message the pressed button belongs to
    pub chat_id: Option<ChatId>,
    pub message_id: Option<MessageId>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    Message(IncomingMessage),
    Callback(CallbackEvent),
    /// Anything the bot does not react to
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: i32,
    pub kind: UpdateKind,
}

/// Chat platform operations used by the bot
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    /// Long-poll for updates with id `>= offset`
    async fn fetch_updates(&self, offset: i32) -> Result<Vec<Update>>;

    async fn send_message(&self, chat_id: ChatId, text: &str, keyboard: Option<Keyboard>) -> Result<MessageId>;

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<()>;
}

/// [`ChatApi`] backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
    poll_timeout_secs: u32,
}

impl TelegramClient {
    pub fn new(bot: Bot, poll_timeout_secs: u32) -> Self {
        Self {
            bot,
            poll_timeout_secs,
        }
    }
}

fn to_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.into_iter().map(|row| {
        row.into_iter()
            .map(|b| InlineKeyboardButton::callback(b.text, b.data))
            .collect::<Vec<_>>()
    }))
}

fn convert_update(update: teloxide::types::Update) -> Update {
    let id = update.id.0 as i32;
    let kind = match update.kind {
        TgUpdateKind::Message(msg) => match msg.from.as_ref() {
            Some(from) => UpdateKind::Message(IncomingMessage {
                message_id: msg.id,
                chat_id: msg.chat.id,
                user_id: from.id,
                first_name: from.first_name.clone(),
                language: from.language_code.clone(),
                text: msg.text().map(str::to_owned),
                photos: msg
                    .photo()
                    .map(|sizes| {
                        sizes
                            .iter()
                            .map(|p| Photo {
                                file_id: p.file.id.0.clone(),
                                unique_id: p.file.unique_id.0.clone(),
                                width: p.width,
                                height: p.height,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            None => UpdateKind::Other,
        },
        TgUpdateKind::CallbackQuery(q) => UpdateKind::Callback(CallbackEvent {
            id: q.id.0,
            user_id: q.from.id,
            first_name: q.from.first_name.clone(),
            language: q.from.language_code.clone(),
            chat_id: q.message.as_ref().map(|m| m.chat().id),
            message_id: q.message.as_ref().map(|m| m.id()),
            data: q.data.unwrap_or_default(),
        }),
        _ => UpdateKind::Other,
    };

    Update { id, kind }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn fetch_updates(&self, offset: i32) -> Result<Vec<Update>> {
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(self.poll_timeout_secs)
            .await?;
        Ok(updates.into_iter().map(convert_update).collect())
    }

    async fn send_message(&self, chat_id: ChatId, text: &str, keyboard: Option<Keyboard>) -> Result<MessageId> {
        let mut request = self.bot.send_message(chat_id, text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        Ok(request.await?.id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let mut request = self.bot.edit_message_text(chat_id, message_id, text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        request.await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let response = reqwest::get(&url).await?.error_for_status()?;
        let bytes = response.bytes().await.context("reading file body")?;
        debug!(file_id, size = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }

    async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        self.bot
            .send_document(chat_id, InputFile::file(path.to_path_buf()))
            .await?;
        Ok(())
    }
}
