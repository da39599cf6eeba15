//! Shared fixtures for integration tests: an in-memory chat client and a
//! generator that writes placeholder files.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId, UserId};

use primitive_bot::bot::App;
use primitive_bot::config::{BotConfig, RetryConfig};
use primitive_bot::render::{Generator, RenderConfig};
use primitive_bot::telegram::{CallbackEvent, ChatApi, IncomingMessage, Keyboard, Photo, Update};

/// Smallest byte string `image::guess_format` recognizes as PNG
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(i32),
    Send {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edit {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Answer(String),
    Download(String),
    Document {
        chat_id: ChatId,
        path: PathBuf,
    },
}

/// In-memory [`ChatApi`] recording every call
#[derive(Default)]
pub struct MockChat {
    calls: Mutex<Vec<Call>>,
    next_message_id: AtomicI32,
    files: Mutex<HashMap<String, Vec<u8>>>,
    updates: Mutex<VecDeque<Result<Vec<Update>, String>>>,
    fail_documents: AtomicBool,
    delete_delays: Mutex<HashMap<MessageId, Duration>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI32::new(1000),
            ..Self::default()
        }
    }

    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn push_updates(&self, batch: Result<Vec<Update>, String>) {
        self.updates.lock().unwrap().push_back(batch);
    }

    pub fn fail_documents(&self, fail: bool) {
        self.fail_documents.store(fail, Ordering::SeqCst);
    }

    /// Make deleting `message_id` take `delay`
    pub fn delay_delete(&self, message_id: MessageId, delay: Duration) {
        self.delete_delays.lock().unwrap().insert(message_id, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { message_id, text, .. } => Some((message_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    pub fn documents(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Document { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_offsets(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fetch(offset) => Some(offset),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn fetch_updates(&self, offset: i32) -> Result<Vec<Update>> {
        self.record(Call::Fetch(offset));
        let next = self.updates.lock().unwrap().pop_front();
        match next {
            Some(Ok(updates)) => Ok(updates),
            Some(Err(e)) => Err(anyhow!(e)),
            None => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(vec![])
            }
        }
    }

    async fn send_message(&self, chat_id: ChatId, text: &str, keyboard: Option<Keyboard>) -> Result<MessageId> {
        let message_id = MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        self.record(Call::Send {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        self.record(Call::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        let delay = self.delete_delays.lock().unwrap().get(&message_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(Call::Delete { chat_id, message_id });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, _text: Option<&str>) -> Result<()> {
        self.record(Call::Answer(callback_id.to_string()));
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.record(Call::Download(file_id.to_string()));
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| anyhow!("file not found: {file_id}"))
    }

    async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(anyhow!("upload rejected"));
        }
        self.record(Call::Document {
            chat_id,
            path: path.to_path_buf(),
        });
        Ok(())
    }
}

/// A latch the fake generator blocks on until opened
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }
}

/// Generator writing a placeholder artifact, with optional failures and gate
#[derive(Default)]
pub struct FakeGenerator {
    pub runs: Mutex<Vec<PathBuf>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    fail_on: Mutex<HashSet<PathBuf>>,
    gate: Option<Arc<Gate>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, input: &Path) {
        self.fail_on.lock().unwrap().insert(input.to_path_buf());
    }

    pub fn runs(&self) -> Vec<PathBuf> {
        self.runs.lock().unwrap().clone()
    }
}

impl Generator for FakeGenerator {
    fn create(&self, input: &Path, output: &Path, _config: &RenderConfig) -> Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.wait();
        }
        self.runs.lock().unwrap().push(input.to_path_buf());

        let result = if self.fail_on.lock().unwrap().contains(input) {
            Err(anyhow!("generator crashed"))
        } else {
            std::fs::write(output, b"artifact").map_err(Into::into)
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub type TestApp = Arc<App<MockChat, FakeGenerator>>;

pub fn test_config(dir: &Path) -> BotConfig {
    let input_dir = dir.join("inputs");
    let output_dir = dir.join("outputs");
    std::fs::create_dir_all(&input_dir).unwrap();
    std::fs::create_dir_all(&output_dir).unwrap();

    BotConfig {
        token: "test-token".to_string(),
        input_dir,
        output_dir,
        primitive_binary: PathBuf::from("primitive"),
        workers: 2,
        session_timeout: Duration::from_secs(60),
        sweep_interval: Duration::from_secs(5),
        poll_timeout_secs: 1,
        retry: RetryConfig {
            base_delay_ms: 10,
            max_delay_ms: 50,
            jitter_ms: 0,
        },
    }
}

pub fn test_app(dir: &Path, generator: FakeGenerator) -> TestApp {
    App::new(MockChat::new(), generator, test_config(dir))
}

pub fn photo_message(user: u64, message_id: i32, unique_id: &str) -> IncomingMessage {
    IncomingMessage {
        message_id: MessageId(message_id),
        chat_id: ChatId(user as i64),
        user_id: UserId(user),
        first_name: "Tester".to_string(),
        language: Some("en".to_string()),
        text: None,
        photos: vec![
            Photo {
                file_id: format!("{unique_id}-small"),
                unique_id: format!("{unique_id}-small"),
                width: 90,
                height: 90,
            },
            Photo {
                file_id: format!("{unique_id}-file"),
                unique_id: unique_id.to_string(),
                width: 320,
                height: 320,
            },
        ],
    }
}

pub fn text_message(user: u64, message_id: i32, text: &str) -> IncomingMessage {
    IncomingMessage {
        message_id: MessageId(message_id),
        chat_id: ChatId(user as i64),
        user_id: UserId(user),
        first_name: "Tester".to_string(),
        language: Some("en".to_string()),
        text: Some(text.to_string()),
        photos: vec![],
    }
}

pub fn callback(user: u64, message_id: MessageId, data: &str) -> CallbackEvent {
    CallbackEvent {
        id: format!("cb-{user}-{data}"),
        user_id: UserId(user),
        first_name: "Tester".to_string(),
        language: Some("en".to_string()),
        chat_id: Some(ChatId(user as i64)),
        message_id: Some(message_id),
        data: data.to_string(),
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Await `future` with a generous deadline
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation timed out")
}
