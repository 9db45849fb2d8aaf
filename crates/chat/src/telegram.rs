use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use waiter_core::config::TelegramConfig;

use crate::commands::classify;
use crate::events::{ChatEnvelope, ChatEvent, ChatOutbox};
use crate::keyboard::{OutboundMessage, ReplyKeyboard};
use crate::polling::{ChatTransport, TransportError};

/// Telegram caps message text at 4096 characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Bot API client using long polling.
pub struct TelegramTransport {
    http: reqwest::Client,
    api_base_url: String,
    token: SecretString,
    poll_timeout_secs: u64,
    state: Mutex<PollState>,
}

#[derive(Default)]
struct PollState {
    offset: i64,
    pending: VecDeque<ChatEnvelope>,
}

impl TelegramTransport {
    pub fn new(
        http: reqwest::Client,
        api_base_url: impl Into<String>,
        token: SecretString,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            token,
            poll_timeout_secs,
            state: Mutex::new(PollState::default()),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self, TransportError> {
        // the long poll itself must fit inside the request timeout
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        Ok(Self::new(
            http,
            config.api_base_url.clone(),
            config.bot_token.clone(),
            config.poll_timeout_secs,
        ))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, self.token.expose_secret())
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base_url, self.token.expose_secret())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, String>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            // reqwest errors embed the url, which carries the token
            .map_err(|error| format!("{method} request failed: {}", error.without_url()))?;

        read_result(method, response).await
    }

    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &request).await.map_err(TransportError::Receive)
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let me: BotUser = self
            .call("getMe", &serde_json::json!({}))
            .await
            .map_err(TransportError::Connect)?;
        // polling and webhooks are mutually exclusive
        let _: bool = self
            .call("deleteWebhook", &serde_json::json!({"drop_pending_updates": false}))
            .await
            .map_err(TransportError::Connect)?;

        info!(
            event_name = "transport.telegram.connected",
            bot_id = me.id,
            bot_username = me.username.as_deref().unwrap_or("unknown"),
            "telegram bot authenticated"
        );
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let mut state = self.state.lock().await;
        loop {
            if let Some(envelope) = state.pending.pop_front() {
                return Ok(Some(envelope));
            }

            let updates = self.fetch_updates(state.offset).await?;
            debug!(
                event_name = "transport.telegram.polled",
                offset = state.offset,
                updates = updates.len(),
                "long poll returned"
            );

            for update in updates {
                let update_id = update.update_id;
                match envelope_from_update(update) {
                    Some(envelope) => state.pending.push_back(envelope),
                    // nothing to dispatch; skip it on the next poll
                    None => state.offset = state.offset.max(update_id + 1),
                }
            }
        }
    }

    async fn acknowledge(&self, update_id: i64) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.offset = state.offset.max(update_id + 1);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.pending.clear();
        Ok(())
    }
}

#[async_trait]
impl ChatOutbox for TelegramTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let chunks = split_message(&message.text, MAX_MESSAGE_CHARS);
        if chunks.is_empty() {
            debug!(
                event_name = "transport.telegram.blank_skipped",
                chat_id = message.chat_id,
                "blank message not sent"
            );
        }
        for chunk in chunks {
            let request = SendMessageRequest {
                chat_id: message.chat_id,
                text: chunk,
                reply_markup: message.keyboard.as_ref(),
            };
            let _: serde_json::Value =
                self.call("sendMessage", &request).await.map_err(TransportError::Send)?;
        }
        Ok(())
    }

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let file: TelegramFile = self
            .call("getFile", &serde_json::json!({"file_id": file_id}))
            .await
            .map_err(TransportError::Download)?;
        let file_path = file
            .file_path
            .ok_or_else(|| TransportError::Download(format!("file `{file_id}` has no path")))?;

        let response = self
            .http
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|error| TransportError::Download(error.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Download(format!(
                "file download returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| TransportError::Download(error.without_url().to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn send_voice(&self, chat_id: i64, audio: &[u8]) -> Result<(), TransportError> {
        let voice = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("reply.ogg")
            .mime_str("audio/ogg")
            .map_err(|error| TransportError::Send(error.without_url().to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("voice", voice);

        let response = self
            .http
            .post(self.method_url("sendVoice"))
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                TransportError::Send(format!("sendVoice request failed: {}", error.without_url()))
            })?;
        let _: serde_json::Value =
            read_result("sendVoice", response).await.map_err(TransportError::Send)?;

        debug!(
            event_name = "transport.telegram.voice_sent",
            chat_id,
            audio_bytes = audio.len(),
            "voice reply uploaded"
        );
        Ok(())
    }
}

async fn read_result<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, String> {
    let status = response.status();
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .map_err(|error| format!("{method} returned unreadable body ({status}): {}", error.without_url()))?;

    match (envelope.ok, envelope.result) {
        (true, Some(result)) => Ok(result),
        _ => Err(format!(
            "{method} rejected ({status}): {}",
            envelope.description.unwrap_or_else(|| "no description".to_owned())
        )),
    }
}

/// Converts a raw update into an envelope. Updates without a message or a
/// sender (channel posts, edits) yield `None`.
pub fn envelope_from_update(update: Update) -> Option<ChatEnvelope> {
    let message = update.message?;
    let user_id = message.from?.id;

    let event = if let Some(voice) = message.voice {
        ChatEvent::Voice { file_id: voice.file_id }
    } else if let Some(text) = message.text {
        classify(&text)
    } else {
        ChatEvent::Unsupported { kind: "non_text".to_owned() }
    };

    Some(ChatEnvelope { update_id: update.update_id, chat_id: message.chat.id, user_id, event })
}

/// Splits `text` into chunks of at most `max_chars` characters, preferring
/// line boundaries. Whitespace-only chunks are dropped since Telegram rejects
/// them.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars = line.chars().collect::<Vec<_>>();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    id: i64,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<Sender>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<Voice>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Voice {
    pub file_id: String,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyKeyboard>,
}
