use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use waiter_core::domain::cart::CartSnapshotItem;

use crate::llm::LlmClient;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Ти - офіціант піцерії. \
Зрозумій, що хоче клієнт. Якщо він замовляє страву, додай її НАЗВУ зі списку меню у `cart_update`. \
Якщо клієнт просить рахунок або чек, постав `action` у \"checkout\". \
Відповідай коротко і українською мовою.";

/// Everything the interpreter sees for one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    pub system_instruction: String,
    pub menu_names: Vec<String>,
    pub history: Vec<String>,
    pub cart: Vec<CartSnapshotItem>,
    pub utterance: String,
}

impl IntentRequest {
    pub fn new(
        menu_names: Vec<String>,
        history: Vec<String>,
        cart: Vec<CartSnapshotItem>,
        utterance: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_owned(),
            menu_names,
            history,
            cart,
            utterance: utterance.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("language model call failed: {0}")]
    Llm(String),
    #[error("language model returned an empty answer")]
    EmptyResponse,
    #[error("language model answer is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Turns an utterance plus conversation context into an untrusted,
/// loosely-shaped intent payload. Callers sanitize the result.
#[async_trait]
pub trait IntentInterpreter: Send + Sync {
    async fn interpret(&self, request: &IntentRequest) -> Result<Value, InterpreterError>;
}

pub struct LlmIntentInterpreter<C> {
    client: C,
}

impl<C> LlmIntentInterpreter<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> IntentInterpreter for LlmIntentInterpreter<C>
where
    C: LlmClient,
{
    async fn interpret(&self, request: &IntentRequest) -> Result<Value, InterpreterError> {
        let system_prompt = render_system_prompt(request);
        let raw = self
            .client
            .complete(&system_prompt, &request.utterance)
            .await
            .map_err(|error| InterpreterError::Llm(format!("{error:#}")))?;

        debug!(event_name = "interpreter.answer.raw", raw_len = raw.len(), "interpreter answered");
        parse_answer(&raw)
    }
}

pub fn render_system_prompt(request: &IntentRequest) -> String {
    let menu_names = to_json(&request.menu_names);
    let history = to_json(&request.history);
    let cart = to_json(&request.cart);

    format!(
        "{instruction}\n\n\
Ось повний список страв: {menu_names}\n\
Історія замовлень: {history}\n\
Кошик: {cart}\n\n\
Відповідай ТІЛЬКИ у форматі JSON:\n\
{{\"reply_text\": \"Відповідь українською\", \"cart_update\": [\"Назва страви\"], \"action\": \"continue\" або \"checkout\"}}",
        instruction = request.system_instruction,
    )
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_owned())
}

/// Extracts the JSON object from a raw model answer, tolerating reasoning
/// blocks and Markdown fences around it.
pub fn parse_answer(raw: &str) -> Result<Value, InterpreterError> {
    let without_reasoning = strip_reasoning(raw);
    let body = strip_code_fences(&without_reasoning);
    if body.is_empty() {
        return Err(InterpreterError::EmptyResponse);
    }

    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(error) => match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&body[start..=end]).map_err(InterpreterError::InvalidJson)
            }
            _ => Err(InterpreterError::InvalidJson(error)),
        },
    }
}

/// Removes `<think>...</think>` blocks. An unterminated block swallows the
/// rest of the answer.
pub fn strip_reasoning(raw: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        match rest[start + OPEN.len()..].find(CLOSE) {
            Some(end) => rest = &rest[start + OPEN.len() + end + CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    output.push_str(rest);
    output.trim().to_owned()
}

pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the info string, e.g. ```json
    let inner = match inner.find('\n') {
        Some(newline) => &inner[newline + 1..],
        None => inner,
    };
    inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}
