use serde::Serialize;

use crate::commands::{CHECKOUT_BUTTON, CLEAR_BUTTON, MENU_BUTTON};

pub const INPUT_PLACEHOLDER: &str = "Натисніть кнопку або скажіть замовлення...";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

impl KeyboardButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Telegram `ReplyKeyboardMarkup`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboard {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_field_placeholder: Option<String>,
}

#[derive(Default)]
pub struct KeyboardBuilder {
    rows: Vec<Vec<KeyboardButton>>,
    placeholder: Option<String>,
}

impl KeyboardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut RowBuilder),
    {
        let mut builder = RowBuilder::default();
        build(&mut builder);
        if !builder.buttons.is_empty() {
            self.rows.push(builder.buttons);
        }
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn build(self) -> ReplyKeyboard {
        ReplyKeyboard {
            keyboard: self.rows,
            resize_keyboard: true,
            input_field_placeholder: self.placeholder,
        }
    }
}

#[derive(Default)]
pub struct RowBuilder {
    buttons: Vec<KeyboardButton>,
}

impl RowBuilder {
    pub fn button(&mut self, text: impl Into<String>) -> &mut Self {
        self.buttons.push(KeyboardButton::new(text));
        self
    }
}

pub fn main_keyboard() -> ReplyKeyboard {
    KeyboardBuilder::new()
        .row(|row| {
            row.button(MENU_BUTTON).button(CHECKOUT_BUTTON);
        })
        .row(|row| {
            row.button(CLEAR_BUTTON);
        })
        .placeholder(INPUT_PLACEHOLDER)
        .build()
}

/// One message to deliver to a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into(), keyboard: None }
    }

    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}
