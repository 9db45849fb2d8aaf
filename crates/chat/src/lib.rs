//! Chat surface for the order bot.
//!
//! - **Polling** (`polling`) - update loop with reconnect backoff
//! - **Telegram** (`telegram`) - Bot API transport over long polling
//! - **Events** (`events`) - envelopes and the `OrderBot` dispatcher
//! - **Commands** (`commands`) - slash commands and keyboard captions
//! - **Keyboard** (`keyboard`) - reply keyboard and outbound messages
//!
//! ```text
//! Telegram → PollingRunner → OrderBot → TurnScheduler → ConversationController
//!                               ↓
//!                          ChatOutbox ← TurnReply
//! ```

pub mod commands;
pub mod events;
pub mod keyboard;
pub mod polling;
pub mod telegram;

pub use commands::{classify, BotCommand};
pub use events::{
    ChatEnvelope, ChatEvent, ChatOutbox, DispatchError, DispatchOutcome, EventContext, OrderBot,
    UpdateHandler,
};
pub use keyboard::{main_keyboard, OutboundMessage, ReplyKeyboard};
pub use polling::{ChatTransport, PollingRunner, ReconnectPolicy, TransportError};
pub use telegram::TelegramTransport;
