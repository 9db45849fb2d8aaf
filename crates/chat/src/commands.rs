use crate::events::ChatEvent;

pub const MENU_BUTTON: &str = "📜 Меню";
pub const CHECKOUT_BUTTON: &str = "💰 Розрахувати чек";
pub const CLEAR_BUTTON: &str = "🗑 Очистити кошик";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotCommand {
    Menu,
    Checkout,
    Clear,
    Help,
}

impl BotCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Checkout => "checkout",
            Self::Clear => "clear",
            Self::Help => "help",
        }
    }
}

/// Maps an incoming text message to a chat event. Slash commands may carry a
/// `@botname` suffix and trailing arguments; keyboard captions must match
/// exactly (after trimming). Anything else is free text for the interpreter.
pub fn classify(text: &str) -> ChatEvent {
    let trimmed = text.trim();

    match trimmed {
        MENU_BUTTON => return ChatEvent::Command(BotCommand::Menu),
        CHECKOUT_BUTTON => return ChatEvent::Command(BotCommand::Checkout),
        CLEAR_BUTTON => return ChatEvent::Command(BotCommand::Clear),
        _ => {}
    }

    if let Some(command) = trimmed.strip_prefix('/') {
        let name = command.split_whitespace().next().unwrap_or_default();
        let name = name.split('@').next().unwrap_or_default().to_ascii_lowercase();
        match name.as_str() {
            "start" => return ChatEvent::Start,
            "menu" => return ChatEvent::Command(BotCommand::Menu),
            "checkout" => return ChatEvent::Command(BotCommand::Checkout),
            "clear" => return ChatEvent::Command(BotCommand::Clear),
            "help" => return ChatEvent::Command(BotCommand::Help),
            _ => {}
        }
    }

    ChatEvent::Text(text.to_owned())
}
