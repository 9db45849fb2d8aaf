use std::fmt;

use crate::domain::cart::Cart;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnState {
    #[default]
    Idle,
    Processing,
}

/// Per-user conversational state. Lives for the lifetime of the process.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub cart: Cart,
    history: Vec<String>,
    pub state: TurnState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of everything checked out so far, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub(crate) fn extend_history<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.history.extend(names);
    }
}
