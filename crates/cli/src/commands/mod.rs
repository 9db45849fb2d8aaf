pub mod chat;
pub mod config;
pub mod doctor;
pub mod import;
pub mod menu;

use std::path::PathBuf;

use serde::Serialize;
use waiter_core::config::{AppConfig, ConfigError, LoadOptions};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_MENU: u8 = 3;
pub const EXIT_IO: u8 = 4;
pub const EXIT_RUNTIME: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn plain(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }
}

pub(crate) fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let require_file = config_path.is_some();
    AppConfig::load(LoadOptions { config_path, require_file, ..LoadOptions::default() })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
