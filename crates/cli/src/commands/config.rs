use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::load_config;

pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match load_config(config_path.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = config_path.or_else(detect_config_path);
    let sources = SourceResolver {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path,
    };

    let bot_token = redact_token(config.telegram.bot_token.expose_secret());
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let speech_command = config.speech.command.as_deref().unwrap_or("<unset>");
    let synthesis_command = config.speech.synthesis_command.as_deref().unwrap_or("<unset>");

    let entries: [(&str, String, &str); 18] = [
        ("menu.path", config.menu.path.display().to_string(), "WAITER_MENU_PATH"),
        ("menu.display_limit", config.menu.display_limit.to_string(), "WAITER_MENU_DISPLAY_LIMIT"),
        ("telegram.bot_token", bot_token, "WAITER_TELEGRAM_BOT_TOKEN"),
        ("telegram.api_base_url", config.telegram.api_base_url.clone(), "WAITER_TELEGRAM_API_BASE_URL"),
        (
            "telegram.poll_timeout_secs",
            config.telegram.poll_timeout_secs.to_string(),
            "WAITER_TELEGRAM_POLL_TIMEOUT_SECS",
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), "WAITER_LLM_PROVIDER"),
        ("llm.model", config.llm.model.clone(), "WAITER_LLM_MODEL"),
        ("llm.base_url", config.llm.effective_base_url().to_string(), "WAITER_LLM_BASE_URL"),
        ("llm.api_key", llm_api_key.to_string(), "WAITER_LLM_API_KEY"),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), "WAITER_LLM_TIMEOUT_SECS"),
        ("llm.max_retries", config.llm.max_retries.to_string(), "WAITER_LLM_MAX_RETRIES"),
        ("speech.command", speech_command.to_string(), "WAITER_SPEECH_COMMAND"),
        (
            "speech.synthesis_command",
            synthesis_command.to_string(),
            "WAITER_SPEECH_SYNTHESIS_COMMAND",
        ),
        ("speech.timeout_secs", config.speech.timeout_secs.to_string(), "WAITER_SPEECH_TIMEOUT_SECS"),
        ("server.bind_address", config.server.bind_address.clone(), "WAITER_SERVER_BIND_ADDRESS"),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            "WAITER_SERVER_HEALTH_CHECK_PORT",
        ),
        ("logging.level", config.logging.level.clone(), "WAITER_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "WAITER_LOGGING_FORMAT"),
    ];

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    lines.extend(
        entries
            .iter()
            .map(|(key, value, env_key)| render_line(key, value, sources.source_of(key, env_key))),
    );
    lines.join("\n")
}

struct SourceResolver {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl SourceResolver {
    fn source_of(&self, key_path: &str, env_key: &str) -> String {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("waiter.toml"), PathBuf::from("config/waiter.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the public bot id, hides the secret half.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}
