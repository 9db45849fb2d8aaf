use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub menu: MenuConfig,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct MenuConfig {
    pub path: PathBuf,
    pub display_limit: usize,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    /// External recognizer binary; voice messages are declined when unset.
    pub command: Option<String>,
    /// Arguments passed to `command`; `{input}` is replaced with the audio file path.
    pub args: Vec<String>,
    /// External synthesizer; reads the reply text on stdin and writes audio to
    /// `{output}`. Voice turns are answered with text only when unset.
    pub synthesis_command: Option<String>,
    pub synthesis_args: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Groq,
    Ollama,
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAi | Self::Groq)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub menu_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub speech_command: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            menu: MenuConfig { path: PathBuf::from("products.json"), display_limit: 30 },
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                poll_timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "gemma2:2b".to_string(),
                timeout_secs: 60,
                max_retries: 1,
            },
            speech: SpeechConfig {
                command: None,
                args: vec!["{input}".to_string()],
                synthesis_command: None,
                synthesis_args: vec!["{output}".to_string()],
                timeout_secs: 60,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|groq|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("waiter.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(menu) = patch.menu {
            if let Some(path) = menu.path {
                self.menu.path = path;
            }
            if let Some(display_limit) = menu.display_limit {
                self.menu.display_limit = display_limit;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(speech) = patch.speech {
            if let Some(command) = speech.command {
                self.speech.command = Some(command);
            }
            if let Some(args) = speech.args {
                self.speech.args = args;
            }
            if let Some(command) = speech.synthesis_command {
                self.speech.synthesis_command = Some(command);
            }
            if let Some(args) = speech.synthesis_args {
                self.speech.synthesis_args = args;
            }
            if let Some(timeout_secs) = speech.timeout_secs {
                self.speech.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("WAITER_MENU_PATH") {
            self.menu.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("WAITER_MENU_DISPLAY_LIMIT") {
            self.menu.display_limit = parse_usize("WAITER_MENU_DISPLAY_LIMIT", &value)?;
        }

        if let Some(value) = read_env("WAITER_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("WAITER_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("WAITER_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs =
                parse_u64("WAITER_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WAITER_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("WAITER_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("WAITER_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("WAITER_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("WAITER_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("WAITER_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("WAITER_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("WAITER_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("WAITER_SPEECH_COMMAND") {
            self.speech.command = Some(value);
        }
        if let Some(value) = read_env("WAITER_SPEECH_SYNTHESIS_COMMAND") {
            self.speech.synthesis_command = Some(value);
        }
        if let Some(value) = read_env("WAITER_SPEECH_TIMEOUT_SECS") {
            self.speech.timeout_secs = parse_u64("WAITER_SPEECH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WAITER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("WAITER_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("WAITER_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("WAITER_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("WAITER_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("WAITER_LOGGING_LEVEL").or_else(|| read_env("WAITER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WAITER_LOGGING_FORMAT").or_else(|| read_env("WAITER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(menu_path) = overrides.menu_path {
            self.menu.path = menu_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(telegram_bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = secret_value(telegram_bot_token);
        }
        if let Some(speech_command) = overrides.speech_command {
            self.speech.command = Some(speech_command);
        }
    }

    /// Validates everything the order-taking engine needs. Transport
    /// credentials are checked separately by [`AppConfig::validate_transport`]
    /// so that offline tooling works without a bot token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_menu(&self.menu)?;
        validate_llm(&self.llm)?;
        validate_speech(&self.speech)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    pub fn validate_transport(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("waiter.toml"), PathBuf::from("config/waiter.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_menu(menu: &MenuConfig) -> Result<(), ConfigError> {
    if menu.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("menu.path must not be empty".to_string()));
    }

    if menu.display_limit == 0 {
        return Err(ConfigError::Validation(
            "menu.display_limit must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Create a bot with @BotFather and copy the HTTP API token".to_string(),
        ));
    }

    let well_formed = bot_token
        .split_once(':')
        .map(|(bot_id, secret)| {
            !bot_id.is_empty() && bot_id.bytes().all(|byte| byte.is_ascii_digit()) && !secret.is_empty()
        })
        .unwrap_or(false);
    if !well_formed {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    if !telegram.api_base_url.starts_with("http://") && !telegram.api_base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.poll_timeout_secs == 0 || telegram.poll_timeout_secs > 50 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 1..=50".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for openai/groq providers".to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_speech(speech: &SpeechConfig) -> Result<(), ConfigError> {
    if let Some(command) = &speech.command {
        if command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "speech.command must not be blank when set".to_string(),
            ));
        }
    }

    if let Some(command) = &speech.synthesis_command {
        if command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "speech.synthesis_command must not be blank when set".to_string(),
            ));
        }
    }

    if speech.timeout_secs == 0 || speech.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "speech.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    menu: Option<MenuPatch>,
    telegram: Option<TelegramPatch>,
    llm: Option<LlmPatch>,
    speech: Option<SpeechPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MenuPatch {
    path: Option<PathBuf>,
    display_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechPatch {
    command: Option<String>,
    args: Option<Vec<String>>,
    synthesis_command: Option<String>,
    synthesis_args: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_WAITER_BOT_TOKEN", "123456:from-env");
        env::set_var("TEST_WAITER_GROQ_KEY", "gsk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("waiter.toml");
            fs::write(
                &path,
                r#"
[telegram]
bot_token = "${TEST_WAITER_BOT_TOKEN}"

[llm]
provider = "groq"
api_key = "${TEST_WAITER_GROQ_KEY}"
model = "openai/gpt-oss-20b"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.telegram.bot_token.expose_secret() == "123456:from-env",
                "bot token should be loaded from environment",
            )?;
            ensure(config.llm.provider == LlmProvider::Groq, "provider should come from file")?;
            ensure(
                config.llm.effective_base_url() == "https://api.groq.com/openai/v1",
                "groq provider should default to the groq endpoint",
            )?;
            ensure(config.validate_transport().is_ok(), "interpolated token should validate")?;
            Ok(())
        })();

        clear_vars(&["TEST_WAITER_BOT_TOKEN", "TEST_WAITER_GROQ_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WAITER_LOG_LEVEL", "warn");
        env::set_var("WAITER_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["WAITER_LOG_LEVEL", "WAITER_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WAITER_MENU_PATH", "from-env.json");
        env::set_var("WAITER_MENU_DISPLAY_LIMIT", "12");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("waiter.toml");
            fs::write(
                &path,
                r#"
[menu]
path = "from-file.json"
display_limit = 5

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    menu_path: Some(PathBuf::from("from-override.json")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.menu.path == PathBuf::from("from-override.json"),
                "override menu path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.menu.display_limit == 12, "env display limit should win over file")?;
            Ok(())
        })();

        clear_vars(&["WAITER_MENU_PATH", "WAITER_MENU_DISPLAY_LIMIT"]);
        result
    }

    #[test]
    fn hosted_provider_without_api_key_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::OpenAi),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("llm.api_key")),
            "validation failure should mention llm.api_key",
        )
    }

    #[test]
    fn transport_validation_rejects_malformed_bot_token() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WAITER_TELEGRAM_BOT_TOKEN", "not-a-token");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("engine config should load without transport: {err}"))?;
            let error = match config.validate_transport() {
                Ok(()) => return Err("malformed token should be rejected".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("telegram.bot_token")),
                "validation failure should mention telegram.bot_token",
            )
        })();

        clear_vars(&["WAITER_TELEGRAM_BOT_TOKEN"]);
        result
    }

    #[test]
    fn missing_bot_token_only_fails_transport_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.validate_transport().is_err(), "empty token must not pass transport checks")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WAITER_TELEGRAM_BOT_TOKEN", "123456:secret-bot-value");
        env::set_var("WAITER_LLM_API_KEY", "secret-llm-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("secret-bot-value"), "debug output should not contain bot token")?;
            ensure(!debug.contains("secret-llm-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["WAITER_TELEGRAM_BOT_TOKEN", "WAITER_LLM_API_KEY"]);
        result
    }

    #[test]
    fn speech_synthesis_is_configurable_from_file_and_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err| format!("tempdir failed: {err}"))?;
            let path = dir.path().join("waiter.toml");
            fs::write(
                &path,
                "[speech]\nsynthesis_command = \"piper\"\nsynthesis_args = [\"--output_file\", \"{output}\"]\n",
            )
            .map_err(|err| format!("write failed: {err}"))?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path.clone()),
                require_file: true,
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.speech.synthesis_command.as_deref() == Some("piper"), "file sets synthesizer")?;
            ensure(
                config.speech.synthesis_args == vec!["--output_file".to_string(), "{output}".to_string()],
                "file sets synthesizer args",
            )?;

            env::set_var("WAITER_SPEECH_SYNTHESIS_COMMAND", "espeak-ng");
            let from_env = AppConfig::load(LoadOptions {
                config_path: Some(path.clone()),
                require_file: true,
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                from_env.speech.synthesis_command.as_deref() == Some("espeak-ng"),
                "env overrides the file synthesizer",
            )?;

            fs::write(&path, "[speech]\nsynthesis_command = \"  \"\n")
                .map_err(|err| format!("write failed: {err}"))?;
            env::remove_var("WAITER_SPEECH_SYNTHESIS_COMMAND");
            let blank = AppConfig::load(LoadOptions {
                config_path: Some(path),
                require_file: true,
                ..LoadOptions::default()
            });
            ensure(
                matches!(blank, Err(ConfigError::Validation(ref message)) if message.contains("speech.synthesis_command")),
                "blank synthesizer command must fail validation",
            )
        })();

        clear_vars(&["WAITER_SPEECH_SYNTHESIS_COMMAND"]);
        result
    }
}
