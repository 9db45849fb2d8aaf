use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use waiter_agent::interpreter::{IntentInterpreter, LlmIntentInterpreter};
use waiter_agent::llm::OpenAiCompatibleClient;
use waiter_agent::runtime::ConversationController;
use waiter_agent::scheduler::TurnScheduler;
use waiter_agent::speech::{
    synthesizer_from_config, transcriber_from_config, SpeechSynthesizer, SpeechTranscriber,
};
use waiter_chat::events::OrderBot;
use waiter_chat::polling::{PollingRunner, ReconnectPolicy, TransportError};
use waiter_chat::telegram::TelegramTransport;
use waiter_core::config::{AppConfig, ConfigError, LoadOptions};
use waiter_core::menu::Catalog;
use waiter_core::sessions::SessionStore;

pub struct Application {
    pub config: AppConfig,
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
    pub controller: Arc<ConversationController>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client setup failed: {0}")]
    LlmClient(#[source] anyhow::Error),
    #[error("chat transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    // the only fatal startup condition: without a bot token there is nothing to serve
    config.validate_transport()?;

    let catalog = Arc::new(Catalog::load(&config.menu.path));
    info!(
        event_name = "system.bootstrap.menu_loaded",
        correlation_id = "bootstrap",
        menu_path = %config.menu.path.display(),
        products = catalog.len(),
        "menu catalog loaded"
    );

    let llm = OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?;
    let interpreter: Arc<dyn IntentInterpreter> = Arc::new(LlmIntentInterpreter::new(llm));
    let transcriber: Arc<dyn SpeechTranscriber> = Arc::from(transcriber_from_config(&config.speech));
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::from(synthesizer_from_config(&config.speech));
    info!(
        event_name = "system.bootstrap.agent_ready",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        llm_model = %config.llm.model,
        voice_enabled = config.speech.command.is_some(),
        voice_replies = config.speech.synthesis_command.is_some(),
        "conversation agent configured"
    );

    let sessions = Arc::new(SessionStore::new());
    let controller = Arc::new(
        ConversationController::new(
            Arc::clone(&catalog),
            Arc::clone(&sessions),
            interpreter,
            transcriber,
            config.menu.display_limit,
        )
        .with_synthesizer(synthesizer),
    );

    let telegram = Arc::new(TelegramTransport::from_config(&config.telegram)?);
    let bot = OrderBot::new(Arc::clone(&controller), Arc::new(TurnScheduler::new()), telegram.clone());
    let runner = PollingRunner::new(telegram, Arc::new(bot), ReconnectPolicy::default());

    Ok(Application { config, catalog, sessions, controller, runner })
}
