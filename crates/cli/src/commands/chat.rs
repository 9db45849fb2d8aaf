use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use waiter_agent::interpreter::LlmIntentInterpreter;
use waiter_agent::llm::OpenAiCompatibleClient;
use waiter_agent::runtime::{ConversationController, TurnReply};
use waiter_agent::speech::UnavailableTranscriber;
use waiter_core::config::AppConfig;
use waiter_core::domain::session::UserId;
use waiter_core::menu::Catalog;
use waiter_core::replies;
use waiter_core::sessions::SessionStore;

use crate::commands::{load_config, CommandResult, EXIT_CONFIG, EXIT_RUNTIME};

/// Talks to the order engine from a terminal, without a chat transport.
pub fn run(config_path: Option<PathBuf>, user: String) -> CommandResult {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let controller = match build_controller(&config) {
        Ok(controller) => controller,
        Err(error) => {
            return CommandResult::failure("chat", "llm_client", format!("{error:#}"), EXIT_RUNTIME)
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    let user_id = UserId(user);
    let stdin = io::stdin();
    let stdout = io::stdout();
    match runtime.block_on(run_session(&controller, &user_id, stdin.lock(), stdout.lock())) {
        Ok(turns) => CommandResult::success("chat", format!("session ended after {turns} turns")),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), EXIT_RUNTIME),
    }
}

fn build_controller(config: &AppConfig) -> anyhow::Result<ConversationController> {
    let catalog = Arc::new(Catalog::load(&config.menu.path));
    let llm = OpenAiCompatibleClient::from_config(&config.llm)?;

    Ok(ConversationController::new(
        catalog,
        Arc::new(SessionStore::new()),
        Arc::new(LlmIntentInterpreter::new(llm)),
        Arc::new(UnavailableTranscriber),
        config.menu.display_limit,
    ))
}

/// Reads one utterance per line until EOF or `/quit`. Returns the number of
/// turns served.
pub async fn run_session<R, W>(
    controller: &ConversationController,
    user_id: &UserId,
    input: R,
    mut output: W,
) -> io::Result<usize>
where
    R: BufRead,
    W: Write,
{
    write_reply(&mut output, &controller.start(user_id))?;
    let mut turns = 0;

    for line in input.lines() {
        let line = line?;
        let reply = match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/start" => controller.start(user_id),
            "/menu" => controller.show_menu(),
            "/help" => TurnReply::single(replies::HELP),
            "/checkout" => controller.checkout(user_id).await,
            "/clear" => controller.clear(user_id).await,
            text => controller.handle_text(user_id, text).await,
        };
        turns += 1;
        write_reply(&mut output, &reply)?;
    }

    Ok(turns)
}

fn write_reply<W: Write>(output: &mut W, reply: &TurnReply) -> io::Result<()> {
    for message in &reply.messages {
        writeln!(output, "{message}\n")?;
    }
    output.flush()
}
