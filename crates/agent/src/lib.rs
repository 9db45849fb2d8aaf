//! Agent runtime: turns a customer's utterance into cart changes.
//!
//! The language model is strictly a translator. It proposes product names and
//! an action; the catalog decides what a name means and what it costs.
//!
//! - `interpreter` builds the prompt and extracts the JSON answer.
//! - `intent` narrows that untrusted answer into an [`IntentResponse`].
//! - `runtime` owns the turn: session lock, cart changes, checkout.
//! - `speech` runs the external recognizer and synthesizer for voice turns.
//! - `scheduler` queues turns per user so delivery never blocks.

pub mod intent;
pub mod interpreter;
pub mod llm;
pub mod runtime;
pub mod scheduler;
pub mod speech;

pub use intent::{IntentAction, IntentResponse};
pub use interpreter::{IntentInterpreter, IntentRequest, InterpreterError, LlmIntentInterpreter};
pub use llm::{LlmClient, OpenAiCompatibleClient};
pub use runtime::{ConversationController, TurnReply};
pub use scheduler::TurnScheduler;
pub use speech::{
    synthesizer_from_config, transcriber_from_config, CommandSynthesizer, CommandTranscriber,
    SpeechSynthesizer, SpeechTranscriber, SynthesisError, TranscriptionError,
    UnavailableSynthesizer, UnavailableTranscriber,
};
