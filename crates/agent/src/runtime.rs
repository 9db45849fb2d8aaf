use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;
use waiter_core::cart::{CartEngine, Receipt};
use waiter_core::domain::session::{Session, TurnState, UserId};
use waiter_core::errors::ApplicationError;
use waiter_core::menu::{Catalog, ProductResolver};
use waiter_core::replies;
use waiter_core::sessions::SessionStore;

use crate::intent::{IntentAction, IntentResponse};
use crate::interpreter::{IntentInterpreter, IntentRequest};
use crate::speech::{SpeechSynthesizer, SpeechTranscriber, SynthesisError, UnavailableSynthesizer};

/// Messages to deliver for one turn, in order. `voice` carries a spoken
/// rendition of the reply for turns that arrived as voice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnReply {
    pub messages: Vec<String>,
    pub voice: Option<Vec<u8>>,
}

impl TurnReply {
    pub fn single(message: impl Into<String>) -> Self {
        Self { messages: vec![message.into()], voice: None }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn text(&self) -> String {
        self.messages.join("\n\n")
    }
}

/// Owns the per-turn flow: session lookup, interpretation, cart changes and
/// checkout. Holding a session's mutex for the whole turn serializes turns of
/// the same user.
pub struct ConversationController {
    catalog: Arc<Catalog>,
    engine: CartEngine,
    sessions: Arc<SessionStore>,
    interpreter: Arc<dyn IntentInterpreter>,
    transcriber: Arc<dyn SpeechTranscriber>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    display_limit: usize,
}

impl ConversationController {
    pub fn new(
        catalog: Arc<Catalog>,
        sessions: Arc<SessionStore>,
        interpreter: Arc<dyn IntentInterpreter>,
        transcriber: Arc<dyn SpeechTranscriber>,
        display_limit: usize,
    ) -> Self {
        let engine = CartEngine::new(ProductResolver::new(Arc::clone(&catalog)));
        Self {
            catalog,
            engine,
            sessions,
            interpreter,
            transcriber,
            synthesizer: Arc::new(UnavailableSynthesizer),
            display_limit,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn start(&self, user_id: &UserId) -> TurnReply {
        self.sessions.get_or_create(user_id);
        info!(event_name = "conversation.started", user_id = %user_id, "session opened");
        TurnReply::single(replies::GREETING)
    }

    pub fn show_menu(&self) -> TurnReply {
        if self.catalog.is_empty() {
            return TurnReply::single(replies::MENU_UNAVAILABLE);
        }

        let mut text = format!("{}\n\n", replies::MENU_HEADER);
        for product in self.catalog.list_first(self.display_limit) {
            text.push_str(&format!("🍕 {}: {}\n", product.name, product.price));
        }
        text.push('\n');
        text.push_str(replies::MENU_FOOTER);
        TurnReply::single(text)
    }

    pub async fn handle_text(&self, user_id: &UserId, text: &str) -> TurnReply {
        let span = turn_span(user_id, "text");
        async {
            let utterance = text.trim();
            if utterance.is_empty() {
                return TurnReply::single(replies::NOT_UNDERSTOOD);
            }
            self.run_turn(user_id, utterance).await.0
        }
        .instrument(span)
        .await
    }

    pub async fn handle_voice(&self, user_id: &UserId, audio: Vec<u8>) -> TurnReply {
        let span = turn_span(user_id, "voice");
        async {
            let transcript = match self.transcribe(&audio).await {
                Ok(transcript) if !transcript.trim().is_empty() => transcript.trim().to_owned(),
                Ok(_) => {
                    info!(event_name = "conversation.voice.empty", "transcript was empty");
                    return TurnReply::single(replies::NOT_UNDERSTOOD);
                }
                Err(error) => {
                    warn!(
                        event_name = "conversation.voice.failed",
                        error_class = error.error_class(),
                        error = %error,
                        "voice message could not be transcribed"
                    );
                    return TurnReply::single(error.user_message());
                }
            };

            let mut reply = TurnReply::single(replies::transcript_echo(&transcript));
            let (turn, spoken) = self.run_turn(user_id, &transcript).await;
            reply.messages.extend(turn.messages);
            reply.voice = self.synthesize(&spoken).await;
            reply
        }
        .instrument(span)
        .await
    }

    pub async fn checkout(&self, user_id: &UserId) -> TurnReply {
        let span = turn_span(user_id, "checkout");
        async {
            let handle = self.sessions.get_or_create(user_id);
            let mut session = handle.lock().await;
            let receipt = self.commit(&mut session);

            let mut reply = TurnReply::single(receipt.text.clone());
            if receipt.total > 0 {
                reply.push(replies::ORDER_PLACED);
            }
            reply
        }
        .instrument(span)
        .await
    }

    pub async fn clear(&self, user_id: &UserId) -> TurnReply {
        let handle = self.sessions.get_or_create(user_id);
        let mut session = handle.lock().await;
        self.engine.clear(&mut session);
        info!(event_name = "conversation.cart.cleared", user_id = %user_id, "cart cleared");
        TurnReply::single(replies::CART_CLEARED)
    }

    /// Returns the reply and the interpreter's reply text, which is what a
    /// voice answer speaks.
    async fn run_turn(&self, user_id: &UserId, utterance: &str) -> (TurnReply, String) {
        let handle = self.sessions.get_or_create(user_id);
        let mut session = handle.lock().await;
        if session.state == TurnState::Processing {
            warn!(
                event_name = "conversation.turn.recovered",
                user_id = %user_id,
                "previous turn for this session did not finish"
            );
        }
        session.state = TurnState::Processing;

        let request = IntentRequest::new(
            self.catalog.names(),
            session.history().to_vec(),
            session.cart.snapshot(),
            utterance,
        );
        let intent = match self.interpreter.interpret(&request).await {
            Ok(value) => IntentResponse::sanitize(&value),
            Err(error) => {
                let error = ApplicationError::Interpreter(error.to_string());
                error!(
                    event_name = "conversation.interpreter.failed",
                    error_class = error.error_class(),
                    error = %error,
                    "interpreter failed; using fallback reply"
                );
                IntentResponse::fallback()
            }
        };

        let outcome = self.engine.add_items(&mut session, intent.cart_update);
        info!(
            event_name = "conversation.turn.interpreted",
            action = intent.action.as_str(),
            added = outcome.added,
            dropped = outcome.dropped.len(),
            cart_len = session.cart.len(),
            "turn interpreted"
        );

        let reply = match intent.action {
            IntentAction::Checkout => {
                let receipt = self.commit(&mut session);
                TurnReply::single(format!("{}\n\n{}", intent.reply_text, receipt.text))
            }
            IntentAction::Continue => TurnReply::single(intent.reply_text.clone()),
        };

        session.state = TurnState::Idle;
        (reply, intent.reply_text)
    }

    fn commit(&self, session: &mut Session) -> Receipt {
        let receipt = self.engine.checkout(session);
        info!(
            event_name = "conversation.checkout.committed",
            total = receipt.total,
            item_count = receipt.item_count,
            "order checked out"
        );
        receipt
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, ApplicationError> {
        self.transcriber
            .transcribe(audio)
            .await
            .map_err(|error| ApplicationError::Transcription(error.to_string()))
    }

    async fn synthesize(&self, text: &str) -> Option<Vec<u8>> {
        match self.synthesizer.synthesize(text).await {
            Ok(audio) => Some(audio),
            Err(SynthesisError::Unavailable) => None,
            Err(error) => {
                warn!(
                    event_name = "conversation.voice.synthesis_failed",
                    error = %error,
                    "reply could not be spoken; sending text only"
                );
                None
            }
        }
    }
}

fn turn_span(user_id: &UserId, kind: &'static str) -> tracing::Span {
    info_span!("turn", correlation_id = %Uuid::new_v4(), user_id = %user_id, kind)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use waiter_core::domain::product::Product;
    use waiter_core::domain::session::{TurnState, UserId};
    use waiter_core::menu::Catalog;
    use waiter_core::replies;
    use waiter_core::sessions::SessionStore;

    use super::ConversationController;
    use crate::interpreter::{IntentInterpreter, IntentRequest, InterpreterError};
    use crate::speech::{
        SpeechSynthesizer, SpeechTranscriber, SynthesisError, TranscriptionError,
        UnavailableTranscriber,
    };

    struct ScriptedInterpreter {
        answer: Value,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedInterpreter {
        fn new(answer: Value) -> Self {
            Self { answer, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl IntentInterpreter for ScriptedInterpreter {
        async fn interpret(&self, _request: &IntentRequest) -> Result<Value, InterpreterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.answer.clone())
        }
    }

    struct FailingInterpreter;

    #[async_trait]
    impl IntentInterpreter for FailingInterpreter {
        async fn interpret(&self, _request: &IntentRequest) -> Result<Value, InterpreterError> {
            Err(InterpreterError::EmptyResponse)
        }
    }

    struct PanickingInterpreter;

    #[async_trait]
    impl IntentInterpreter for PanickingInterpreter {
        async fn interpret(&self, _request: &IntentRequest) -> Result<Value, InterpreterError> {
            panic!("interpreter crashed mid-turn");
        }
    }

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl SpeechTranscriber for FixedTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscriptionError> {
            Ok(self.0.to_owned())
        }
    }

    #[derive(Default)]
    struct RecordingSynthesizer {
        spoken: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
            self.spoken.lock().expect("spoken lock").push(text.to_owned());
            if self.fail {
                return Err(SynthesisError::EmptyAudio);
            }
            Ok(b"opus".to_vec())
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![
            Product::new("A", "50"),
            Product::new("B", "30"),
            Product::new("Піца Маргарита", "від 150"),
        ]))
    }

    fn controller(
        interpreter: Arc<dyn IntentInterpreter>,
        transcriber: Arc<dyn SpeechTranscriber>,
    ) -> ConversationController {
        ConversationController::new(
            catalog(),
            Arc::new(SessionStore::new()),
            interpreter,
            transcriber,
            30,
        )
    }

    #[tokio::test]
    async fn text_turn_adds_resolved_items_and_replies() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({
            "reply_text": "Додав маргариту",
            "cart_update": ["маргарита", "невідома страва"],
            "action": "continue"
        })));
        let controller = controller(interpreter, Arc::new(UnavailableTranscriber));
        let user = UserId::from(1_i64);

        let reply = controller.handle_text(&user, "  одну маргариту ").await;
        assert_eq!(reply.messages, vec!["Додав маргариту".to_owned()]);

        let handle = controller.sessions().get(&user).expect("session exists");
        let session = handle.lock().await;
        let names = session.cart.resolved_items().map(|p| p.name.clone()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Піца Маргарита".to_owned()]);
    }

    #[tokio::test]
    async fn blank_text_skips_the_interpreter() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({})));
        let controller = controller(interpreter.clone(), Arc::new(UnavailableTranscriber));

        let reply = controller.handle_text(&UserId::from("u"), "   ").await;
        assert_eq!(reply.messages, vec![replies::NOT_UNDERSTOOD.to_owned()]);
        assert_eq!(interpreter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn checkout_action_appends_receipt_and_empties_cart() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({
            "reply_text": "Ваш рахунок",
            "cart_update": ["A", {"name": "B", "price": "30"}],
            "action": "checkout"
        })));
        let controller = controller(interpreter, Arc::new(UnavailableTranscriber));
        let user = UserId::from("u");

        let reply = controller.handle_text(&user, "рахунок").await;
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].starts_with("Ваш рахунок\n\n"));
        assert!(reply.messages[0].contains("80 грн"));

        let handle = controller.sessions().get(&user).expect("session exists");
        let session = handle.lock().await;
        assert!(session.cart.is_empty());
        assert_eq!(session.history(), ["A".to_owned(), "B".to_owned()]);
    }

    #[tokio::test]
    async fn interpreter_failure_degrades_to_fallback() {
        let controller = controller(Arc::new(FailingInterpreter), Arc::new(UnavailableTranscriber));

        let reply = controller.handle_text(&UserId::from("u"), "щось").await;
        assert_eq!(reply.messages, vec![replies::INTERPRETER_ERROR.to_owned()]);
    }

    #[tokio::test]
    async fn voice_turn_echoes_transcript_before_reply() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({"reply_text": "Ок"})));
        let controller = controller(interpreter, Arc::new(FixedTranscriber(" дві піци ")));

        let reply = controller.handle_voice(&UserId::from("u"), b"ogg".to_vec()).await;
        assert_eq!(reply.messages, vec![replies::transcript_echo("дві піци"), "Ок".to_owned()]);
    }

    #[tokio::test]
    async fn voice_turn_speaks_the_interpreter_reply() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({
            "reply_text": "Ваш рахунок",
            "cart_update": ["A"],
            "action": "checkout"
        })));
        let synthesizer = Arc::new(RecordingSynthesizer::default());
        let controller = controller(interpreter, Arc::new(FixedTranscriber("рахунок")))
            .with_synthesizer(synthesizer.clone());
        let user = UserId::from("u");

        let reply = controller.handle_voice(&user, b"ogg".to_vec()).await;
        assert_eq!(reply.messages.len(), 2);
        assert_eq!(reply.voice.as_deref(), Some(b"opus".as_slice()));
        assert_eq!(*synthesizer.spoken.lock().expect("spoken lock"), vec!["Ваш рахунок".to_owned()]);

        let text_reply = controller.handle_text(&user, "рахунок").await;
        assert_eq!(text_reply.voice, None, "text turns are never spoken");
        assert_eq!(synthesizer.spoken.lock().expect("spoken lock").len(), 1);
    }

    #[tokio::test]
    async fn synthesis_failure_keeps_the_text_reply() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({"reply_text": "Ок"})));
        let synthesizer = Arc::new(RecordingSynthesizer { fail: true, ..Default::default() });
        let controller = controller(interpreter, Arc::new(FixedTranscriber("піца")))
            .with_synthesizer(synthesizer);

        let reply = controller.handle_voice(&UserId::from("u"), b"ogg".to_vec()).await;
        assert_eq!(reply.messages, vec![replies::transcript_echo("піца"), "Ок".to_owned()]);
        assert_eq!(reply.voice, None);
    }

    #[tokio::test]
    async fn interrupted_turn_is_visible_until_the_next_turn_finishes() {
        let sessions = Arc::new(SessionStore::new());
        let crashing = Arc::new(ConversationController::new(
            catalog(),
            Arc::clone(&sessions),
            Arc::new(PanickingInterpreter),
            Arc::new(UnavailableTranscriber),
            30,
        ));
        let user = UserId::from("u");

        let turn = {
            let crashing = Arc::clone(&crashing);
            let user = user.clone();
            tokio::spawn(async move { crashing.handle_text(&user, "A").await })
        };
        assert!(turn.await.is_err(), "crashing turn panics");

        let handle = sessions.get(&user).expect("session exists");
        assert_eq!(handle.lock().await.state, TurnState::Processing);

        let healthy = ConversationController::new(
            catalog(),
            Arc::clone(&sessions),
            Arc::new(ScriptedInterpreter::new(json!({"reply_text": "Ок"}))),
            Arc::new(UnavailableTranscriber),
            30,
        );
        let reply = healthy.handle_text(&user, "A").await;
        assert_eq!(reply.messages, vec!["Ок".to_owned()]);
        assert_eq!(handle.lock().await.state, TurnState::Idle);
    }

    #[tokio::test]
    async fn unusable_voice_is_not_understood() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({})));
        let silent = controller(interpreter.clone(), Arc::new(FixedTranscriber("  ")));
        let disabled = controller(interpreter.clone(), Arc::new(UnavailableTranscriber));

        for controller in [silent, disabled] {
            let reply = controller.handle_voice(&UserId::from("u"), Vec::new()).await;
            assert_eq!(reply.messages, vec![replies::NOT_UNDERSTOOD.to_owned()]);
        }
        assert_eq!(interpreter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explicit_checkout_confirms_only_non_empty_orders() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({"cart_update": ["A"]})));
        let controller = controller(interpreter, Arc::new(UnavailableTranscriber));
        let user = UserId::from("u");

        let empty = controller.checkout(&user).await;
        assert_eq!(empty.messages, vec![replies::CART_EMPTY.to_owned()]);

        controller.handle_text(&user, "A").await;
        let placed = controller.checkout(&user).await;
        assert_eq!(placed.messages.len(), 2);
        assert!(placed.messages[0].contains("50 грн"));
        assert_eq!(placed.messages[1], replies::ORDER_PLACED);
    }

    #[tokio::test]
    async fn clear_empties_the_cart() {
        let interpreter = Arc::new(ScriptedInterpreter::new(json!({"cart_update": ["A", "B"]})));
        let controller = controller(interpreter, Arc::new(UnavailableTranscriber));
        let user = UserId::from("u");

        controller.handle_text(&user, "A і B").await;
        let reply = controller.clear(&user).await;
        assert_eq!(reply.messages, vec![replies::CART_CLEARED.to_owned()]);

        let receipt = controller.checkout(&user).await;
        assert_eq!(receipt.messages, vec![replies::CART_EMPTY.to_owned()]);
    }

    #[tokio::test]
    async fn menu_lists_first_products_with_raw_prices() {
        let controller = controller(
            Arc::new(ScriptedInterpreter::new(json!({}))),
            Arc::new(UnavailableTranscriber),
        );

        let text = controller.show_menu().text();
        assert!(text.starts_with(replies::MENU_HEADER));
        assert!(text.contains("🍕 A: 50\n"));
        assert!(text.contains("🍕 Піца Маргарита: від 150\n"));
        assert!(text.ends_with(replies::MENU_FOOTER));
    }

    #[tokio::test]
    async fn concurrent_turns_for_one_user_do_not_lose_items() {
        let interpreter = Arc::new(ScriptedInterpreter {
            answer: json!({"cart_update": ["A"]}),
            delay: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
        });
        let controller = Arc::new(controller(interpreter, Arc::new(UnavailableTranscriber)));
        let user = UserId::from("busy");

        let turns = (0..5)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let user = user.clone();
                tokio::spawn(async move { controller.handle_text(&user, "ще A").await })
            })
            .collect::<Vec<_>>();
        for turn in turns {
            turn.await.expect("turn task joins");
        }

        let handle = controller.sessions().get(&user).expect("session exists");
        assert_eq!(handle.lock().await.cart.len(), 5);
    }
}
