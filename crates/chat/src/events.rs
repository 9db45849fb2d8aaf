use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use waiter_agent::runtime::{ConversationController, TurnReply};
use waiter_agent::scheduler::TurnScheduler;
use waiter_core::domain::session::UserId;
use waiter_core::errors::ApplicationError;
use waiter_core::replies;

use crate::commands::BotCommand;
use crate::keyboard::{main_keyboard, OutboundMessage};
use crate::polling::TransportError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub update_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Start,
    Command(BotCommand),
    Text(String),
    Voice { file_id: String },
    Unsupported { kind: String },
}

impl ChatEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Command(command) => command.as_str(),
            Self::Text(_) => "text",
            Self::Voice { .. } => "voice",
            Self::Unsupported { kind } => kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Answered inline, before the next update is read.
    Replied,
    /// Handed to the user's turn queue.
    Queued,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outbound side of a chat transport.
#[async_trait]
pub trait ChatOutbox: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, TransportError>;
    async fn send_voice(&self, chat_id: i64, audio: &[u8]) -> Result<(), TransportError>;
}

#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError>;
}

/// Routes chat events. Cheap events are answered inline; anything that
/// touches a cart or calls the interpreter goes through the user's turn
/// queue so the update loop never waits on it.
pub struct OrderBot {
    controller: Arc<ConversationController>,
    scheduler: Arc<TurnScheduler>,
    outbox: Arc<dyn ChatOutbox>,
}

impl OrderBot {
    pub fn new(
        controller: Arc<ConversationController>,
        scheduler: Arc<TurnScheduler>,
        outbox: Arc<dyn ChatOutbox>,
    ) -> Self {
        Self { controller, scheduler, outbox }
    }

    fn enqueue<F, Fut>(&self, envelope: &ChatEnvelope, ctx: &EventContext, turn: F)
    where
        F: FnOnce(Arc<ConversationController>, Arc<dyn ChatOutbox>, UserId) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = TurnReply> + Send + 'static,
    {
        let user_id = UserId::from(envelope.user_id);
        let chat_id = envelope.chat_id;
        let correlation_id = ctx.correlation_id.clone();
        let controller = Arc::clone(&self.controller);
        let outbox = Arc::clone(&self.outbox);

        self.scheduler.submit(&user_id, {
            let user_id = user_id.clone();
            async move {
                let reply = turn(controller, Arc::clone(&outbox), user_id).await;
                deliver(outbox.as_ref(), chat_id, &reply, &correlation_id).await;
            }
        });
    }
}

#[async_trait]
impl UpdateHandler for OrderBot {
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let user_id = UserId::from(envelope.user_id);
        debug!(
            event_name = "chat.dispatch",
            correlation_id = %ctx.correlation_id,
            user_id = %user_id,
            event_type = envelope.event.kind(),
            "dispatching chat event"
        );

        match &envelope.event {
            ChatEvent::Start => {
                let reply = self.controller.start(&user_id);
                let message = OutboundMessage::text(envelope.chat_id, reply.text())
                    .with_keyboard(main_keyboard());
                self.outbox.send(&message).await?;
                Ok(DispatchOutcome::Replied)
            }
            ChatEvent::Command(BotCommand::Menu) => {
                let reply = self.controller.show_menu();
                self.outbox.send(&OutboundMessage::text(envelope.chat_id, reply.text())).await?;
                Ok(DispatchOutcome::Replied)
            }
            ChatEvent::Command(BotCommand::Help) => {
                self.outbox.send(&OutboundMessage::text(envelope.chat_id, replies::HELP)).await?;
                Ok(DispatchOutcome::Replied)
            }
            ChatEvent::Unsupported { .. } => {
                self.outbox
                    .send(&OutboundMessage::text(envelope.chat_id, replies::UNSUPPORTED_MESSAGE))
                    .await?;
                Ok(DispatchOutcome::Replied)
            }
            ChatEvent::Command(BotCommand::Checkout) => {
                self.enqueue(envelope, ctx, |controller, _outbox, user_id| async move {
                    controller.checkout(&user_id).await
                });
                Ok(DispatchOutcome::Queued)
            }
            ChatEvent::Command(BotCommand::Clear) => {
                self.enqueue(envelope, ctx, |controller, _outbox, user_id| async move {
                    controller.clear(&user_id).await
                });
                Ok(DispatchOutcome::Queued)
            }
            ChatEvent::Text(text) => {
                let text = text.clone();
                self.enqueue(envelope, ctx, |controller, _outbox, user_id| async move {
                    controller.handle_text(&user_id, &text).await
                });
                Ok(DispatchOutcome::Queued)
            }
            ChatEvent::Voice { file_id } => {
                self.outbox.send(&OutboundMessage::text(envelope.chat_id, replies::LISTENING)).await?;

                let file_id = file_id.clone();
                self.enqueue(envelope, ctx, |controller, outbox, user_id| async move {
                    match outbox.download_voice(&file_id).await {
                        Ok(audio) => controller.handle_voice(&user_id, audio).await,
                        Err(error) => {
                            let error = ApplicationError::Transport(error.to_string());
                            warn!(
                                event_name = "chat.voice.download_failed",
                                user_id = %user_id,
                                error_class = error.error_class(),
                                error = %error,
                                "could not fetch voice message"
                            );
                            TurnReply::single(error.user_message())
                        }
                    }
                });
                Ok(DispatchOutcome::Queued)
            }
        }
    }
}

async fn deliver(outbox: &dyn ChatOutbox, chat_id: i64, reply: &TurnReply, correlation_id: &str) {
    for text in &reply.messages {
        if let Err(error) = outbox.send(&OutboundMessage::text(chat_id, text.clone())).await {
            warn!(
                event_name = "chat.reply.failed",
                correlation_id = %correlation_id,
                chat_id,
                error = %error,
                "failed to deliver reply"
            );
            return;
        }
    }
    if let Some(audio) = &reply.voice {
        if let Err(error) = outbox.send_voice(chat_id, audio).await {
            warn!(
                event_name = "chat.reply.voice_failed",
                correlation_id = %correlation_id,
                chat_id,
                error = %error,
                "failed to deliver spoken reply"
            );
        }
    }
    info!(
        event_name = "chat.reply.sent",
        correlation_id = %correlation_id,
        chat_id,
        messages = reply.messages.len(),
        voice = reply.voice.is_some(),
        "turn reply delivered"
    );
}
