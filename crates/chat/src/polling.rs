use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{ChatEnvelope, EventContext, UpdateHandler};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport file download failed: {0}")]
    Download(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Inbound side of a chat transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// Waits for the next update. `None` means the stream has ended.
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    /// Marks an update as handled so it is not delivered again.
    async fn acknowledge(&self, update_id: i64) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

pub struct PollingRunner {
    transport: Arc<dyn ChatTransport>,
    handler: Arc<dyn UpdateHandler>,
    reconnect_policy: ReconnectPolicy,
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        handler: Arc<dyn UpdateHandler>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, handler, reconnect_policy }
    }

    /// Pumps updates until the stream ends. Only consecutive failures count
    /// against `max_retries`; a connection that delivered updates before it
    /// dropped starts the count over.
    pub async fn start(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            let mut delivered = 0_usize;
            match self.connect_and_pump(attempt, &mut delivered).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    if delivered > 0 {
                        attempt = 0;
                    }
                    warn!(
                        attempt,
                        delivered,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "chat transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "chat transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        delivered: &mut usize,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening chat transport connection");
        self.transport.connect().await?;
        info!(attempt, "chat transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "chat transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            *delivered += 1;
            let correlation_id = format!("update-{}", envelope.update_id);

            info!(
                event_name = "ingress.chat.update_received",
                update_id = envelope.update_id,
                event_type = envelope.event.kind(),
                correlation_id = %correlation_id,
                user_id = envelope.user_id,
                "received chat update"
            );

            if let Err(error) = self.transport.acknowledge(envelope.update_id).await {
                warn!(
                    event_name = "ingress.chat.ack_failed",
                    update_id = envelope.update_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to acknowledge chat update"
                );
            } else {
                debug!(
                    event_name = "ingress.chat.ack_sent",
                    update_id = envelope.update_id,
                    correlation_id = %correlation_id,
                    "acknowledged chat update"
                );
            }

            let context = EventContext { correlation_id: correlation_id.clone() };
            if let Err(error) = self.handler.handle(&envelope, &context).await {
                warn!(
                    update_id = envelope.update_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "event dispatch failed; continuing polling loop"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use super::{ChatTransport, PollingRunner, ReconnectPolicy, TransportError};
    use crate::events::{
        ChatEnvelope, ChatEvent, DispatchError, DispatchOutcome, EventContext, UpdateHandler,
    };
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<ChatEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<i64>,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<ChatEnvelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, update_id: i64) -> Result<(), TransportError> {
            self.state.lock().await.acknowledgements.push(update_id);
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.state.lock().await.disconnect_calls += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<(i64, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl UpdateHandler for RecordingHandler {
        async fn handle(
            &self,
            envelope: &ChatEnvelope,
            ctx: &EventContext,
        ) -> Result<DispatchOutcome, DispatchError> {
            self.seen.lock().await.push((envelope.update_id, ctx.correlation_id.clone()));
            if self.fail {
                return Err(DispatchError::Transport(TransportError::Send("blocked".to_owned())));
            }
            Ok(DispatchOutcome::Replied)
        }
    }

    fn text_update(update_id: i64) -> ChatEnvelope {
        ChatEnvelope {
            update_id,
            chat_id: 1,
            user_id: 1,
            event: ChatEvent::Text("привіт".to_owned()),
        }
    }

    fn no_delay(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(text_update(10))), Ok(None)],
        ));
        let handler = Arc::new(RecordingHandler::default());

        let runner = PollingRunner::new(transport.clone(), handler.clone(), no_delay(2));
        runner.start().await.expect("runner should not fail");

        let state = transport.state.lock().await;
        assert_eq!(state.connect_attempts, 2);
        assert_eq!(state.acknowledgements, vec![10]);
        assert_eq!(state.disconnect_calls, 1);
        assert_eq!(*handler.seen.lock().await, vec![(10, "update-10".to_owned())]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner =
            PollingRunner::new(transport.clone(), Arc::new(RecordingHandler::default()), no_delay(2));

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.state.lock().await.connect_attempts, 3);
    }

    #[tokio::test]
    async fn dispatch_failures_do_not_stop_the_loop() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(text_update(1))), Ok(Some(text_update(2))), Ok(None)],
        ));
        let handler = Arc::new(RecordingHandler { fail: true, ..RecordingHandler::default() });

        let runner = PollingRunner::new(transport.clone(), handler.clone(), no_delay(0));
        runner.start().await.expect("runner should not fail");

        assert_eq!(handler.seen.lock().await.len(), 2);
        assert_eq!(transport.state.lock().await.acknowledgements, vec![1, 2]);
    }

    #[tokio::test]
    async fn intermittent_read_failures_do_not_use_up_retries() {
        let mut envelopes = Vec::new();
        for update_id in 1..=7 {
            envelopes.push(Ok(Some(text_update(update_id))));
            envelopes.push(Err(TransportError::Receive("connection reset".to_owned())));
        }
        envelopes.push(Ok(None));
        let transport = Arc::new(ScriptedTransport::with_script(vec![], envelopes));
        let handler = Arc::new(RecordingHandler::default());

        let runner = PollingRunner::new(transport.clone(), handler.clone(), no_delay(5));
        runner.start().await.expect("runner should not fail");

        let seen = handler.seen.lock().await.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        assert_eq!(seen, (1..=7).collect::<Vec<_>>());
        let state = transport.state.lock().await;
        assert_eq!(state.connect_attempts, 8);
        assert_eq!(state.disconnect_calls, 1);
    }

    #[tokio::test]
    async fn consecutive_read_failures_still_exhaust_retries() {
        let envelopes =
            (0..10).map(|_| Err(TransportError::Receive("down".to_owned()))).collect::<Vec<_>>();
        let transport = Arc::new(ScriptedTransport::with_script(vec![], envelopes));

        let runner =
            PollingRunner::new(transport.clone(), Arc::new(RecordingHandler::default()), no_delay(3));
        runner.start().await.expect("runner should degrade gracefully");

        assert_eq!(transport.state.lock().await.connect_attempts, 4);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = ReconnectPolicy { max_retries: 5, base_delay_ms: 100, max_delay_ms: 500 };
        let delays = (0..4).map(|attempt| policy.backoff(attempt).as_millis()).collect::<Vec<_>>();
        assert_eq!(delays, vec![100, 200, 400, 500]);
    }
}
