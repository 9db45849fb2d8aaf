use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error};
use waiter_core::domain::session::UserId;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Per-user FIFO turn queue. Each user gets one worker task, created on the
/// first submission; different users never wait on each other.
#[derive(Default)]
pub struct TurnScheduler {
    queues: Mutex<HashMap<UserId, mpsc::UnboundedSender<Job>>>,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `job` behind the user's earlier turns and returns immediately.
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, user_id: &UserId, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let job: Job = Box::pin(job);

        let job = match queues.get(user_id) {
            Some(sender) => match sender.send(job) {
                Ok(()) => return,
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let sender = spawn_worker(user_id.clone());
        if sender.send(job).is_err() {
            error!(
                event_name = "scheduler.submit.rejected",
                user_id = %user_id,
                "fresh turn worker rejected a job"
            );
        }
        queues.insert(user_id.clone(), sender);
    }

    /// Number of users that have a worker.
    pub fn workers(&self) -> usize {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn spawn_worker(user_id: UserId) -> mpsc::UnboundedSender<Job> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

    tokio::spawn(async move {
        debug!(event_name = "scheduler.worker.started", user_id = %user_id, "turn worker started");
        while let Some(job) = receiver.recv().await {
            // a panicking turn must not take the user's queue down with it
            if let Err(join_error) = tokio::spawn(job).await {
                error!(
                    event_name = "scheduler.turn.panicked",
                    user_id = %user_id,
                    error = %join_error,
                    "turn task failed"
                );
            }
        }
    });

    sender
}
