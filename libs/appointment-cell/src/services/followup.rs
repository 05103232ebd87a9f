// libs/appointment-cell/src/services/followup.rs
//
// Companion writes (payment, notification) that follow a committed
// appointment write. Each task carries an idempotency key derived from the
// appointment, so replaying it after a partial failure never duplicates the
// companion record.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::models::{AppointmentError, NewNotification, NewPayment, Payment, SequenceKind};
use crate::services::store::{NotificationStore, PaymentStore, SequenceGenerator};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FollowUpAction {
    CreatePayment { payment: NewPayment },
    EmitNotification { notification: NewNotification },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpTask {
    pub idempotency_key: String,
    pub action: FollowUpAction,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl FollowUpTask {
    pub fn payment(payment: NewPayment) -> Self {
        Self {
            idempotency_key: format!("payment:{}", payment.appointment_id),
            action: FollowUpAction::CreatePayment { payment },
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// The notification's dedup key doubles as the task key.
    pub fn notification(notification: NewNotification) -> Self {
        Self {
            idempotency_key: notification.dedup_key.clone(),
            action: FollowUpAction::EmitNotification { notification },
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FollowUpOutcome {
    PaymentRecorded(Payment),
    NotificationRecorded,
    /// A previous run already produced the companion record.
    AlreadyApplied,
}

#[async_trait]
pub trait FollowUpQueue: Send + Sync {
    async fn push(&self, task: FollowUpTask) -> Result<(), AppointmentError>;
    async fn pop(&self) -> Result<Option<FollowUpTask>, AppointmentError>;
    async fn len(&self) -> Result<usize, AppointmentError>;
}

#[derive(Debug, Default)]
pub struct InMemoryFollowUpQueue {
    tasks: Mutex<VecDeque<FollowUpTask>>,
}

impl InMemoryFollowUpQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FollowUpQueue for InMemoryFollowUpQueue {
    async fn push(&self, task: FollowUpTask) -> Result<(), AppointmentError> {
        self.tasks.lock().await.push_back(task);
        Ok(())
    }

    async fn pop(&self) -> Result<Option<FollowUpTask>, AppointmentError> {
        Ok(self.tasks.lock().await.pop_front())
    }

    async fn len(&self) -> Result<usize, AppointmentError> {
        Ok(self.tasks.lock().await.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

pub struct FollowUpDispatcher {
    payments: Arc<dyn PaymentStore>,
    notifications: Arc<dyn NotificationStore>,
    sequences: Arc<dyn SequenceGenerator>,
    queue: Arc<dyn FollowUpQueue>,
    max_attempts: u32,
}

impl FollowUpDispatcher {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        notifications: Arc<dyn NotificationStore>,
        sequences: Arc<dyn SequenceGenerator>,
        queue: Arc<dyn FollowUpQueue>,
        max_attempts: u32,
    ) -> Self {
        Self {
            payments,
            notifications,
            sequences,
            queue,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn queue(&self) -> &Arc<dyn FollowUpQueue> {
        &self.queue
    }

    #[instrument(skip(self, task), fields(key = %task.idempotency_key))]
    pub async fn execute(&self, task: &FollowUpTask) -> Result<FollowUpOutcome, AppointmentError> {
        match &task.action {
            FollowUpAction::CreatePayment { payment } => {
                if let Some(existing) = self
                    .payments
                    .find_by_appointment(&payment.company_id, payment.appointment_id)
                    .await?
                {
                    debug!("Payment {} already exists for appointment", existing.code);
                    return Ok(FollowUpOutcome::AlreadyApplied);
                }

                let code = self
                    .sequences
                    .next_code(&payment.company_id, SequenceKind::Payment)
                    .await?;
                let recorded = self.payments.insert(code, payment).await?;
                Ok(FollowUpOutcome::PaymentRecorded(recorded))
            }
            FollowUpAction::EmitNotification { notification } => {
                match self.notifications.insert_if_absent(notification).await? {
                    Some(_) => Ok(FollowUpOutcome::NotificationRecorded),
                    None => Ok(FollowUpOutcome::AlreadyApplied),
                }
            }
        }
    }

    /// Run the task now; on failure hand it to the queue and return `None`.
    /// Never fails the caller, whose primary write has already committed.
    pub async fn run_or_defer(&self, mut task: FollowUpTask) -> Option<FollowUpOutcome> {
        match self.execute(&task).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Follow-up {} failed, deferring: {}", task.idempotency_key, e);
                task.attempts += 1;
                let key = task.idempotency_key.clone();
                if let Err(queue_error) = self.queue.push(task).await {
                    error!("Follow-up {} could not be queued: {}", key, queue_error);
                }
                None
            }
        }
    }

    /// Replay at most the tasks queued when the drain started, so a task that
    /// fails again is not retried twice in one pass.
    pub async fn drain_once(&self) -> Result<DrainReport, AppointmentError> {
        let pending = self.queue.len().await?;
        let mut report = DrainReport::default();

        for _ in 0..pending {
            let mut task = match self.queue.pop().await {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(e) => {
                    error!("Follow-up queue unavailable, ending drain: {}", e);
                    break;
                }
            };

            match self.execute(&task).await {
                Ok(_) => {
                    debug!("Follow-up {} applied on attempt {}", task.idempotency_key, task.attempts + 1);
                    report.applied += 1;
                }
                Err(e) => {
                    task.attempts += 1;
                    if task.attempts >= self.max_attempts {
                        error!(
                            "Follow-up {} dropped after {} attempts: {}",
                            task.idempotency_key, task.attempts, e
                        );
                        report.dead_lettered += 1;
                    } else {
                        warn!("Follow-up {} failed (attempt {}): {}", task.idempotency_key, task.attempts, e);
                        let key = task.idempotency_key.clone();
                        match self.queue.push(task).await {
                            Ok(()) => report.retried += 1,
                            Err(queue_error) => {
                                error!("Follow-up {} dropped, could not be re-queued: {}", key, queue_error);
                                report.dead_lettered += 1;
                            }
                        }
                    }
                }
            }
        }

        if pending > 0 {
            info!(
                "Follow-up drain: {} applied, {} retried, {} dropped",
                report.applied, report.retried, report.dead_lettered
            );
        }
        Ok(report)
    }
}

/// Periodically drains the follow-up queue.
pub struct FollowUpWorker {
    dispatcher: Arc<FollowUpDispatcher>,
    interval_seconds: u64,
    is_shutdown: RwLock<bool>,
}

impl FollowUpWorker {
    pub fn new(dispatcher: Arc<FollowUpDispatcher>, interval_seconds: u64) -> Self {
        Self {
            dispatcher,
            interval_seconds: interval_seconds.max(1),
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn run(self: Arc<Self>) {
        info!("Follow-up worker started (every {}s)", self.interval_seconds);
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                break;
            }

            if let Err(e) = self.dispatcher.drain_once().await {
                error!("Follow-up drain failed: {}", e);
            }
        }

        info!("Follow-up worker stopped");
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}
