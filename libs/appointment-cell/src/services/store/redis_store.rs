// libs/appointment-cell/src/services/store/redis_store.rs
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, error, info};

use crate::models::{AppointmentError, SequenceKind};
use crate::services::followup::{FollowUpQueue, FollowUpTask};

use super::SequenceGenerator;

const PENDING_QUEUE_KEY: &str = "appointment_followups:pending";
const DEAD_LETTER_KEY: &str = "appointment_followups:dead";

fn decode_task(payload: &str) -> Result<FollowUpTask, AppointmentError> {
    serde_json::from_str(payload).map_err(|e| AppointmentError::QueueError(e.to_string()))
}

fn create_pool(redis_url: &str) -> Result<Pool, AppointmentError> {
    Config::from_url(redis_url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| AppointmentError::QueueError(format!("Failed to create Redis pool: {}", e)))
}

async fn connection(pool: &Pool) -> Result<Connection, AppointmentError> {
    pool.get()
        .await
        .map_err(|e| AppointmentError::QueueError(format!("Failed to connect to Redis: {}", e)))
}

fn redis_error(e: redis::RedisError) -> AppointmentError {
    AppointmentError::QueueError(e.to_string())
}

/// Per-tenant counters kept in Redis. `INCR` is atomic, so concurrent
/// schedulers in any number of processes never observe the same value.
pub struct RedisSequenceGenerator {
    pool: Pool,
}

impl RedisSequenceGenerator {
    pub async fn new(redis_url: &str) -> Result<Self, AppointmentError> {
        let pool = create_pool(redis_url)?;

        let mut conn = connection(&pool).await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        info!("Redis sequence generator initialized");

        Ok(Self { pool })
    }

    fn counter_key(company_id: &str, kind: SequenceKind) -> String {
        format!("id_tracker:{}:{}", company_id, kind.key())
    }
}

#[async_trait]
impl SequenceGenerator for RedisSequenceGenerator {
    async fn next(&self, company_id: &str, kind: SequenceKind) -> Result<u64, AppointmentError> {
        let mut conn = connection(&self.pool).await?;
        let key = Self::counter_key(company_id, kind);

        let value: u64 = conn.incr(&key, 1).await.map_err(redis_error)?;
        debug!("Sequence {} advanced to {}", key, value);
        Ok(value)
    }
}

/// Durable follow-up queue: producers `LPUSH`, the worker `RPOP`s.
pub struct RedisFollowUpQueue {
    pool: Pool,
}

impl RedisFollowUpQueue {
    pub async fn new(redis_url: &str) -> Result<Self, AppointmentError> {
        let pool = create_pool(redis_url)?;

        let mut conn = connection(&pool).await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        info!("Redis follow-up queue initialized");

        Ok(Self { pool })
    }
}

#[async_trait]
impl FollowUpQueue for RedisFollowUpQueue {
    async fn push(&self, task: FollowUpTask) -> Result<(), AppointmentError> {
        let mut conn = connection(&self.pool).await?;
        let payload = serde_json::to_string(&task)
            .map_err(|e| AppointmentError::QueueError(e.to_string()))?;

        let _: () = conn.lpush(PENDING_QUEUE_KEY, payload).await.map_err(redis_error)?;
        debug!("Follow-up {} queued", task.idempotency_key);
        Ok(())
    }

    /// Undecodable payloads are moved to the dead-letter list and skipped.
    async fn pop(&self) -> Result<Option<FollowUpTask>, AppointmentError> {
        let mut conn = connection(&self.pool).await?;

        loop {
            let payload: Option<String> = conn.rpop(PENDING_QUEUE_KEY, None).await.map_err(redis_error)?;
            let Some(data) = payload else {
                return Ok(None);
            };

            match decode_task(&data) {
                Ok(task) => return Ok(Some(task)),
                Err(e) => {
                    error!("Dead-lettering undecodable follow-up payload: {}", e);
                    let _: () = conn.lpush(DEAD_LETTER_KEY, data).await.map_err(redis_error)?;
                }
            }
        }
    }

    async fn len(&self) -> Result<usize, AppointmentError> {
        let mut conn = connection(&self.pool).await?;
        conn.llen(PENDING_QUEUE_KEY).await.map_err(redis_error)
    }
}
