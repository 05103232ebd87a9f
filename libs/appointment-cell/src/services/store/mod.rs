// libs/appointment-cell/src/services/store/mod.rs
//
// Persistence seams for the appointment cell. Every method is tenant-scoped;
// the tenant filter is applied by the store, never by the caller.

pub mod memory;
pub mod redis_store;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentPatch, Client, Employee,
    NewNotification, NewPayment, Notification, Payment, SequenceKind, Service,
};
use crate::services::lifecycle::SweepRule;

pub use memory::InMemoryStore;
pub use redis_store::{RedisFollowUpQueue, RedisSequenceGenerator};
pub use supabase::SupabaseStore;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    /// Includes trashed records; callers decide how to treat them.
    async fn find(&self, company_id: &str, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn update(
        &self,
        company_id: &str,
        id: Uuid,
        patch: &AppointmentPatch,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn list(
        &self,
        company_id: &str,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Tenants owning at least one non-trashed appointment.
    async fn tenants_with_active_appointments(&self) -> Result<Vec<String>, AppointmentError>;

    /// Apply one conditional bulk status transition; returns the number of rows changed.
    async fn transition_statuses(
        &self,
        company_id: &str,
        rule: SweepRule,
        now: DateTime<Utc>,
    ) -> Result<u64, AppointmentError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_employee(&self, company_id: &str, id: Uuid) -> Result<Option<Employee>, AppointmentError>;

    /// `code` is already upper-cased by the caller.
    async fn find_client_by_code(&self, company_id: &str, code: &str) -> Result<Option<Client>, AppointmentError>;

    async fn find_service(&self, company_id: &str, id: Uuid) -> Result<Option<Service>, AppointmentError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find_by_appointment(
        &self,
        company_id: &str,
        appointment_id: Uuid,
    ) -> Result<Option<Payment>, AppointmentError>;

    async fn insert(&self, code: String, payment: &NewPayment) -> Result<Payment, AppointmentError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Returns `None` when a notification with the same dedup key already exists.
    async fn insert_if_absent(
        &self,
        notification: &NewNotification,
    ) -> Result<Option<Notification>, AppointmentError>;

    async fn list_for_tenant(&self, company_id: &str, limit: usize) -> Result<Vec<Notification>, AppointmentError>;
}

/// Per-tenant, per-kind monotonic counter. `next` must be an atomic
/// increment-and-read.
#[async_trait]
pub trait SequenceGenerator: Send + Sync {
    async fn next(&self, company_id: &str, kind: SequenceKind) -> Result<u64, AppointmentError>;

    async fn next_code(&self, company_id: &str, kind: SequenceKind) -> Result<String, AppointmentError> {
        let value = self.next(company_id, kind).await?;
        Ok(kind.format_code(value))
    }
}

/// The set of stores a scheduler runs against.
#[derive(Clone)]
pub struct AppointmentStores {
    pub appointments: Arc<dyn AppointmentStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub sequences: Arc<dyn SequenceGenerator>,
}

impl AppointmentStores {
    /// Every seam backed by the same in-process store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            appointments: store.clone(),
            directory: store.clone(),
            payments: store.clone(),
            notifications: store.clone(),
            sequences: store,
        }
    }

    pub fn supabase(config: &AppConfig) -> Self {
        let store = Arc::new(SupabaseStore::new(config));
        Self {
            appointments: store.clone(),
            directory: store.clone(),
            payments: store.clone(),
            notifications: store.clone(),
            sequences: store,
        }
    }

    pub fn with_sequences(mut self, sequences: Arc<dyn SequenceGenerator>) -> Self {
        self.sequences = sequences;
        self
    }
}
