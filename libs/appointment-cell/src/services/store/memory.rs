// libs/appointment-cell/src/services/store/memory.rs
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentPatch, Client, Employee,
    NewNotification, NewPayment, Notification, Payment, SequenceKind, Service,
};
use crate::services::lifecycle::SweepRule;

use super::{AppointmentStore, DirectoryStore, NotificationStore, PaymentStore, SequenceGenerator};

#[derive(Debug, Default)]
struct MemoryState {
    appointments: HashMap<Uuid, Appointment>,
    employees: HashMap<Uuid, Employee>,
    clients: Vec<Client>,
    services: HashMap<Uuid, Service>,
    payments: Vec<Payment>,
    notifications: Vec<Notification>,
    counters: HashMap<(String, SequenceKind), u64>,
}

/// Process-local store. Serves local development without a database and
/// backs the test suite; all writes go through one lock so the counter
/// increment is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_employee(&self, employee: Employee) {
        self.state.write().await.employees.insert(employee.id, employee);
    }

    pub async fn add_client(&self, client: Client) {
        self.state.write().await.clients.push(client);
    }

    pub async fn add_service(&self, service: Service) {
        self.state.write().await.services.insert(service.id, service);
    }

    pub async fn appointments_for(&self, company_id: &str) -> Vec<Appointment> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|apt| apt.company_id == company_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| a.code.cmp(&b.code));
        appointments
    }

    pub async fn payments_for(&self, company_id: &str) -> Vec<Payment> {
        self.state
            .read()
            .await
            .payments
            .iter()
            .filter(|payment| payment.company_id == company_id)
            .cloned()
            .collect()
    }

    pub async fn notifications_for(&self, company_id: &str) -> Vec<Notification> {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .filter(|notification| notification.company_id == company_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let mut state = self.state.write().await;
        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find(&self, company_id: &str, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let state = self.state.read().await;
        Ok(state
            .appointments
            .get(&id)
            .filter(|apt| apt.company_id == company_id)
            .cloned())
    }

    async fn update(
        &self,
        company_id: &str,
        id: Uuid,
        patch: &AppointmentPatch,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let mut state = self.state.write().await;
        match state.appointments.get_mut(&id) {
            Some(appointment) if appointment.company_id == company_id => {
                patch.apply_to(appointment);
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list(
        &self,
        company_id: &str,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let include_trashed = query.include_trashed.unwrap_or(false);
        let state = self.state.read().await;

        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|apt| apt.company_id == company_id)
            .filter(|apt| include_trashed || !apt.is_trashed)
            .filter(|apt| query.status.map(|status| apt.status == status).unwrap_or(true))
            .cloned()
            .collect();

        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        Ok(appointments
            .into_iter()
            .skip(query.effective_offset())
            .take(query.effective_limit())
            .collect())
    }

    async fn tenants_with_active_appointments(&self) -> Result<Vec<String>, AppointmentError> {
        let state = self.state.read().await;
        let tenants: BTreeSet<String> = state
            .appointments
            .values()
            .filter(|apt| !apt.is_trashed)
            .map(|apt| apt.company_id.clone())
            .collect();
        Ok(tenants.into_iter().collect())
    }

    async fn transition_statuses(
        &self,
        company_id: &str,
        rule: SweepRule,
        now: DateTime<Utc>,
    ) -> Result<u64, AppointmentError> {
        let mut state = self.state.write().await;
        let mut changed = 0;

        for appointment in state.appointments.values_mut() {
            if appointment.company_id != company_id || appointment.is_trashed {
                continue;
            }
            if rule.matches(now, appointment.start_time, appointment.expire_time, appointment.status) {
                appointment.status = rule.target();
                appointment.updated_at = now;
                changed += 1;
            }
        }

        debug!("{:?} moved {} appointments for company {}", rule, changed, company_id);
        Ok(changed)
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn find_employee(&self, company_id: &str, id: Uuid) -> Result<Option<Employee>, AppointmentError> {
        let state = self.state.read().await;
        Ok(state
            .employees
            .get(&id)
            .filter(|employee| employee.company_id == company_id)
            .cloned())
    }

    async fn find_client_by_code(&self, company_id: &str, code: &str) -> Result<Option<Client>, AppointmentError> {
        let state = self.state.read().await;
        Ok(state
            .clients
            .iter()
            .find(|client| client.company_id == company_id && client.client_code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn find_service(&self, company_id: &str, id: Uuid) -> Result<Option<Service>, AppointmentError> {
        let state = self.state.read().await;
        Ok(state
            .services
            .get(&id)
            .filter(|service| service.company_id == company_id)
            .cloned())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn find_by_appointment(
        &self,
        company_id: &str,
        appointment_id: Uuid,
    ) -> Result<Option<Payment>, AppointmentError> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .find(|payment| payment.company_id == company_id && payment.appointment_id == appointment_id)
            .cloned())
    }

    async fn insert(&self, code: String, payment: &NewPayment) -> Result<Payment, AppointmentError> {
        let record = Payment {
            id: Uuid::new_v4(),
            code,
            company_id: payment.company_id.clone(),
            appointment_id: payment.appointment_id,
            client_id: payment.client_id,
            amount: payment.amount,
            status: payment.status,
            created_at: Utc::now(),
        };
        self.state.write().await.payments.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_if_absent(
        &self,
        notification: &NewNotification,
    ) -> Result<Option<Notification>, AppointmentError> {
        let mut state = self.state.write().await;
        if state
            .notifications
            .iter()
            .any(|existing| existing.dedup_key == notification.dedup_key)
        {
            return Ok(None);
        }

        let record = Notification {
            id: Uuid::new_v4(),
            company_id: notification.company_id.clone(),
            notification_type: notification.notification_type,
            details: notification.details.clone(),
            dedup_key: notification.dedup_key.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        state.notifications.push(record.clone());
        Ok(Some(record))
    }

    async fn list_for_tenant(&self, company_id: &str, limit: usize) -> Result<Vec<Notification>, AppointmentError> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|notification| notification.company_id == company_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SequenceGenerator for InMemoryStore {
    async fn next(&self, company_id: &str, kind: SequenceKind) -> Result<u64, AppointmentError> {
        let mut state = self.state.write().await;
        let counter = state
            .counters
            .entry((company_id.to_string(), kind))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}
