// libs/appointment-cell/src/services/store/supabase.rs
use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Prefer, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentPatch, Client, Employee,
    NewNotification, NewPayment, Notification, Payment, SequenceKind, Service,
};
use crate::services::lifecycle::SweepRule;

use super::{AppointmentStore, DirectoryStore, NotificationStore, PaymentStore, SequenceGenerator};

/// PostgREST-backed store. Runs with the service-role key; the tenant filter
/// is part of every path built here.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

fn db_error(e: anyhow::Error) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn timestamp(instant: DateTime<Utc>) -> String {
    encode(&instant.to_rfc3339())
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::with_service_role(config),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AppointmentError> {
        self.supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(db_error)
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        prefer: Prefer,
    ) -> Result<Vec<T>, AppointmentError> {
        self.supabase
            .request_with_prefer(method, path, None, Some(body), Some(prefer))
            .await
            .map_err(db_error)
    }

    fn transition_filter(rule: SweepRule, now: DateTime<Utc>) -> String {
        let now = timestamp(now);
        match rule {
            SweepRule::Complete => format!(
                "expire_time=lte.{}&status=not.in.(Completed,Cancelled)",
                now
            ),
            SweepRule::Start => format!(
                "start_time=lte.{now}&expire_time=gt.{now}&status=not.in.(Ongoing,Cancelled)",
                now = now
            ),
            SweepRule::Reopen => format!(
                "start_time=gt.{}&status=not.in.(Upcoming,Cancelled)",
                now
            ),
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseStore {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let rows: Vec<Appointment> = self
            .write(Method::POST, "/rest/v1/appointments", body, Prefer::ReturnRepresentation)
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no appointment".to_string()))
    }

    async fn find(&self, company_id: &str, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&company_id=eq.{}",
            id,
            encode(company_id)
        );
        let rows: Vec<Appointment> = self.fetch(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn update(
        &self,
        company_id: &str,
        id: Uuid,
        patch: &AppointmentPatch,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&company_id=eq.{}",
            id,
            encode(company_id)
        );
        let body = serde_json::to_value(patch)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let rows: Vec<Appointment> = self
            .write(Method::PATCH, &path, body, Prefer::ReturnRepresentation)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list(
        &self,
        company_id: &str,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![format!("company_id=eq.{}", encode(company_id))];

        if !query.include_trashed.unwrap_or(false) {
            query_parts.push("is_trashed=eq.false".to_string());
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.desc&limit={}&offset={}",
            query_parts.join("&"),
            query.effective_limit(),
            query.effective_offset()
        );

        self.fetch(&path).await
    }

    /// Distinct tenants are computed by the `active_tenants` database function
    /// (`SELECT DISTINCT company_id .. WHERE NOT is_trashed`), so the result
    /// is one row per tenant and is not truncated by the server's row cap on
    /// appointment reads.
    async fn tenants_with_active_appointments(&self) -> Result<Vec<String>, AppointmentError> {
        let rows: Vec<Value> = self
            .supabase
            .rpc("active_tenants", json!({}))
            .await
            .map_err(db_error)?;

        let tenants: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row["company_id"].as_str().map(str::to_string))
            .collect();

        debug!("Found {} tenants with active appointments", tenants.len());
        Ok(tenants.into_iter().collect())
    }

    async fn transition_statuses(
        &self,
        company_id: &str,
        rule: SweepRule,
        now: DateTime<Utc>,
    ) -> Result<u64, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?company_id=eq.{}&is_trashed=eq.false&{}&select=id",
            encode(company_id),
            Self::transition_filter(rule, now)
        );
        let body = json!({
            "status": rule.target(),
            "updated_at": now,
        });

        let rows: Vec<Value> = self
            .write(Method::PATCH, &path, body, Prefer::ReturnRepresentation)
            .await?;

        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl DirectoryStore for SupabaseStore {
    async fn find_employee(&self, company_id: &str, id: Uuid) -> Result<Option<Employee>, AppointmentError> {
        let path = format!(
            "/rest/v1/employees?id=eq.{}&company_id=eq.{}&select=id,company_id,name",
            id,
            encode(company_id)
        );
        let rows: Vec<Employee> = self.fetch(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_client_by_code(&self, company_id: &str, code: &str) -> Result<Option<Client>, AppointmentError> {
        let path = format!(
            "/rest/v1/clients?client_code=eq.{}&company_id=eq.{}&select=id,company_id,client_code,name",
            encode(code),
            encode(company_id)
        );
        let rows: Vec<Client> = self.fetch(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_service(&self, company_id: &str, id: Uuid) -> Result<Option<Service>, AppointmentError> {
        let path = format!(
            "/rest/v1/services?id=eq.{}&company_id=eq.{}&select=id,company_id,name,duration,price",
            id,
            encode(company_id)
        );
        let rows: Vec<Service> = self.fetch(&path).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl PaymentStore for SupabaseStore {
    async fn find_by_appointment(
        &self,
        company_id: &str,
        appointment_id: Uuid,
    ) -> Result<Option<Payment>, AppointmentError> {
        let path = format!(
            "/rest/v1/payments?appointment_id=eq.{}&company_id=eq.{}",
            appointment_id,
            encode(company_id)
        );
        let rows: Vec<Payment> = self.fetch(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, code: String, payment: &NewPayment) -> Result<Payment, AppointmentError> {
        let body = json!({
            "code": code,
            "company_id": payment.company_id,
            "appointment_id": payment.appointment_id,
            "client_id": payment.client_id,
            "amount": payment.amount,
            "status": payment.status,
        });

        let rows: Vec<Payment> = self
            .write(Method::POST, "/rest/v1/payments", body, Prefer::ReturnRepresentation)
            .await?;

        let payment = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no payment".to_string()))?;

        info!("Payment {} recorded for appointment {}", payment.code, payment.appointment_id);
        Ok(payment)
    }
}

#[async_trait]
impl NotificationStore for SupabaseStore {
    async fn insert_if_absent(
        &self,
        notification: &NewNotification,
    ) -> Result<Option<Notification>, AppointmentError> {
        let body = serde_json::to_value(notification)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let rows: Vec<Notification> = self
            .write(
                Method::POST,
                "/rest/v1/notifications?on_conflict=dedup_key",
                body,
                Prefer::IgnoreDuplicates,
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn list_for_tenant(&self, company_id: &str, limit: usize) -> Result<Vec<Notification>, AppointmentError> {
        let path = format!(
            "/rest/v1/notifications?company_id=eq.{}&order=created_at.desc&limit={}",
            encode(company_id),
            limit
        );
        self.fetch(&path).await
    }
}

#[async_trait]
impl SequenceGenerator for SupabaseStore {
    /// Delegates to the `next_sequence` database function, which performs an
    /// `INSERT .. ON CONFLICT DO UPDATE .. RETURNING` on the tracker row.
    async fn next(&self, company_id: &str, kind: SequenceKind) -> Result<u64, AppointmentError> {
        self.supabase
            .rpc(
                "next_sequence",
                json!({ "p_company_id": company_id, "p_kind": kind.key() }),
            )
            .await
            .map_err(db_error)
    }
}
