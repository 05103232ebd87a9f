// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    /// Tenant-scoped sequential code, e.g. `#APT001`.
    pub code: String,
    pub company_id: String,
    pub client_id: Uuid,
    pub client_code: String,
    pub employee_id: Uuid,
    pub service_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// Wall-clock start in the business timezone, `YYYY-MM-DD HH:mm`.
    pub display_time: String,
    pub note: Option<String>,
    pub expire_time: DateTime<Utc>,
    pub paid_status: PaidStatus,
    pub status: AppointmentStatus,
    pub is_trashed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.expire_time - self.start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Upcoming => "Upcoming",
            AppointmentStatus::Ongoing => "Ongoing",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaidStatus {
    #[serde(rename = "paid")]
    Paid,
    #[serde(rename = "un-paid", alias = "unpaid")]
    #[default]
    UnPaid,
    #[serde(rename = "processing")]
    Processing,
}

impl fmt::Display for PaidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaidStatus::Paid => write!(f, "paid"),
            PaidStatus::UnPaid => write!(f, "un-paid"),
            PaidStatus::Processing => write!(f, "processing"),
        }
    }
}

// ==============================================================================
// TIME INPUT
// ==============================================================================

/// The two accepted shapes of appointment start input, both read as wall-clock
/// time in the business timezone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimeInput {
    Combined { date_time: String },
    Split { date: String, time: String },
}

impl TimeInput {
    /// Exactly one complete shape must be supplied.
    pub fn from_parts(
        date_time: Option<&str>,
        date: Option<&str>,
        time: Option<&str>,
    ) -> Result<Self, AppointmentError> {
        let date_time = date_time.map(str::trim).filter(|s| !s.is_empty());
        let date = date.map(str::trim).filter(|s| !s.is_empty());
        let time = time.map(str::trim).filter(|s| !s.is_empty());

        match (date_time, date, time) {
            (Some(combined), None, None) => Ok(TimeInput::Combined {
                date_time: combined.to_string(),
            }),
            (None, Some(date), Some(time)) => Ok(TimeInput::Split {
                date: date.to_string(),
                time: time.to_string(),
            }),
            _ => Err(AppointmentError::InvalidAppointmentDateTime),
        }
    }

    /// Whether any part of a time input was supplied at all.
    pub fn is_present(date_time: Option<&str>, date: Option<&str>, time: Option<&str>) -> bool {
        [date_time, date, time]
            .iter()
            .any(|part| part.map(|s| !s.trim().is_empty()).unwrap_or(false))
    }
}

// ==============================================================================
// DIRECTORY RECORDS (read-only lookups)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub company_id: String,
    pub client_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub company_id: String,
    pub name: String,
    /// Human-entered, e.g. `30 mins` or `1.5 hours`.
    pub duration: String,
    pub price: f64,
}

// ==============================================================================
// COMPANION RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub code: String,
    pub company_id: String,
    pub appointment_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub status: PaidStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPayment {
    pub company_id: String,
    pub appointment_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub status: PaidStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationType {
    Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub company_id: String,
    pub notification_type: NotificationType,
    pub details: Value,
    pub dedup_key: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNotification {
    pub company_id: String,
    pub notification_type: NotificationType,
    pub details: Value,
    pub dedup_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    Appointment,
    Payment,
}

impl SequenceKind {
    pub fn key(&self) -> &'static str {
        match self {
            SequenceKind::Appointment => "appointment",
            SequenceKind::Payment => "payment",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceKind::Appointment => "#APT",
            SequenceKind::Payment => "#TXN",
        }
    }

    /// `#APT001`, `#APT002`, ... widening past three digits as needed.
    pub fn format_code(&self, value: u64) -> String {
        format!("{}{:03}", self.prefix(), value)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    /// Tenant-scoped client code, matched case-insensitively.
    pub client_id: String,
    pub employee_id: Uuid,
    pub service_id: Uuid,
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub paid_status: PaidStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAppointment {
    pub appointment: Appointment,
    /// Expiry in the business timezone with its UTC offset.
    pub expire_time_local: String,
    pub time_input: TimeInput,
    pub payment_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub note: Option<String>,
    pub employee_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub paid_status: Option<PaidStatus>,
}

impl UpdateAppointmentRequest {
    pub fn has_time_change(&self) -> bool {
        TimeInput::is_present(self.date_time.as_deref(), self.date.as_deref(), self.time.as_deref())
    }
}

/// Field changes applied by a single update write.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_status: Option<PaidStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_trashed: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentPatch {
    pub fn new(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            ..Self::default()
        }
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(start_time) = self.start_time {
            appointment.start_time = start_time;
        }
        if let Some(expire_time) = self.expire_time {
            appointment.expire_time = expire_time;
        }
        if let Some(display_time) = &self.display_time {
            appointment.display_time = display_time.clone();
        }
        if let Some(note) = &self.note {
            appointment.note = Some(note.clone());
        }
        if let Some(employee_id) = self.employee_id {
            appointment.employee_id = employee_id;
        }
        if let Some(service_id) = self.service_id {
            appointment.service_id = service_id;
        }
        if let Some(paid_status) = self.paid_status {
            appointment.paid_status = paid_status;
        }
        if let Some(is_trashed) = self.is_trashed {
            appointment.is_trashed = is_trashed;
        }
        appointment.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    pub include_trashed: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AppointmentListQuery {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 200;

    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Outcome of one sweep tick across every tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub tenants_processed: usize,
    pub tenants_failed: usize,
    pub completed: u64,
    pub ongoing: u64,
    pub upcoming: u64,
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantSweepResult {
    pub completed: u64,
    pub ongoing: u64,
    pub upcoming: u64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid appointment date or time")]
    InvalidAppointmentDateTime,

    #[error("Invalid duration format: {0}")]
    InvalidDurationFormat(String),

    #[error("Unsupported duration unit: {0}")]
    UnsupportedDurationUnit(String),

    #[error("Could not calculate the appointment expiry time")]
    InvalidExpireTimeCalculation,

    #[error("Stylist not found")]
    StylistNotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Only upcoming appointments can be cancelled")]
    OnlyUpcomingAppointmentsCanBeCancelled,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Queue error: {0}")]
    QueueError(String),
}
