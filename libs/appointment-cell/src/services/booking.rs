// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentPatch, AppointmentStatus,
    NewNotification, NewPayment, Notification, NotificationType, ScheduleAppointmentRequest,
    ScheduledAppointment, SequenceKind, Service, TimeInput, UpdateAppointmentRequest,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::duration::DurationResolver;
use crate::services::followup::{FollowUpDispatcher, FollowUpOutcome, FollowUpTask};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::AppointmentStores;
use crate::services::time::TimeNormalizer;

pub struct AppointmentBookingService {
    stores: AppointmentStores,
    followups: Arc<FollowUpDispatcher>,
    normalizer: TimeNormalizer,
    durations: DurationResolver,
    lifecycle: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig, stores: AppointmentStores, followups: Arc<FollowUpDispatcher>) -> Self {
        Self {
            stores,
            followups,
            normalizer: TimeNormalizer::new(config.business_tz()),
            durations: DurationResolver::new(),
            lifecycle: AppointmentLifecycleService::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate references, derive the window and status, allocate the code and
    /// write the appointment. Payment and notification follow as idempotent
    /// follow-ups; their failure never fails the call once the appointment exists.
    #[instrument(skip(self, request), fields(company_id = %company_id))]
    pub async fn schedule_appointment(
        &self,
        company_id: &str,
        request: ScheduleAppointmentRequest,
    ) -> Result<ScheduledAppointment, AppointmentError> {
        info!("Scheduling appointment for client {} with employee {}", request.client_id, request.employee_id);

        let time_input = TimeInput::from_parts(
            request.date_time.as_deref(),
            request.date.as_deref(),
            request.time.as_deref(),
        )?;
        let start_time = self.normalizer.normalize(&time_input)?;

        self.stores
            .directory
            .find_employee(company_id, request.employee_id)
            .await?
            .ok_or(AppointmentError::StylistNotFound)?;

        let client_code = request.client_id.trim().to_uppercase();
        let client = self
            .stores
            .directory
            .find_client_by_code(company_id, &client_code)
            .await?
            .ok_or(AppointmentError::ClientNotFound)?;

        let service = self.find_service(company_id, request.service_id).await?;
        let expire_time = self.compute_expiry(start_time, &service)?;

        let now = self.clock.now();
        let status = self
            .lifecycle
            .classify(now, start_time, expire_time, AppointmentStatus::Upcoming);

        let code = self
            .stores
            .sequences
            .next_code(company_id, SequenceKind::Appointment)
            .await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            code,
            company_id: company_id.to_string(),
            client_id: client.id,
            client_code: client.client_code.clone(),
            employee_id: request.employee_id,
            service_id: service.id,
            start_time,
            display_time: self.normalizer.display_time(start_time),
            note: request.note,
            expire_time,
            paid_status: request.paid_status,
            status,
            is_trashed: false,
            created_at: now,
            updated_at: now,
        };

        let appointment = self.stores.appointments.insert(&appointment).await?;
        info!("Appointment {} ({}) scheduled as {}", appointment.code, appointment.id, appointment.status);

        let payment_code = if service.price > 0.0 {
            let task = FollowUpTask::payment(NewPayment {
                company_id: company_id.to_string(),
                appointment_id: appointment.id,
                client_id: client.id,
                amount: service.price,
                status: request.paid_status,
            });
            match self.followups.run_or_defer(task).await {
                Some(FollowUpOutcome::PaymentRecorded(payment)) => Some(payment.code),
                _ => None,
            }
        } else {
            debug!("Service {} is free, no payment recorded", service.id);
            None
        };

        let notification = self.notification_for(&appointment, &client.name, "scheduled".to_string());
        self.followups.run_or_defer(FollowUpTask::notification(notification)).await;

        Ok(ScheduledAppointment {
            expire_time_local: self.normalizer.render_with_offset(appointment.expire_time),
            appointment,
            time_input,
            payment_code,
        })
    }

    #[instrument(skip(self, request), fields(company_id = %company_id, appointment_id = %appointment_id))]
    pub async fn update_appointment(
        &self,
        company_id: &str,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.find_active(company_id, appointment_id).await?;
        let now = self.clock.now();
        let mut patch = AppointmentPatch::new(now);

        if let Some(employee_id) = request.employee_id {
            self.stores
                .directory
                .find_employee(company_id, employee_id)
                .await?
                .ok_or(AppointmentError::StylistNotFound)?;
            patch.employee_id = Some(employee_id);
        }

        if request.status == Some(AppointmentStatus::Cancelled) {
            let effective = self
                .lifecycle
                .classify(now, current.start_time, current.expire_time, current.status);
            self.lifecycle.validate_cancellation(effective)?;
            info!("Cancelling appointment {}", current.code);
            patch.status = Some(AppointmentStatus::Cancelled);
        } else if request.has_time_change() || request.service_id.is_some() {
            let start_time = if request.has_time_change() {
                let input = TimeInput::from_parts(
                    request.date_time.as_deref(),
                    request.date.as_deref(),
                    request.time.as_deref(),
                )?;
                self.normalizer.normalize(&input)?
            } else {
                current.start_time
            };

            let service = self
                .find_service(company_id, request.service_id.unwrap_or(current.service_id))
                .await?;
            let expire_time = self.compute_expiry(start_time, &service)?;

            debug!("Rescheduling {} to {} - {}", current.code, start_time, expire_time);
            patch.start_time = Some(start_time);
            patch.expire_time = Some(expire_time);
            patch.display_time = Some(self.normalizer.display_time(start_time));
            patch.service_id = Some(service.id);
            patch.status = Some(self.lifecycle.classify(now, start_time, expire_time, current.status));
        } else if let Some(requested) = request.status {
            let derived = self
                .lifecycle
                .classify(now, current.start_time, current.expire_time, current.status);
            if requested != derived {
                warn!("Requested status {} overridden by clock-derived {}", requested, derived);
            }
            patch.status = Some(derived);
        }

        patch.note = request.note;
        patch.paid_status = request.paid_status;

        let updated = self
            .stores
            .appointments
            .update(company_id, appointment_id, &patch)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)?;

        self.notify(&updated, format!("updated:{}", now.timestamp_millis())).await;
        info!("Appointment {} updated, status {}", updated.code, updated.status);

        Ok(updated)
    }

    /// Trashed records are reported as missing.
    pub async fn get_appointment(&self, company_id: &str, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.find_active(company_id, appointment_id).await
    }

    pub async fn list_appointments(
        &self,
        company_id: &str,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.stores.appointments.list(company_id, query).await
    }

    /// Soft delete. Trashing an already trashed record is a no-op.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn trash_appointment(&self, company_id: &str, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let current = self.find_any(company_id, appointment_id).await?;
        if current.is_trashed {
            return Ok(current);
        }

        let now = self.clock.now();
        let mut patch = AppointmentPatch::new(now);
        patch.is_trashed = Some(true);

        let trashed = self
            .stores
            .appointments
            .update(company_id, appointment_id, &patch)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)?;

        info!("Appointment {} moved to trash", trashed.code);
        self.notify(&trashed, format!("trashed:{}", now.timestamp_millis())).await;
        Ok(trashed)
    }

    /// Bring a trashed record back and re-derive its status, since the sweep
    /// skipped it while it was trashed.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn restore_appointment(&self, company_id: &str, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let current = self.find_any(company_id, appointment_id).await?;
        if !current.is_trashed {
            return Ok(current);
        }

        let now = self.clock.now();
        let mut patch = AppointmentPatch::new(now);
        patch.is_trashed = Some(false);
        patch.status = Some(
            self.lifecycle
                .classify(now, current.start_time, current.expire_time, current.status),
        );

        let restored = self
            .stores
            .appointments
            .update(company_id, appointment_id, &patch)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)?;

        info!("Appointment {} restored as {}", restored.code, restored.status);
        self.notify(&restored, format!("restored:{}", now.timestamp_millis())).await;
        Ok(restored)
    }

    pub async fn list_notifications(&self, company_id: &str, limit: usize) -> Result<Vec<Notification>, AppointmentError> {
        self.stores
            .notifications
            .list_for_tenant(company_id, limit.clamp(1, AppointmentListQuery::MAX_LIMIT))
            .await
    }

    // ==============================================================================
    // HELPERS
    // ==============================================================================

    async fn find_any(&self, company_id: &str, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.stores
            .appointments
            .find(company_id, appointment_id)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)
    }

    async fn find_active(&self, company_id: &str, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.find_any(company_id, appointment_id).await?;
        if appointment.is_trashed {
            return Err(AppointmentError::AppointmentNotFound);
        }
        Ok(appointment)
    }

    async fn find_service(&self, company_id: &str, service_id: Uuid) -> Result<Service, AppointmentError> {
        self.stores
            .directory
            .find_service(company_id, service_id)
            .await?
            .ok_or(AppointmentError::ServiceNotFound)
    }

    fn compute_expiry(&self, start_time: DateTime<Utc>, service: &Service) -> Result<DateTime<Utc>, AppointmentError> {
        let duration = self.durations.parse(&service.duration)?;
        if duration <= Duration::zero() {
            return Err(AppointmentError::InvalidExpireTimeCalculation);
        }

        start_time
            .checked_add_signed(duration)
            .ok_or(AppointmentError::InvalidExpireTimeCalculation)
    }

    fn notification_for(&self, appointment: &Appointment, client_name: &str, event: String) -> NewNotification {
        NewNotification {
            company_id: appointment.company_id.clone(),
            notification_type: NotificationType::Appointment,
            details: json!({
                "appointment_id": appointment.id,
                "code": appointment.code,
                "client_name": client_name,
                "status": appointment.status,
                "date": self.normalizer.display_date(appointment.start_time),
                "time": self.normalizer.display_clock(appointment.start_time),
                "paid_status": appointment.paid_status,
                "event": event.split(':').next().unwrap_or_default(),
            }),
            dedup_key: format!("notification:{}:{}", appointment.id, event),
        }
    }

    /// Emit a notification for a write that did not carry the client record.
    async fn notify(&self, appointment: &Appointment, event: String) {
        let client_name = match self
            .stores
            .directory
            .find_client_by_code(&appointment.company_id, &appointment.client_code)
            .await
        {
            Ok(Some(client)) => client.name,
            Ok(None) => appointment.client_code.clone(),
            Err(e) => {
                warn!("Client lookup for notification failed: {}", e);
                appointment.client_code.clone()
            }
        };

        let notification = self.notification_for(appointment, &client_name, event);
        self.followups.run_or_defer(FollowUpTask::notification(notification)).await;
    }
}
