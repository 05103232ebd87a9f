mod common;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::*;
use common::{Fixture, COMPANY, OTHER_COMPANY};

async fn schedule(fixture: &Fixture, date_time: &str) -> Appointment {
    fixture
        .state
        .booking
        .schedule_appointment(COMPANY, fixture.request_at(date_time))
        .await
        .expect("scheduling should succeed")
        .appointment
}

fn cancel() -> UpdateAppointmentRequest {
    UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Cancelled),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cancel_upcoming_is_sticky() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;

    let cancelled = fixture
        .state
        .booking
        .update_appointment(COMPANY, appointment.id, cancel())
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    // Well past the expiry; the sweep must leave it alone.
    fixture.clock.advance(Duration::days(1));
    let report = fixture.state.sweep.run_tick().await;
    assert_eq!(report.completed, 0);

    let stored = fixture.state.booking.get_appointment(COMPANY, appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);

    // A later reschedule does not revive it either.
    let rescheduled = fixture
        .state
        .booking
        .update_appointment(
            COMPANY,
            appointment.id,
            UpdateAppointmentRequest {
                date_time: Some("2024-06-05 12:00".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rescheduled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_requires_upcoming() {
    let fixture = Fixture::new().await;
    let ongoing = schedule(&fixture, "2024-06-01 09:50").await;
    let completed = schedule(&fixture, "2024-05-30 09:00").await;

    for appointment in [&ongoing, &completed] {
        let result = fixture
            .state
            .booking
            .update_appointment(COMPANY, appointment.id, cancel())
            .await;
        assert_matches!(result, Err(AppointmentError::OnlyUpcomingAppointmentsCanBeCancelled));
    }

    let stored = fixture.state.booking.get_appointment(COMPANY, ongoing.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Ongoing);
    assert_eq!(stored.updated_at, ongoing.updated_at);
}

#[tokio::test]
async fn test_cancel_uses_clock_not_stale_stored_status() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;
    assert_eq!(appointment.status, AppointmentStatus::Upcoming);

    // 12:10 local, no sweep tick in between: the row still says Upcoming.
    fixture.clock.advance(Duration::minutes(130));
    let stored = fixture.store.appointments_for(COMPANY).await;
    assert_eq!(stored[0].status, AppointmentStatus::Upcoming);

    let result = fixture
        .state
        .booking
        .update_appointment(COMPANY, appointment.id, cancel())
        .await;
    assert_matches!(result, Err(AppointmentError::OnlyUpcomingAppointmentsCanBeCancelled));

    let after = fixture.state.booking.get_appointment(COMPANY, appointment.id).await.unwrap();
    assert_ne!(after.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_reschedule_rederives_window_from_service_duration() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;

    let updated = fixture
        .state
        .booking
        .update_appointment(
            COMPANY,
            appointment.id,
            UpdateAppointmentRequest {
                date: Some("2024-06-01".to_string()),
                time: Some("09:45".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.start_time, Utc.with_ymd_and_hms(2024, 6, 1, 4, 15, 0).unwrap());
    assert_eq!(updated.expire_time, updated.start_time + Duration::minutes(30));
    assert_eq!(updated.display_time, "2024-06-01 09:45");
    assert_eq!(updated.status, AppointmentStatus::Ongoing);
    assert_eq!(updated.code, appointment.code);
}

#[tokio::test]
async fn test_service_change_recomputes_expiry() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;

    let updated = fixture
        .state
        .booking
        .update_appointment(
            COMPANY,
            appointment.id,
            UpdateAppointmentRequest {
                service_id: Some(fixture.free_service_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.start_time, appointment.start_time);
    assert_eq!(updated.duration_minutes(), 90);
    assert_eq!(updated.service_id, fixture.free_service_id);
}

#[tokio::test]
async fn test_explicit_status_is_overridden_by_clock() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;

    let updated = fixture
        .state
        .booking
        .update_appointment(
            COMPANY,
            appointment.id,
            UpdateAppointmentRequest {
                status: Some(AppointmentStatus::Completed),
                note: Some("walk-in".to_string()),
                paid_status: Some(PaidStatus::Paid),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Upcoming);
    assert_eq!(updated.note.as_deref(), Some("walk-in"));
    assert_eq!(updated.paid_status, PaidStatus::Paid);
}

#[tokio::test]
async fn test_update_validates_references() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;
    let booking = &fixture.state.booking;

    let result = booking
        .update_appointment(
            COMPANY,
            appointment.id,
            UpdateAppointmentRequest {
                employee_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(AppointmentError::StylistNotFound));

    let result = booking
        .update_appointment(
            COMPANY,
            appointment.id,
            UpdateAppointmentRequest {
                time: Some("10:00".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidAppointmentDateTime));

    let result = booking
        .update_appointment(COMPANY, Uuid::new_v4(), UpdateAppointmentRequest::default())
        .await;
    assert_matches!(result, Err(AppointmentError::AppointmentNotFound));

    // Another tenant cannot see the record.
    let result = booking
        .update_appointment(OTHER_COMPANY, appointment.id, cancel())
        .await;
    assert_matches!(result, Err(AppointmentError::AppointmentNotFound));
}

#[tokio::test]
async fn test_update_emits_notification() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;

    fixture.clock.advance(Duration::minutes(1));
    fixture
        .state
        .booking
        .update_appointment(COMPANY, appointment.id, cancel())
        .await
        .unwrap();

    let notifications = fixture.store.notifications_for(COMPANY).await;
    assert_eq!(notifications.len(), 2);
    let latest = &notifications[1];
    assert_eq!(latest.details["status"], "Cancelled");
    assert_eq!(latest.details["event"], "updated");
    assert_eq!(latest.details["client_name"], "Asha Rao");
}

#[tokio::test]
async fn test_trash_and_restore() {
    let fixture = Fixture::new().await;
    let appointment = schedule(&fixture, "2024-06-01 12:00").await;
    let booking = &fixture.state.booking;

    let trashed = booking.trash_appointment(COMPANY, appointment.id).await.unwrap();
    assert!(trashed.is_trashed);

    // Idempotent.
    let again = booking.trash_appointment(COMPANY, appointment.id).await.unwrap();
    assert_eq!(again.updated_at, trashed.updated_at);

    assert_matches!(
        booking.get_appointment(COMPANY, appointment.id).await,
        Err(AppointmentError::AppointmentNotFound)
    );
    assert_matches!(
        booking.update_appointment(COMPANY, appointment.id, cancel()).await,
        Err(AppointmentError::AppointmentNotFound)
    );

    let listed = booking
        .list_appointments(COMPANY, &AppointmentListQuery::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    let with_trash = booking
        .list_appointments(
            COMPANY,
            &AppointmentListQuery {
                include_trashed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(with_trash.len(), 1);

    // Trashed rows are skipped by the sweep, so restore re-derives status.
    fixture.clock.advance(Duration::hours(3));
    fixture.state.sweep.run_tick().await;

    let restored = booking.restore_appointment(COMPANY, appointment.id).await.unwrap();
    assert!(!restored.is_trashed);
    assert_eq!(restored.status, AppointmentStatus::Completed);

    // One notification each for schedule, trash and restore.
    assert_eq!(fixture.store.notifications_for(COMPANY).await.len(), 3);
}

#[tokio::test]
async fn test_list_filters_by_status_and_paginates() {
    let fixture = Fixture::new().await;
    schedule(&fixture, "2024-06-01 12:00").await;
    schedule(&fixture, "2024-06-01 13:00").await;
    schedule(&fixture, "2024-05-30 09:00").await;

    let booking = &fixture.state.booking;

    let upcoming = booking
        .list_appointments(
            COMPANY,
            &AppointmentListQuery {
                status: Some(AppointmentStatus::Upcoming),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 2);
    assert!(upcoming[0].start_time > upcoming[1].start_time);

    let page = booking
        .list_appointments(
            COMPANY,
            &AppointmentListQuery {
                limit: Some(1),
                offset: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].status, AppointmentStatus::Completed);
}
