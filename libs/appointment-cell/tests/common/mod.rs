#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{Client, Employee, PaidStatus, ScheduleAppointmentRequest, Service};
use appointment_cell::services::clock::FixedClock;
use appointment_cell::services::followup::InMemoryFollowUpQueue;
use appointment_cell::services::store::{AppointmentStores, InMemoryStore};
use appointment_cell::AppointmentCellState;
use shared_utils::test_utils::TestConfig;

pub const COMPANY: &str = "COMP001";
pub const OTHER_COMPANY: &str = "COMP002";

/// 2024-06-01 10:00 in Asia/Kolkata.
pub fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 4, 30, 0).unwrap()
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub queue: Arc<InMemoryFollowUpQueue>,
    pub state: Arc<AppointmentCellState>,
    pub employee_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub free_service_id: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_stores(|stores| stores).await
    }

    /// Builds the fixture, letting the caller swap individual seams.
    pub async fn with_stores(customize: impl FnOnce(AppointmentStores) -> AppointmentStores) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let employee_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let service_id = Uuid::new_v4();
        let free_service_id = Uuid::new_v4();

        for company in [COMPANY, OTHER_COMPANY] {
            store
                .add_client(Client {
                    id: if company == COMPANY { client_id } else { Uuid::new_v4() },
                    company_id: company.to_string(),
                    client_code: "CL001".to_string(),
                    name: "Asha Rao".to_string(),
                })
                .await;
        }
        store
            .add_employee(Employee {
                id: employee_id,
                company_id: COMPANY.to_string(),
                name: "E1".to_string(),
            })
            .await;
        store
            .add_service(Service {
                id: service_id,
                company_id: COMPANY.to_string(),
                name: "Haircut".to_string(),
                duration: "30 mins".to_string(),
                price: 500.0,
            })
            .await;
        store
            .add_service(Service {
                id: free_service_id,
                company_id: COMPANY.to_string(),
                name: "Consultation".to_string(),
                duration: "1.5 hours".to_string(),
                price: 0.0,
            })
            .await;

        let clock = Arc::new(FixedClock::new(base_now()));
        let queue = Arc::new(InMemoryFollowUpQueue::new());
        let stores = customize(AppointmentStores::in_memory(store.clone()));

        let state = Arc::new(AppointmentCellState::with_clock(
            TestConfig::default().to_arc(),
            stores,
            queue.clone(),
            clock.clone(),
        ));

        Self {
            store,
            clock,
            queue,
            state,
            employee_id,
            client_id,
            service_id,
            free_service_id,
        }
    }

    /// A combined-time request for client `CL001` with the paid service.
    pub fn request_at(&self, date_time: &str) -> ScheduleAppointmentRequest {
        ScheduleAppointmentRequest {
            client_id: "CL001".to_string(),
            employee_id: self.employee_id,
            service_id: self.service_id,
            date_time: Some(date_time.to_string()),
            date: None,
            time: None,
            note: None,
            paid_status: PaidStatus::UnPaid,
        }
    }

    pub fn split_request(&self, date: &str, time: &str) -> ScheduleAppointmentRequest {
        ScheduleAppointmentRequest {
            date_time: None,
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            ..self.request_at("unused")
        }
    }
}
