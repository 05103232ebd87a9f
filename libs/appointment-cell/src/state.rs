// libs/appointment-cell/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;

use crate::services::booking::AppointmentBookingService;
use crate::services::clock::{Clock, SystemClock};
use crate::services::followup::{FollowUpDispatcher, FollowUpQueue};
use crate::services::reconciliation::ReconciliationSweep;
use crate::services::store::AppointmentStores;

/// Everything the appointment routes and workers share for the process lifetime.
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub booking: AppointmentBookingService,
    pub sweep: Arc<ReconciliationSweep>,
    pub followups: Arc<FollowUpDispatcher>,
}

impl AppointmentCellState {
    pub fn new(config: Arc<AppConfig>, stores: AppointmentStores, queue: Arc<dyn FollowUpQueue>) -> Self {
        Self::with_clock(config, stores, queue, Arc::new(SystemClock))
    }

    /// Same wiring with an injected clock, shared by scheduling and the sweep.
    pub fn with_clock(
        config: Arc<AppConfig>,
        stores: AppointmentStores,
        queue: Arc<dyn FollowUpQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let followups = Arc::new(FollowUpDispatcher::new(
            stores.payments.clone(),
            stores.notifications.clone(),
            stores.sequences.clone(),
            queue,
            config.followup_max_attempts,
        ));
        let sweep = Arc::new(ReconciliationSweep::new(stores.appointments.clone()).with_clock(clock.clone()));
        let booking = AppointmentBookingService::new(&config, stores, followups.clone()).with_clock(clock);

        Self {
            config,
            booking,
            sweep,
            followups,
        }
    }
}
