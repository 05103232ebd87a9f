// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Derives appointment status from the clock. `Cancelled` is terminal and is
/// never produced or replaced here.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// `now < start` is Upcoming, `start <= now < expiry` is Ongoing and
    /// `now >= expiry` is Completed. The expiry instant itself counts as
    /// Completed so that this agrees with the sweep's bulk predicates.
    pub fn classify(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
        current_status: AppointmentStatus,
    ) -> AppointmentStatus {
        if current_status == AppointmentStatus::Cancelled {
            return AppointmentStatus::Cancelled;
        }

        if now < start {
            AppointmentStatus::Upcoming
        } else if now < expiry {
            AppointmentStatus::Ongoing
        } else {
            AppointmentStatus::Completed
        }
    }

    /// Cancellation is an explicit request and only legal from Upcoming.
    pub fn validate_cancellation(
        &self,
        current_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating cancellation from {}", current_status);

        match current_status {
            AppointmentStatus::Upcoming => Ok(()),
            other => {
                warn!("Rejected cancellation of appointment in status {}", other);
                Err(AppointmentError::OnlyUpcomingAppointmentsCanBeCancelled)
            }
        }
    }
}

/// One conditional bulk transition issued by the reconciliation sweep. Every
/// rule is additionally constrained to non-trashed, non-cancelled rows of one
/// tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepRule {
    /// `expire_time <= now` and status not in {Completed, Cancelled}.
    Complete,
    /// `start_time <= now < expire_time` and status not in {Ongoing, Cancelled}.
    Start,
    /// `start_time > now` and status not in {Upcoming, Cancelled}.
    Reopen,
}

impl SweepRule {
    /// Issue order within a tick.
    pub const ORDERED: [SweepRule; 3] = [SweepRule::Complete, SweepRule::Start, SweepRule::Reopen];

    pub fn target(&self) -> AppointmentStatus {
        match self {
            SweepRule::Complete => AppointmentStatus::Completed,
            SweepRule::Start => AppointmentStatus::Ongoing,
            SweepRule::Reopen => AppointmentStatus::Upcoming,
        }
    }

    /// Whether a row with this window and status is selected by the rule.
    pub fn matches(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> bool {
        if status == AppointmentStatus::Cancelled || status == self.target() {
            return false;
        }

        match self {
            SweepRule::Complete => expiry <= now,
            SweepRule::Start => start <= now && now < expiry,
            SweepRule::Reopen => start > now,
        }
    }
}
