// libs/appointment-cell/src/services/reconciliation.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::models::{AppointmentError, SweepReport, TenantSweepResult};
use crate::services::clock::{Clock, SystemClock};
use crate::services::lifecycle::SweepRule;
use crate::services::store::AppointmentStore;

/// Re-derives appointment status from the clock for every tenant.
pub struct ReconciliationSweep {
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
}

/// Clears the re-entrancy flag even if the tick unwinds.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ReconciliationSweep {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self {
            appointments,
            clock: Arc::new(SystemClock),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The three bulk transitions for one tenant, Completed first so the
    /// expiry instant resolves to Completed.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn reconcile_statuses(
        &self,
        company_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TenantSweepResult, AppointmentError> {
        let mut result = TenantSweepResult::default();

        for rule in SweepRule::ORDERED {
            let changed = self.appointments.transition_statuses(company_id, rule, now).await?;
            match rule {
                SweepRule::Complete => result.completed = changed,
                SweepRule::Start => result.ongoing = changed,
                SweepRule::Reopen => result.upcoming = changed,
            }
        }

        debug!(
            "Tenant {} reconciled: {} completed, {} ongoing, {} upcoming",
            company_id, result.completed, result.ongoing, result.upcoming
        );
        Ok(result)
    }

    /// On-demand reconciliation of one tenant at the current time.
    pub async fn reconcile_tenant(&self, company_id: &str) -> Result<TenantSweepResult, AppointmentError> {
        self.reconcile_statuses(company_id, self.clock.now()).await
    }

    /// One sweep tick over every tenant. Never fails: tenant errors are logged
    /// and counted, and a tick that finds another one in flight is skipped.
    pub async fn run_tick(&self) -> SweepReport {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous status sweep still running, skipping tick");
            return SweepReport {
                skipped: true,
                ..SweepReport::default()
            };
        }
        let _guard = TickGuard(&self.running);

        let now = self.clock.now();
        let mut report = SweepReport::default();

        let tenants = match self.appointments.tenants_with_active_appointments().await {
            Ok(tenants) => tenants,
            Err(e) => {
                error!("Status sweep could not list tenants: {}", e);
                return report;
            }
        };

        for company_id in tenants {
            match self.reconcile_statuses(&company_id, now).await {
                Ok(result) => {
                    report.tenants_processed += 1;
                    report.completed += result.completed;
                    report.ongoing += result.ongoing;
                    report.upcoming += result.upcoming;
                }
                Err(e) => {
                    error!("Status sweep failed for company {}: {}", company_id, e);
                    report.tenants_failed += 1;
                }
            }
        }

        if report.completed + report.ongoing + report.upcoming > 0 || report.tenants_failed > 0 {
            info!(
                "Status sweep: {} tenants, {} failed, {} completed, {} ongoing, {} upcoming",
                report.tenants_processed,
                report.tenants_failed,
                report.completed,
                report.ongoing,
                report.upcoming
            );
        }

        report
    }
}

pub struct StatusSweepWorker {
    sweep: Arc<ReconciliationSweep>,
    interval_seconds: u64,
    is_shutdown: RwLock<bool>,
}

impl StatusSweepWorker {
    pub fn new(sweep: Arc<ReconciliationSweep>, interval_seconds: u64) -> Self {
        Self {
            sweep,
            interval_seconds: interval_seconds.max(1),
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn run(self: Arc<Self>) {
        info!("Status sweep worker started (every {}s)", self.interval_seconds);
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                break;
            }

            self.sweep.run_tick().await;
        }

        info!("Status sweep worker stopped");
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}
