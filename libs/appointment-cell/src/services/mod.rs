pub mod booking;
pub mod clock;
pub mod duration;
pub mod followup;
pub mod lifecycle;
pub mod reconciliation;
pub mod store;
pub mod time;
