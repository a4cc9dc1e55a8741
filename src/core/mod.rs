//! Stores, reconciliation logic and the application façade.

pub mod errors;
pub mod services;
pub mod time;
pub mod tracker;

pub use errors::FinanceError;
pub use time::{Clock, FixedClock, SystemClock};
pub use tracker::FinanceTracker;
