#![doc(test(attr(deny(warnings))))]

//! Finance Tracker records income and expense transactions, organises them
//! into categories, and reconciles them against monthly budgets. All state
//! lives in a local key-value store of JSON documents.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup debug log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::debug!("Finance Tracker tracing initialized.");
    });
}
