#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use finance_tracker::{
    core::{FinanceTracker, FixedClock},
    storage::{JsonFileBackend, LocalStorage},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A fresh data directory that outlives the calling test.
pub fn temp_store_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 11, 20, 9, 30, 0).unwrap(),
    ))
}

/// Opens a tracker on a JSON-file store rooted at `dir`.
pub fn open_tracker(dir: &PathBuf) -> FinanceTracker {
    let storage = LocalStorage::new(JsonFileBackend::new(dir.join("store")));
    FinanceTracker::open(storage, clock())
}

/// Creates an isolated tracker backed by a unique directory.
pub fn setup_tracker() -> (FinanceTracker, PathBuf) {
    let dir = temp_store_dir();
    (open_tracker(&dir), dir)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
}
