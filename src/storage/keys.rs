//! Storage key constants shared by every store.

pub const TRANSACTIONS: &str = "finance-tracker-transactions";

pub const BUDGETS: &str = "finance-tracker-budgets";
pub const BUDGET_TEMPLATES: &str = "finance-tracker-budget-templates";
pub const BUDGET_ALERTS: &str = "finance-tracker-budget-alerts";
pub const BUDGET_SETTINGS: &str = "finance-tracker-budget-settings";

pub const USER_PREFERENCES: &str = "finance-tracker-preferences";
pub const APP_VERSION: &str = "finance-tracker-version";

/// Categories predate the shared key scheme and keep their own spelling.
pub const CATEGORIES: &str = "finance_tracker_categories";

/// Keys removed by the maintenance utility.
pub const LEGACY_KEYS: [&str; 3] = [TRANSACTIONS, USER_PREFERENCES, APP_VERSION];
