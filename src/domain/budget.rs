//! Monthly budgets, reusable templates, threshold alerts and the pure
//! recomputation rules that keep their derived fields consistent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::common::{total_of, Displayable, EntryType, NamedEntity};
use crate::domain::transaction::Transaction;

pub const DEFAULT_WARNING_THRESHOLD: f64 = 80.0;
pub const DEFAULT_ALERT_THRESHOLD: f64 = 100.0;

/// Colors handed out to categories created without one.
pub const CATEGORY_PALETTE: [&str; 10] = [
    "#ef4444", "#f59e0b", "#10b981", "#3b82f6", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
    "#f97316", "#6366f1",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for `month` in 1..=12.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(index as usize))
        .copied()
        .unwrap_or("Unknown")
}

pub fn palette_color(index: usize) -> &'static str {
    CATEGORY_PALETTE[index % CATEGORY_PALETTE.len()]
}

/// Health of a single budget line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Healthy,
    Warning,
    Exceeded,
    /// Nothing budgeted, so no percentage can be judged.
    Undefined,
}

impl BudgetStatus {
    pub fn classify(budgeted: f64, percentage: f64, settings: &BudgetSettings) -> Self {
        if budgeted <= 0.0 {
            BudgetStatus::Undefined
        } else if percentage >= settings.alert_threshold {
            BudgetStatus::Exceeded
        } else if percentage >= settings.warning_threshold {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Healthy
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetStatus::Healthy => "healthy",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Exceeded => "exceeded",
            BudgetStatus::Undefined => "undefined",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSettings {
    pub warning_threshold: f64,
    pub alert_threshold: f64,
    pub rollover_unused: bool,
    pub auto_create_next: bool,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            rollover_unused: false,
            auto_create_next: true,
        }
    }
}

impl BudgetSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.warning_threshold.is_finite() && self.warning_threshold >= 0.0) {
            return Err("warning threshold must be a non-negative number".into());
        }
        if !(self.alert_threshold.is_finite() && self.alert_threshold >= 0.0) {
            return Err("alert threshold must be a non-negative number".into());
        }
        if self.warning_threshold > self.alert_threshold {
            return Err("warning threshold cannot exceed the alert threshold".into());
        }
        Ok(())
    }

    pub fn merged(mut self, patch: &BudgetSettingsPatch) -> Self {
        if let Some(value) = patch.warning_threshold {
            self.warning_threshold = value;
        }
        if let Some(value) = patch.alert_threshold {
            self.alert_threshold = value;
        }
        if let Some(value) = patch.rollover_unused {
            self.rollover_unused = value;
        }
        if let Some(value) = patch.auto_create_next {
            self.auto_create_next = value;
        }
        self
    }
}

/// Partial settings supplied with a budget request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollover_unused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_next: Option<bool>,
}

impl From<BudgetSettings> for BudgetSettingsPatch {
    fn from(settings: BudgetSettings) -> Self {
        Self {
            warning_threshold: Some(settings.warning_threshold),
            alert_threshold: Some(settings.alert_threshold),
            rollover_unused: Some(settings.rollover_unused),
            auto_create_next: Some(settings.auto_create_next),
        }
    }
}

/// One line of a budget: what was planned and what actually happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub budgeted_amount: f64,
    pub spent_amount: f64,
    pub remaining: f64,
    pub percentage: f64,
    pub status: BudgetStatus,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BudgetCategory {
    pub fn from_input(id: String, input: &BudgetCategoryInput, fallback_color: &str) -> Self {
        let mut category = Self {
            id,
            name: input.name.trim().to_string(),
            kind: input.kind,
            budgeted_amount: input.budgeted_amount,
            spent_amount: 0.0,
            remaining: input.budgeted_amount,
            percentage: 0.0,
            status: BudgetStatus::Healthy,
            color: input
                .color
                .clone()
                .unwrap_or_else(|| fallback_color.to_string()),
            icon: input
                .icon
                .clone()
                .or_else(|| Some(input.kind.default_icon().to_string())),
            description: input.description.clone(),
        };
        category.refresh(&BudgetSettings::default());
        category
    }

    /// Recomputes remaining, percentage and status from the two amounts.
    pub fn refresh(&mut self, settings: &BudgetSettings) {
        self.remaining = self.budgeted_amount - self.spent_amount;
        self.percentage = if self.budgeted_amount > 0.0 {
            self.spent_amount / self.budgeted_amount * 100.0
        } else {
            0.0
        };
        self.status = BudgetStatus::classify(self.budgeted_amount, self.percentage, settings);
    }

    pub fn matches(&self, name: &str, kind: EntryType) -> bool {
        self.kind == kind && self.name == name
    }
}

impl NamedEntity for BudgetCategory {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTotals {
    pub budgeted_income: f64,
    pub budgeted_expenses: f64,
    pub actual_income: f64,
    pub actual_expenses: f64,
    /// budgeted income - budgeted expenses
    pub projected_balance: f64,
    /// actual income - actual expenses
    pub actual_balance: f64,
    /// actual balance - projected balance
    pub variance: f64,
}

impl BudgetTotals {
    pub fn from_categories(categories: &[BudgetCategory]) -> Self {
        let sum = |kind: EntryType, pick: fn(&BudgetCategory) -> f64| {
            total_of(categories.iter().filter(|cat| cat.kind == kind).map(pick))
        };
        let budgeted_income = sum(EntryType::Income, |cat| cat.budgeted_amount);
        let budgeted_expenses = sum(EntryType::Expense, |cat| cat.budgeted_amount);
        let actual_income = sum(EntryType::Income, |cat| cat.spent_amount);
        let actual_expenses = sum(EntryType::Expense, |cat| cat.spent_amount);
        let projected_balance = budgeted_income - budgeted_expenses;
        let actual_balance = actual_income - actual_expenses;
        Self {
            budgeted_income,
            budgeted_expenses,
            actual_income,
            actual_expenses,
            projected_balance,
            actual_balance,
            variance: actual_balance - projected_balance,
        }
    }

    /// Totals of a freshly created budget: nothing spent yet, no variance.
    pub fn initial(categories: &[BudgetCategory]) -> Self {
        let planned = Self::from_categories(categories);
        Self {
            actual_income: 0.0,
            actual_expenses: 0.0,
            actual_balance: 0.0,
            variance: 0.0,
            ..planned
        }
    }
}

/// Planned allocation for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub name: String,
    pub month: u32,
    pub year: i32,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub is_active: bool,
    pub categories: Vec<BudgetCategory>,
    pub totals: BudgetTotals,
    pub settings: BudgetSettings,
}

impl Budget {
    pub fn is_for(&self, month: u32, year: i32) -> bool {
        self.month == month && self.year == year
    }

    pub fn category(&self, id: &str) -> Option<&BudgetCategory> {
        self.categories.iter().find(|cat| cat.id == id)
    }

    pub fn category_mut(&mut self, id: &str) -> Option<&mut BudgetCategory> {
        self.categories.iter_mut().find(|cat| cat.id == id)
    }

    pub fn find_category(&self, name: &str, kind: EntryType) -> Option<&BudgetCategory> {
        self.categories.iter().find(|cat| cat.matches(name, kind))
    }

    pub fn recalculate_totals(&mut self) {
        self.totals = BudgetTotals::from_categories(&self.categories);
    }

    pub fn refresh_categories(&mut self) {
        let settings = self.settings;
        for category in &mut self.categories {
            category.refresh(&settings);
        }
    }

    /// Replaces every spent amount with the matching transactions of this
    /// budget's month, then refreshes derived fields and totals.
    pub fn apply_transactions(&mut self, transactions: &[Transaction]) {
        let (month, year) = (self.month, self.year);
        for category in &mut self.categories {
            category.spent_amount = total_of(
                transactions
                    .iter()
                    .filter(|txn| txn.falls_in(month, year))
                    .filter(|txn| category.matches(&txn.category, txn.kind))
                    .map(Transaction::magnitude),
            );
        }
        self.refresh_categories();
        self.recalculate_totals();
    }

    pub fn period_label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

impl NamedEntity for Budget {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Budget {
    fn display_label(&self) -> String {
        let marker = if self.is_active { " *" } else { "" };
        format!("{} [{}]{}", self.name, self.period_label(), marker)
    }
}

/// One requested budget line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategoryInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub budgeted_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BudgetCategoryInput {
    pub fn new(name: impl Into<String>, kind: EntryType, budgeted_amount: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            budgeted_amount,
            color: None,
            icon: None,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("budget category name must not be empty".into());
        }
        if !self.budgeted_amount.is_finite() || self.budgeted_amount < 0.0 {
            return Err(format!(
                "budgeted amount for `{}` must be zero or more",
                self.name.trim()
            ));
        }
        Ok(())
    }
}

impl From<&BudgetCategory> for BudgetCategoryInput {
    fn from(category: &BudgetCategory) -> Self {
        Self {
            name: category.name.clone(),
            kind: category.kind,
            budgeted_amount: category.budgeted_amount,
            color: Some(category.color.clone()),
            icon: category.icon.clone(),
            description: category.description.clone(),
        }
    }
}

/// Request to create a budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub month: u32,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_from_budget_id: Option<String>,
    pub categories: Vec<BudgetCategoryInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<BudgetSettingsPatch>,
}

impl CreateBudgetDto {
    pub fn new(month: u32, year: i32) -> Self {
        Self {
            month,
            year,
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: BudgetCategoryInput) -> Self {
        self.categories.push(category);
        self
    }

    /// Drops the entry at `index`; out-of-range indexes are ignored.
    pub fn remove_category(&mut self, index: usize) -> Option<BudgetCategoryInput> {
        (index < self.categories.len()).then(|| self.categories.remove(index))
    }
}

/// Partial edit of budget-level fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    pub settings: Option<BudgetSettingsPatch>,
}

/// Partial edit of a budget line. Derived fields cannot be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetCategoryUpdate {
    pub name: Option<String>,
    pub budgeted_amount: Option<f64>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCategory {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub default_amount: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateCategory {
    pub fn to_input(&self) -> BudgetCategoryInput {
        BudgetCategoryInput {
            name: self.name.clone(),
            kind: self.kind,
            budgeted_amount: self.default_amount,
            color: Some(self.color.clone()),
            icon: self.icon.clone(),
            description: self.description.clone(),
        }
    }
}

/// Reusable set of budget lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_default: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub categories: Vec<TemplateCategory>,
    pub default_settings: BudgetSettings,
}

impl NamedEntity for BudgetTemplate {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for BudgetTemplate {
    fn display_label(&self) -> String {
        let marker = if self.is_default { " (default)" } else { "" };
        format!("{}{}", self.name, marker)
    }
}

/// Request to create a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub categories: Vec<BudgetCategoryInput>,
    pub default_settings: BudgetSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Exceeded,
    Depleted,
}

impl AlertKind {
    pub fn severity(self) -> AlertSeverity {
        match self {
            AlertKind::Warning => AlertSeverity::Medium,
            AlertKind::Exceeded | AlertKind::Depleted => AlertSeverity::High,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertKind::Warning => "warning",
            AlertKind::Exceeded => "exceeded",
            AlertKind::Depleted => "depleted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        };
        f.write_str(label)
    }
}

/// Notice that a budget line crossed a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    pub id: String,
    pub budget_id: String,
    pub category_id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub severity: AlertSeverity,
    pub date_created: DateTime<Utc>,
    pub is_read: bool,
    pub is_active: bool,
}

impl BudgetAlert {
    pub fn is_same_condition(&self, budget_id: &str, category_id: &str, kind: AlertKind) -> bool {
        self.budget_id == budget_id && self.category_id == category_id && self.kind == kind
    }
}

pub fn alert_message(category: &BudgetCategory, kind: AlertKind) -> String {
    match kind {
        AlertKind::Warning => format!(
            "Heads up: you have spent {:.1}% of the {} budget",
            category.percentage, category.name
        ),
        AlertKind::Exceeded => format!(
            "Budget exceeded! You have spent {:.1}% in {}",
            category.percentage, category.name
        ),
        AlertKind::Depleted => format!("Budget depleted in {}", category.name),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// 0-100, how closely the plan was followed.
    pub overall_score: f64,
    pub categories_on_track: usize,
    pub categories_over_budget: usize,
    pub total_variance: f64,
    pub savings_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInsights {
    pub best_category: Option<String>,
    pub worst_category: Option<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPerformance {
    pub budget_id: String,
    pub month: u32,
    pub year: i32,
    pub performance: PerformanceMetrics,
    pub insights: PerformanceInsights,
}

/// System-wide budget preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSystemSettings {
    pub default_currency: String,
    pub default_warning_threshold: f64,
    pub default_alert_threshold: f64,
    pub auto_create_monthly_budgets: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_template_id: Option<String>,
    pub notifications_enabled: bool,
    pub email_alerts: bool,
}

impl Default for BudgetSystemSettings {
    fn default() -> Self {
        Self {
            default_currency: "USD".into(),
            default_warning_threshold: DEFAULT_WARNING_THRESHOLD,
            default_alert_threshold: DEFAULT_ALERT_THRESHOLD,
            auto_create_monthly_budgets: true,
            default_template_id: None,
            notifications_enabled: true,
            email_alerts: false,
        }
    }
}

impl BudgetSystemSettings {
    pub fn budget_defaults(&self) -> BudgetSettings {
        BudgetSettings {
            warning_threshold: self.default_warning_threshold,
            alert_threshold: self.default_alert_threshold,
            ..BudgetSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::NewTransaction;
    use chrono::NaiveDate;

    fn line(name: &str, kind: EntryType, budgeted: f64, spent: f64) -> BudgetCategory {
        let mut category = BudgetCategory::from_input(
            name.to_string(),
            &BudgetCategoryInput::new(name, kind, budgeted),
            "#000000",
        );
        category.spent_amount = spent;
        category.refresh(&BudgetSettings::default());
        category
    }

    #[test]
    fn status_follows_thresholds() {
        assert_eq!(line("a", EntryType::Expense, 400.0, 100.0).status, BudgetStatus::Healthy);
        let warning = line("a", EntryType::Expense, 400.0, 380.0);
        assert_eq!(warning.percentage, 95.0);
        assert_eq!(warning.status, BudgetStatus::Warning);
        let exceeded = line("a", EntryType::Expense, 400.0, 420.0);
        assert_eq!(exceeded.percentage, 105.0);
        assert_eq!(exceeded.remaining, -20.0);
        assert_eq!(exceeded.status, BudgetStatus::Exceeded);
        assert_eq!(line("a", EntryType::Expense, 0.0, 50.0).status, BudgetStatus::Undefined);
    }

    #[test]
    fn totals_compute_balances_and_variance() {
        let categories = vec![
            line("Salario", EntryType::Income, 3000.0, 2800.0),
            line("Vivienda", EntryType::Expense, 1200.0, 1200.0),
            line("Ocio", EntryType::Expense, 300.0, 400.0),
        ];
        let totals = BudgetTotals::from_categories(&categories);
        assert_eq!(totals.budgeted_income, 3000.0);
        assert_eq!(totals.budgeted_expenses, 1500.0);
        assert_eq!(totals.projected_balance, 1500.0);
        assert_eq!(totals.actual_balance, 1200.0);
        assert_eq!(totals.variance, -300.0);

        let initial = BudgetTotals::initial(&categories);
        assert_eq!(initial.projected_balance, 1500.0);
        assert_eq!(initial.actual_expenses, 0.0);
        assert_eq!(initial.variance, 0.0);
    }

    #[test]
    fn apply_transactions_only_counts_matching_month_name_and_type() {
        let now = Utc::now();
        let mut budget = Budget {
            id: "b".into(),
            name: "Budget".into(),
            month: 11,
            year: 2024,
            date_created: now,
            date_modified: now,
            is_active: true,
            categories: vec![line("Alimentación", EntryType::Expense, 400.0, 0.0)],
            totals: BudgetTotals::default(),
            settings: BudgetSettings::default(),
        };
        let on = |day| NaiveDate::from_ymd_opt(2024, 11, day).unwrap();
        let transactions = vec![
            Transaction::from_new(1, NewTransaction::expense("a", 200.0, "Alimentación", on(2))),
            Transaction::from_new(2, NewTransaction::expense("b", 180.0, "Alimentación", on(9))),
            Transaction::from_new(3, NewTransaction::income("c", 50.0, "Alimentación", on(9))),
            Transaction::from_new(4, NewTransaction::expense("d", 99.0, "Transporte", on(9))),
            Transaction::from_new(
                5,
                NewTransaction::expense(
                    "e",
                    999.0,
                    "Alimentación",
                    NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                ),
            ),
        ];
        budget.apply_transactions(&transactions);
        let category = &budget.categories[0];
        assert_eq!(category.spent_amount, 380.0);
        assert_eq!(category.status, BudgetStatus::Warning);
        assert_eq!(budget.totals.actual_expenses, 380.0);
    }

    #[test]
    fn settings_patch_overrides_only_present_fields() {
        let patch = BudgetSettingsPatch {
            alert_threshold: Some(120.0),
            ..Default::default()
        };
        let merged = BudgetSettings::default().merged(&patch);
        assert_eq!(merged.warning_threshold, 80.0);
        assert_eq!(merged.alert_threshold, 120.0);
    }

    #[test]
    fn dto_category_list_supports_push_and_remove_at() {
        let mut dto = CreateBudgetDto::new(1, 2025)
            .with_category(BudgetCategoryInput::new("A", EntryType::Expense, 10.0))
            .with_category(BudgetCategoryInput::new("B", EntryType::Expense, 20.0));
        assert_eq!(dto.remove_category(0).map(|c| c.name), Some("A".to_string()));
        assert_eq!(dto.remove_category(5), None);
        assert_eq!(dto.categories.len(), 1);
    }

    #[test]
    fn month_names_cover_the_calendar() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "Unknown");
    }
}
