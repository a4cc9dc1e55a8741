//! Budgets, templates and alerts.
//!
//! Every category line carries derived fields (`spentAmount`, `remaining`,
//! `percentage`, `status`) that are recomputed from the transaction set
//! whenever something relevant changes; nothing else writes them.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::errors::FinanceError;
use crate::core::time::Clock;
use crate::domain::budget::{
    alert_message, month_name, palette_color, AlertKind, Budget, BudgetAlert, BudgetCategory,
    BudgetCategoryInput, BudgetCategoryUpdate, BudgetPerformance, BudgetSettings,
    BudgetSettingsPatch, BudgetStatus, BudgetSystemSettings, BudgetTemplate, BudgetTotals,
    BudgetUpdate, CreateBudgetDto, NewTemplate, PerformanceInsights, PerformanceMetrics,
    TemplateCategory,
};
use crate::domain::common::EntryType;
use crate::domain::transaction::Transaction;
use crate::storage::{keys, LocalStorage};

use super::ServiceResult;

const DEFAULT_TEMPLATE_NAME: &str = "Presupuesto Personal";

const DEFAULT_TEMPLATE_LINES: [(&str, EntryType, f64, &str, &str); 9] = [
    ("Salario", EntryType::Income, 3000.0, "#10b981", "💰"),
    ("Ingresos Extra", EntryType::Income, 500.0, "#059669", "💵"),
    ("Vivienda", EntryType::Expense, 1200.0, "#ef4444", "🏠"),
    ("Servicios", EntryType::Expense, 300.0, "#dc2626", "💡"),
    ("Transporte", EntryType::Expense, 200.0, "#b91c1c", "🚗"),
    ("Alimentación", EntryType::Expense, 400.0, "#f59e0b", "🍽️"),
    ("Entretenimiento", EntryType::Expense, 200.0, "#d97706", "🎬"),
    ("Salud", EntryType::Expense, 150.0, "#0ea5e9", "⚕️"),
    ("Compras", EntryType::Expense, 300.0, "#8b5cf6", "🛍️"),
];

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct BudgetService {
    storage: LocalStorage,
    clock: Arc<dyn Clock>,
    budgets: Vec<Budget>,
    templates: Vec<BudgetTemplate>,
    alerts: Vec<BudgetAlert>,
    settings: BudgetSystemSettings,
}

impl BudgetService {
    pub fn open(storage: LocalStorage, clock: Arc<dyn Clock>) -> Self {
        let budgets = storage.get(keys::BUDGETS).unwrap_or_default();
        let templates = storage
            .get::<Vec<BudgetTemplate>>(keys::BUDGET_TEMPLATES)
            .unwrap_or_default();
        let alerts = storage.get(keys::BUDGET_ALERTS).unwrap_or_default();
        let settings = storage.get(keys::BUDGET_SETTINGS).unwrap_or_default();
        let mut service = Self {
            storage,
            clock,
            budgets,
            templates,
            alerts,
            settings,
        };
        if service.templates.is_empty() {
            service.seed_default_template();
        }
        info!(
            budgets = service.budgets.len(),
            templates = service.templates.len(),
            "budget data loaded"
        );
        service
    }

    fn seed_default_template(&mut self) {
        let now = self.clock.now();
        let categories = DEFAULT_TEMPLATE_LINES
            .iter()
            .map(|(name, kind, amount, color, icon)| TemplateCategory {
                id: new_id(),
                name: name.to_string(),
                kind: *kind,
                default_amount: *amount,
                color: color.to_string(),
                icon: Some(icon.to_string()),
                description: None,
            })
            .collect();
        self.templates.push(BudgetTemplate {
            id: new_id(),
            name: DEFAULT_TEMPLATE_NAME.into(),
            description: Some("Plantilla básica para presupuesto personal mensual".into()),
            is_default: true,
            date_created: now,
            date_modified: now,
            categories,
            default_settings: BudgetSettings::default(),
        });
        self.persist_templates();
        info!("default budget template seeded");
    }

    // ---- queries -------------------------------------------------------

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    pub fn templates(&self) -> &[BudgetTemplate] {
        &self.templates
    }

    pub fn alerts(&self) -> &[BudgetAlert] {
        &self.alerts
    }

    pub fn settings(&self) -> &BudgetSystemSettings {
        &self.settings
    }

    pub fn get_budget(&self, id: &str) -> Option<&Budget> {
        self.budgets.iter().find(|budget| budget.id == id)
    }

    pub fn get_template(&self, id: &str) -> Option<&BudgetTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    /// The active budget for a calendar month, if one exists.
    pub fn budget_for_month(&self, month: u32, year: i32) -> Option<&Budget> {
        self.budgets
            .iter()
            .find(|budget| budget.is_active && budget.is_for(month, year))
    }

    pub fn active_budget(&self, today: NaiveDate) -> Option<&Budget> {
        self.budget_for_month(today.month(), today.year())
    }

    /// The template flagged as default, falling back to the first one.
    pub fn default_template(&self) -> Option<&BudgetTemplate> {
        self.templates
            .iter()
            .find(|template| template.is_default)
            .or_else(|| self.templates.first())
    }

    pub fn active_alerts(&self) -> Vec<&BudgetAlert> {
        self.alerts.iter().filter(|alert| alert.is_active).collect()
    }

    pub fn unread_alerts(&self) -> Vec<&BudgetAlert> {
        self.alerts
            .iter()
            .filter(|alert| alert.is_active && !alert.is_read)
            .collect()
    }

    // ---- budget lifecycle ----------------------------------------------

    pub fn create_budget(&mut self, dto: CreateBudgetDto) -> ServiceResult<Budget> {
        if !(1..=12).contains(&dto.month) {
            return Err(FinanceError::Validation(format!(
                "month must be between 1 and 12, got {}",
                dto.month
            )));
        }
        let settings = dto
            .settings
            .as_ref()
            .map(|patch| self.settings.budget_defaults().merged(patch))
            .unwrap_or_else(|| self.settings.budget_defaults());
        settings.validate().map_err(FinanceError::Validation)?;

        let inputs = self.resolve_category_inputs(&dto)?;
        for input in &inputs {
            input.validate().map_err(FinanceError::Validation)?;
        }
        Self::ensure_unique_lines(&inputs)?;

        let mut categories: Vec<BudgetCategory> = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| BudgetCategory::from_input(new_id(), input, palette_color(index)))
            .collect();
        for category in &mut categories {
            category.refresh(&settings);
        }

        let now = self.clock.now();
        let name = dto
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Budget {} {}", month_name(dto.month), dto.year));
        let budget = Budget {
            id: new_id(),
            name,
            month: dto.month,
            year: dto.year,
            date_created: now,
            date_modified: now,
            is_active: true,
            totals: BudgetTotals::initial(&categories),
            categories,
            settings,
        };

        self.deactivate_month(dto.month, dto.year, None);
        self.budgets.push(budget.clone());
        self.persist_budgets();
        info!(id = %budget.id, month = budget.month, year = budget.year, "budget created");
        Ok(budget)
    }

    fn resolve_category_inputs(&self, dto: &CreateBudgetDto) -> ServiceResult<Vec<BudgetCategoryInput>> {
        if !dto.categories.is_empty() {
            return Ok(dto.categories.clone());
        }
        if let Some(source_id) = &dto.copy_from_budget_id {
            let source = self
                .get_budget(source_id)
                .ok_or_else(|| FinanceError::BudgetNotFound(source_id.clone()))?;
            return Ok(source.categories.iter().map(BudgetCategoryInput::from).collect());
        }
        if let Some(template_id) = &dto.template_id {
            let template = self
                .get_template(template_id)
                .ok_or_else(|| FinanceError::TemplateNotFound(template_id.clone()))?;
            return Ok(template.categories.iter().map(TemplateCategory::to_input).collect());
        }
        Ok(Vec::new())
    }

    fn ensure_unique_lines(inputs: &[BudgetCategoryInput]) -> ServiceResult<()> {
        for (index, input) in inputs.iter().enumerate() {
            let name = input.name.trim();
            if inputs[..index]
                .iter()
                .any(|earlier| earlier.kind == input.kind && earlier.name.trim() == name)
            {
                return Err(FinanceError::Validation(format!(
                    "{} line `{}` is listed twice",
                    input.kind, name
                )));
            }
        }
        Ok(())
    }

    pub fn create_budget_from_template(
        &mut self,
        template_id: &str,
        month: u32,
        year: i32,
    ) -> ServiceResult<Budget> {
        let template = self
            .get_template(template_id)
            .ok_or_else(|| FinanceError::TemplateNotFound(template_id.to_string()))?;
        let dto = CreateBudgetDto {
            name: Some(format!("{} - {} {}", template.name, month_name(month), year)),
            month,
            year,
            template_id: Some(template.id.clone()),
            copy_from_budget_id: None,
            categories: template.categories.iter().map(TemplateCategory::to_input).collect(),
            settings: Some(BudgetSettingsPatch::from(template.default_settings)),
        };
        self.create_budget(dto)
    }

    pub fn update_budget(&mut self, id: &str, changes: BudgetUpdate) -> ServiceResult<Budget> {
        let now = self.clock.now();
        let name = changes.name.as_deref().map(str::trim);
        if name.is_some_and(str::is_empty) {
            return Err(FinanceError::Validation("budget name must not be empty".into()));
        }
        let budget = self.budget_mut(id)?;
        if let Some(patch) = &changes.settings {
            let merged = budget.settings.merged(patch);
            merged.validate().map_err(FinanceError::Validation)?;
            budget.settings = merged;
        }
        if let Some(name) = name {
            budget.name = name.to_string();
        }
        budget.refresh_categories();
        budget.recalculate_totals();
        budget.date_modified = now;
        let updated = budget.clone();
        self.persist_budgets();
        self.check_budget_alerts(id)?;
        info!(id, "budget updated");
        Ok(updated)
    }

    /// Makes `id` the single active budget of its month.
    pub fn activate_budget(&mut self, id: &str) -> ServiceResult<Budget> {
        let (month, year) = {
            let budget = self.budget_ref(id)?;
            (budget.month, budget.year)
        };
        self.deactivate_month(month, year, Some(id));
        let now = self.clock.now();
        let budget = self.budget_mut(id)?;
        budget.is_active = true;
        budget.date_modified = now;
        let activated = budget.clone();
        self.persist_budgets();
        self.check_budget_alerts(id)?;
        info!(id, "budget activated");
        Ok(activated)
    }

    /// Removes the budget together with its alerts.
    pub fn delete_budget(&mut self, id: &str) -> ServiceResult<Budget> {
        let index = self
            .budgets
            .iter()
            .position(|budget| budget.id == id)
            .ok_or_else(|| FinanceError::BudgetNotFound(id.to_string()))?;
        let removed = self.budgets.remove(index);
        self.alerts.retain(|alert| alert.budget_id != id);
        self.persist_budgets();
        self.persist_alerts();
        info!(id, "budget deleted");
        Ok(removed)
    }

    /// Deactivates the month's other budgets and retires their alerts.
    fn deactivate_month(&mut self, month: u32, year: i32, keep: Option<&str>) {
        let now = self.clock.now();
        let mut deactivated = Vec::new();
        for budget in &mut self.budgets {
            if budget.is_active && budget.is_for(month, year) && Some(budget.id.as_str()) != keep {
                budget.is_active = false;
                budget.date_modified = now;
                debug!(id = %budget.id, "budget deactivated");
                deactivated.push(budget.id.clone());
            }
        }
        for id in deactivated {
            if let Err(err) = self.check_budget_alerts(&id) {
                warn!(budget_id = %id, error = %err, "failed to retire alerts");
            }
        }
    }

    // ---- category lines ------------------------------------------------

    pub fn add_category_to_budget(
        &mut self,
        budget_id: &str,
        input: BudgetCategoryInput,
    ) -> ServiceResult<BudgetCategory> {
        input.validate().map_err(FinanceError::Validation)?;
        let now = self.clock.now();
        let budget = self.budget_mut(budget_id)?;
        if budget.find_category(input.name.trim(), input.kind).is_some() {
            return Err(FinanceError::Validation(format!(
                "{} line `{}` already exists in this budget",
                input.kind,
                input.name.trim()
            )));
        }
        let settings = budget.settings;
        let mut category =
            BudgetCategory::from_input(new_id(), &input, palette_color(budget.categories.len()));
        category.refresh(&settings);
        budget.categories.push(category.clone());
        budget.recalculate_totals();
        budget.date_modified = now;
        self.persist_budgets();
        info!(budget_id, name = %category.name, "budget line added");
        Ok(category)
    }

    pub fn update_budget_category(
        &mut self,
        budget_id: &str,
        category_id: &str,
        changes: BudgetCategoryUpdate,
    ) -> ServiceResult<BudgetCategory> {
        if let Some(amount) = changes.budgeted_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(FinanceError::Validation(
                    "budgeted amount must be zero or more".into(),
                ));
            }
        }
        let now = self.clock.now();
        let budget = self.budget_mut(budget_id)?;
        let settings = budget.settings;
        let kind = budget
            .category(category_id)
            .map(|category| category.kind)
            .ok_or_else(|| FinanceError::CategoryNotFound(category_id.to_string()))?;
        if let Some(name) = changes.name.as_deref().map(str::trim) {
            if name.is_empty() {
                return Err(FinanceError::Validation(
                    "budget category name must not be empty".into(),
                ));
            }
            let taken = budget
                .categories
                .iter()
                .any(|other| other.id != category_id && other.matches(name, kind));
            if taken {
                return Err(FinanceError::Validation(format!(
                    "{} line `{}` already exists in this budget",
                    kind, name
                )));
            }
        }
        let category = budget
            .category_mut(category_id)
            .ok_or_else(|| FinanceError::CategoryNotFound(category_id.to_string()))?;
        if let Some(name) = changes.name.as_deref().map(str::trim) {
            category.name = name.to_string();
        }
        if let Some(amount) = changes.budgeted_amount {
            category.budgeted_amount = amount;
        }
        if let Some(color) = changes.color {
            category.color = color;
        }
        if let Some(icon) = changes.icon {
            category.icon = Some(icon);
        }
        if let Some(description) = changes.description {
            category.description = Some(description);
        }
        category.refresh(&settings);
        let updated = category.clone();
        budget.recalculate_totals();
        budget.date_modified = now;
        self.persist_budgets();
        self.check_budget_alerts(budget_id)?;
        Ok(updated)
    }

    pub fn remove_category_from_budget(
        &mut self,
        budget_id: &str,
        category_id: &str,
    ) -> ServiceResult<BudgetCategory> {
        let now = self.clock.now();
        let budget = self.budget_mut(budget_id)?;
        let index = budget
            .categories
            .iter()
            .position(|cat| cat.id == category_id)
            .ok_or_else(|| FinanceError::CategoryNotFound(category_id.to_string()))?;
        let removed = budget.categories.remove(index);
        budget.recalculate_totals();
        budget.date_modified = now;
        self.alerts
            .retain(|alert| !(alert.budget_id == budget_id && alert.category_id == category_id));
        self.persist_budgets();
        self.persist_alerts();
        info!(budget_id, name = %removed.name, "budget line removed");
        Ok(removed)
    }

    // ---- recomputation -------------------------------------------------

    pub fn recalculate_budget_totals(&mut self, budget_id: &str) -> ServiceResult<BudgetTotals> {
        let now = self.clock.now();
        let budget = self.budget_mut(budget_id)?;
        budget.recalculate_totals();
        budget.date_modified = now;
        let totals = budget.totals;
        self.persist_budgets();
        Ok(totals)
    }

    /// Reacts to a transaction change in `(month, year)`.
    ///
    /// Without an active budget for that month nothing happens. A category
    /// the budget does not know yet is added with nothing budgeted, then the
    /// whole budget is recomputed from `transactions`.
    pub fn update_category_spending(
        &mut self,
        category: &str,
        amount: f64,
        kind: EntryType,
        month: u32,
        year: i32,
        transactions: &[Transaction],
    ) -> ServiceResult<Option<String>> {
        let Some(budget_id) = self.budget_for_month(month, year).map(|b| b.id.clone()) else {
            debug!(category, month, year, "no active budget for transaction month");
            return Ok(None);
        };
        let budget = self.budget_mut(&budget_id)?;
        if budget.find_category(category, kind).is_none() {
            let color = palette_color(budget.categories.len());
            let input = BudgetCategoryInput::new(category, kind, 0.0);
            budget
                .categories
                .push(BudgetCategory::from_input(new_id(), &input, color));
            info!(budget_id = %budget_id, category, "budget line created for new spending");
        }
        debug!(budget_id = %budget_id, category, amount, "recomputing budget spending");
        self.recalculate_budget_from_transactions(&budget_id, transactions)?;
        Ok(Some(budget_id))
    }

    pub fn recalculate_budget_from_transactions(
        &mut self,
        budget_id: &str,
        transactions: &[Transaction],
    ) -> ServiceResult<Budget> {
        let now = self.clock.now();
        let budget = self.budget_mut(budget_id)?;
        budget.apply_transactions(transactions);
        budget.date_modified = now;
        let updated = budget.clone();
        self.persist_budgets();
        self.check_budget_alerts(budget_id)?;
        debug!(budget_id, "budget recomputed from transactions");
        Ok(updated)
    }

    /// Recomputes every budget; used after bulk changes to transactions.
    pub fn recalculate_all(&mut self, transactions: &[Transaction]) {
        let ids: Vec<String> = self.budgets.iter().map(|budget| budget.id.clone()).collect();
        for id in ids {
            if let Err(err) = self.recalculate_budget_from_transactions(&id, transactions) {
                warn!(budget_id = %id, error = %err, "failed to recompute budget");
            }
        }
    }

    // ---- alerts --------------------------------------------------------

    /// Raises new alerts for the budget and retires those that no longer hold.
    /// Returns the alerts created by this call.
    pub fn check_budget_alerts(&mut self, budget_id: &str) -> ServiceResult<Vec<BudgetAlert>> {
        let budget = self.budget_ref(budget_id)?.clone();
        let now = self.clock.now();
        let mut created = Vec::new();
        let mut changed = false;

        for alert in &mut self.alerts {
            if !alert.is_active || alert.budget_id != budget.id {
                continue;
            }
            let holds = budget.is_active
                && budget
                    .category(&alert.category_id)
                    .is_some_and(|category| condition_holds(alert.kind, category, &budget.settings));
            if !holds {
                alert.is_active = false;
                changed = true;
                debug!(alert_id = %alert.id, "alert retired");
            }
        }

        // Superseded budgets keep their history but raise nothing new.
        let candidates = if budget.is_active {
            budget.categories.as_slice()
        } else {
            &[]
        };
        for category in candidates {
            let Some(kind) = triggered_alert(category, &budget.settings) else {
                continue;
            };
            let duplicate = self
                .alerts
                .iter()
                .any(|alert| alert.is_active && alert.is_same_condition(&budget.id, &category.id, kind));
            if duplicate {
                continue;
            }
            let alert = BudgetAlert {
                id: new_id(),
                budget_id: budget.id.clone(),
                category_id: category.id.clone(),
                kind,
                message: alert_message(category, kind),
                severity: kind.severity(),
                date_created: now,
                is_read: false,
                is_active: true,
            };
            info!(budget_id = %budget.id, category = %category.name, kind = %kind, "budget alert raised");
            self.alerts.push(alert.clone());
            created.push(alert);
            changed = true;
        }

        if changed {
            self.persist_alerts();
        }
        Ok(created)
    }

    pub fn mark_alert_as_read(&mut self, alert_id: &str) -> ServiceResult<()> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|alert| alert.id == alert_id)
            .ok_or_else(|| FinanceError::AlertNotFound(alert_id.to_string()))?;
        alert.is_read = true;
        self.persist_alerts();
        Ok(())
    }

    pub fn clear_alert(&mut self, alert_id: &str) -> ServiceResult<BudgetAlert> {
        let index = self
            .alerts
            .iter()
            .position(|alert| alert.id == alert_id)
            .ok_or_else(|| FinanceError::AlertNotFound(alert_id.to_string()))?;
        let removed = self.alerts.remove(index);
        self.persist_alerts();
        Ok(removed)
    }

    // ---- performance ---------------------------------------------------

    pub fn get_budget_performance(&self, budget_id: &str) -> Option<BudgetPerformance> {
        let budget = self.get_budget(budget_id)?;
        let settings = &budget.settings;
        let total = budget.categories.len();
        let over = budget
            .categories
            .iter()
            .filter(|cat| cat.percentage > settings.alert_threshold)
            .count();
        let on_track = budget
            .categories
            .iter()
            .filter(|cat| cat.percentage <= settings.warning_threshold)
            .count();
        let overall_score = if total == 0 {
            100.0
        } else {
            (100.0 - over as f64 / total as f64 * 100.0).max(0.0)
        };
        let savings_rate = if budget.totals.budgeted_income > 0.0 {
            budget.totals.actual_balance / budget.totals.budgeted_income * 100.0
        } else {
            0.0
        };

        let expenses: Vec<&BudgetCategory> = budget
            .categories
            .iter()
            .filter(|cat| cat.kind == EntryType::Expense)
            .collect();
        let best_category = expenses
            .iter()
            .min_by(|a, b| a.percentage.total_cmp(&b.percentage))
            .map(|cat| cat.name.clone());
        let worst_category = expenses
            .iter()
            .max_by(|a, b| a.percentage.total_cmp(&b.percentage))
            .map(|cat| cat.name.clone());

        let mut recommendations = Vec::new();
        for category in &budget.categories {
            if category.percentage > 100.0 {
                recommendations.push(format!(
                    "Consider raising the {} budget or cutting back; it is at {:.1}%",
                    category.name, category.percentage
                ));
            } else if category.kind == EntryType::Expense
                && category.status != BudgetStatus::Undefined
                && category.percentage < 50.0
            {
                recommendations.push(format!(
                    "{} has only used {:.1}% of its budget; part of it could be reallocated",
                    category.name, category.percentage
                ));
            }
        }

        Some(BudgetPerformance {
            budget_id: budget.id.clone(),
            month: budget.month,
            year: budget.year,
            performance: PerformanceMetrics {
                overall_score,
                categories_on_track: on_track,
                categories_over_budget: over,
                total_variance: budget.totals.variance,
                savings_rate,
            },
            insights: PerformanceInsights {
                best_category,
                worst_category,
                recommendations,
            },
        })
    }

    // ---- templates -----------------------------------------------------

    pub fn create_template(&mut self, new: NewTemplate) -> ServiceResult<BudgetTemplate> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(FinanceError::Validation("template name must not be empty".into()));
        }
        new.default_settings.validate().map_err(FinanceError::Validation)?;
        for input in &new.categories {
            input.validate().map_err(FinanceError::Validation)?;
        }
        Self::ensure_unique_lines(&new.categories)?;

        if new.is_default {
            for template in &mut self.templates {
                template.is_default = false;
            }
        }
        let now = self.clock.now();
        let template = BudgetTemplate {
            id: new_id(),
            name: name.to_string(),
            description: new.description,
            is_default: new.is_default,
            date_created: now,
            date_modified: now,
            categories: new
                .categories
                .iter()
                .enumerate()
                .map(|(index, input)| TemplateCategory {
                    id: new_id(),
                    name: input.name.trim().to_string(),
                    kind: input.kind,
                    default_amount: input.budgeted_amount,
                    color: input
                        .color
                        .clone()
                        .unwrap_or_else(|| palette_color(index).to_string()),
                    icon: input.icon.clone(),
                    description: input.description.clone(),
                })
                .collect(),
            default_settings: new.default_settings,
        };
        self.templates.push(template.clone());
        self.persist_templates();
        info!(id = %template.id, name = %template.name, "budget template created");
        Ok(template)
    }

    pub fn delete_template(&mut self, id: &str) -> ServiceResult<BudgetTemplate> {
        let index = self
            .templates
            .iter()
            .position(|template| template.id == id)
            .ok_or_else(|| FinanceError::TemplateNotFound(id.to_string()))?;
        let removed = self.templates.remove(index);
        self.persist_templates();
        info!(id, "budget template deleted");
        Ok(removed)
    }

    pub fn set_default_template(&mut self, id: &str) -> ServiceResult<BudgetTemplate> {
        if self.get_template(id).is_none() {
            return Err(FinanceError::TemplateNotFound(id.to_string()));
        }
        let now = self.clock.now();
        for template in &mut self.templates {
            let is_target = template.id == id;
            if template.is_default != is_target {
                template.is_default = is_target;
                template.date_modified = now;
            }
        }
        self.persist_templates();
        self.get_template(id)
            .cloned()
            .ok_or_else(|| FinanceError::TemplateNotFound(id.to_string()))
    }

    // ---- settings ------------------------------------------------------

    pub fn update_settings(&mut self, settings: BudgetSystemSettings) -> ServiceResult<()> {
        BudgetSettings {
            warning_threshold: settings.default_warning_threshold,
            alert_threshold: settings.default_alert_threshold,
            ..BudgetSettings::default()
        }
        .validate()
        .map_err(FinanceError::Validation)?;
        if let Some(template_id) = &settings.default_template_id {
            if self.get_template(template_id).is_none() {
                return Err(FinanceError::TemplateNotFound(template_id.clone()));
            }
        }
        self.settings = settings;
        self.storage.set(keys::BUDGET_SETTINGS, &self.settings);
        info!("budget settings updated");
        Ok(())
    }

    // ---- helpers -------------------------------------------------------

    fn budget_ref(&self, id: &str) -> ServiceResult<&Budget> {
        self.get_budget(id)
            .ok_or_else(|| FinanceError::BudgetNotFound(id.to_string()))
    }

    fn budget_mut(&mut self, id: &str) -> ServiceResult<&mut Budget> {
        self.budgets
            .iter_mut()
            .find(|budget| budget.id == id)
            .ok_or_else(|| FinanceError::BudgetNotFound(id.to_string()))
    }

    fn persist_budgets(&self) {
        self.storage.set(keys::BUDGETS, &self.budgets);
    }

    fn persist_templates(&self) {
        self.storage.set(keys::BUDGET_TEMPLATES, &self.templates);
    }

    fn persist_alerts(&self) {
        self.storage.set(keys::BUDGET_ALERTS, &self.alerts);
    }
}

/// The single alert a category currently deserves, if any.
fn triggered_alert(category: &BudgetCategory, settings: &BudgetSettings) -> Option<AlertKind> {
    if category.budgeted_amount <= 0.0 {
        return None;
    }
    if category.percentage >= settings.alert_threshold {
        Some(AlertKind::Exceeded)
    } else if category.percentage >= settings.warning_threshold {
        Some(AlertKind::Warning)
    } else if category.spent_amount >= category.budgeted_amount {
        Some(AlertKind::Depleted)
    } else {
        None
    }
}

fn condition_holds(kind: AlertKind, category: &BudgetCategory, settings: &BudgetSettings) -> bool {
    if category.budgeted_amount <= 0.0 {
        return false;
    }
    match kind {
        AlertKind::Warning => category.percentage >= settings.warning_threshold,
        AlertKind::Exceeded => category.percentage >= settings.alert_threshold,
        AlertKind::Depleted => category.spent_amount >= category.budgeted_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::domain::budget::AlertSeverity;
    use crate::domain::transaction::NewTransaction;
    use crate::storage::MemoryBackend;
    use chrono::{TimeZone, Utc};

    fn service() -> (BudgetService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let storage = LocalStorage::from_shared(backend.clone());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 11, 15, 12, 0, 0).unwrap(),
        ));
        (BudgetService::open(storage, clock), backend)
    }

    fn food_budget(service: &mut BudgetService) -> Budget {
        service
            .create_budget(
                CreateBudgetDto::new(11, 2024)
                    .with_category(BudgetCategoryInput::new("Salario", EntryType::Income, 3000.0))
                    .with_category(BudgetCategoryInput::new(
                        "Alimentación",
                        EntryType::Expense,
                        400.0,
                    )),
            )
            .unwrap()
    }

    fn spend(id: i64, amount: f64, day: u32) -> Transaction {
        Transaction::from_new(
            id,
            NewTransaction::expense(
                "Super",
                amount,
                "Alimentación",
                NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            ),
        )
    }

    #[test]
    fn open_seeds_the_default_template() {
        let (service, backend) = service();
        let template = service.default_template().unwrap();
        assert_eq!(template.name, "Presupuesto Personal");
        assert_eq!(template.categories.len(), 9);
        assert_eq!(backend.write_count(keys::BUDGET_TEMPLATES), 1);
    }

    #[test]
    fn create_budget_defaults_name_and_computes_initial_totals() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        assert_eq!(budget.name, "Budget November 2024");
        assert!(budget.is_active);
        assert_eq!(budget.totals.budgeted_income, 3000.0);
        assert_eq!(budget.totals.budgeted_expenses, 400.0);
        assert_eq!(budget.totals.projected_balance, 2600.0);
        assert_eq!(budget.settings.warning_threshold, 80.0);
        assert!(budget
            .categories
            .iter()
            .all(|cat| cat.spent_amount == 0.0 && cat.status == BudgetStatus::Healthy));
    }

    #[test]
    fn create_budget_validates_input() {
        let (mut service, _) = service();
        assert!(matches!(
            service.create_budget(CreateBudgetDto::new(13, 2024)),
            Err(FinanceError::Validation(_))
        ));
        let negative = CreateBudgetDto::new(1, 2025).with_category(BudgetCategoryInput::new(
            "Ocio",
            EntryType::Expense,
            -5.0,
        ));
        assert!(service.create_budget(negative).is_err());
        assert!(service.budgets().is_empty());
    }

    #[test]
    fn second_budget_for_the_same_month_deactivates_the_first() {
        let (mut service, _) = service();
        let first = food_budget(&mut service);
        let second = food_budget(&mut service);
        assert!(!service.get_budget(&first.id).unwrap().is_active);
        assert!(service.get_budget(&second.id).unwrap().is_active);
        let active = service
            .budgets()
            .iter()
            .filter(|b| b.is_active && b.is_for(11, 2024))
            .count();
        assert_eq!(active, 1);

        service.activate_budget(&first.id).unwrap();
        assert_eq!(service.budget_for_month(11, 2024).unwrap().id, first.id);
    }

    #[test]
    fn template_budget_copies_amounts_and_names_itself() {
        let (mut service, _) = service();
        let template_id = service.default_template().unwrap().id.clone();
        let budget = service
            .create_budget_from_template(&template_id, 2, 2025)
            .unwrap();
        assert_eq!(budget.name, "Presupuesto Personal - February 2025");
        assert_eq!(budget.categories.len(), 9);
        assert_eq!(budget.totals.budgeted_income, 3500.0);
        assert_eq!(budget.totals.budgeted_expenses, 2750.0);
        assert!(matches!(
            service.create_budget_from_template("nope", 2, 2025),
            Err(FinanceError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn copy_from_budget_reuses_its_lines() {
        let (mut service, _) = service();
        let source = food_budget(&mut service);
        let copy = service
            .create_budget(CreateBudgetDto {
                copy_from_budget_id: Some(source.id.clone()),
                ..CreateBudgetDto::new(12, 2024)
            })
            .unwrap();
        assert_eq!(copy.categories.len(), 2);
        assert_ne!(copy.categories[0].id, source.categories[0].id);
        assert!(source.is_active);
    }

    #[test]
    fn warning_then_exceeded_alerts_without_duplicates() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        let mut transactions = vec![spend(1, 200.0, 3), spend(2, 180.0, 9)];

        service
            .update_category_spending("Alimentación", -180.0, EntryType::Expense, 11, 2024, &transactions)
            .unwrap();
        let food = service
            .get_budget(&budget.id)
            .unwrap()
            .find_category("Alimentación", EntryType::Expense)
            .unwrap()
            .clone();
        assert_eq!(food.percentage, 95.0);
        assert_eq!(food.status, BudgetStatus::Warning);
        assert_eq!(service.active_alerts().len(), 1);
        assert_eq!(service.active_alerts()[0].kind, AlertKind::Warning);

        transactions.push(spend(3, 40.0, 12));
        service
            .update_category_spending("Alimentación", -40.0, EntryType::Expense, 11, 2024, &transactions)
            .unwrap();
        let kinds: Vec<AlertKind> = service.active_alerts().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Warning, AlertKind::Exceeded]);
        let exceeded = service
            .active_alerts()
            .into_iter()
            .find(|a| a.kind == AlertKind::Exceeded)
            .unwrap()
            .clone();
        assert_eq!(exceeded.severity, AlertSeverity::High);

        service.check_budget_alerts(&budget.id).unwrap();
        assert_eq!(service.active_alerts().len(), 2);
    }

    #[test]
    fn alerts_retire_when_spending_drops() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 350.0, 3)])
            .unwrap();
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 420.0, 3)])
            .unwrap();
        assert_eq!(service.active_alerts().len(), 2);
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 100.0, 3)])
            .unwrap();
        assert!(service.active_alerts().is_empty());
        assert_eq!(service.alerts().len(), 2);
    }

    #[test]
    fn depleted_alert_when_threshold_is_above_one_hundred() {
        let (mut service, _) = service();
        let budget = service
            .create_budget(CreateBudgetDto {
                settings: Some(BudgetSettingsPatch {
                    warning_threshold: Some(110.0),
                    alert_threshold: Some(120.0),
                    ..Default::default()
                }),
                ..CreateBudgetDto::new(11, 2024).with_category(BudgetCategoryInput::new(
                    "Alimentación",
                    EntryType::Expense,
                    400.0,
                ))
            })
            .unwrap();
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 400.0, 3)])
            .unwrap();
        let created = service.active_alerts();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind, AlertKind::Depleted);
        assert_eq!(created[0].severity, AlertSeverity::High);
    }

    #[test]
    fn spending_without_an_active_budget_is_ignored() {
        let (mut service, backend) = service();
        let writes = backend.write_count(keys::BUDGETS);
        let affected = service
            .update_category_spending("Alimentación", -10.0, EntryType::Expense, 1, 2030, &[])
            .unwrap();
        assert_eq!(affected, None);
        assert_eq!(backend.write_count(keys::BUDGETS), writes);
    }

    #[test]
    fn unknown_spending_category_is_added_with_zero_budget() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        let txn = Transaction::from_new(
            9,
            NewTransaction::expense(
                "Vet",
                60.0,
                "Mascotas",
                NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
            ),
        );
        service
            .update_category_spending("Mascotas", -60.0, EntryType::Expense, 11, 2024, &[txn])
            .unwrap();
        let budget = service.get_budget(&budget.id).unwrap();
        let pets = budget.find_category("Mascotas", EntryType::Expense).unwrap();
        assert_eq!(pets.budgeted_amount, 0.0);
        assert_eq!(pets.spent_amount, 60.0);
        assert_eq!(pets.status, BudgetStatus::Undefined);
        assert_eq!(budget.totals.actual_expenses, 60.0);
    }

    #[test]
    fn performance_of_an_untouched_budget_is_perfect() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        let report = service.get_budget_performance(&budget.id).unwrap();
        assert_eq!(report.performance.overall_score, 100.0);
        assert_eq!(report.performance.categories_over_budget, 0);
        assert_eq!(report.performance.categories_on_track, 2);
        assert_eq!(report.insights.best_category.as_deref(), Some("Alimentación"));
        assert!(service.get_budget_performance("missing").is_none());
    }

    #[test]
    fn performance_counts_overspent_lines_and_savings() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        let income = Transaction::from_new(
            1,
            NewTransaction::income(
                "Nómina",
                3000.0,
                "Salario",
                NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            ),
        );
        service
            .recalculate_budget_from_transactions(&budget.id, &[income, spend(2, 600.0, 2)])
            .unwrap();
        let report = service.get_budget_performance(&budget.id).unwrap();
        assert_eq!(report.performance.categories_over_budget, 1);
        assert_eq!(report.performance.overall_score, 50.0);
        assert_eq!(report.performance.savings_rate, 80.0);
        assert_eq!(report.insights.worst_category.as_deref(), Some("Alimentación"));
        assert_eq!(report.insights.recommendations.len(), 1);
    }

    #[test]
    fn empty_budget_scores_one_hundred() {
        let (mut service, _) = service();
        let budget = service.create_budget(CreateBudgetDto::new(3, 2025)).unwrap();
        let report = service.get_budget_performance(&budget.id).unwrap();
        assert_eq!(report.performance.overall_score, 100.0);
        assert_eq!(report.insights.best_category, None);
    }

    #[test]
    fn default_template_flag_is_exclusive() {
        let (mut service, _) = service();
        let created = service
            .create_template(NewTemplate {
                name: "Austero".into(),
                is_default: true,
                categories: vec![BudgetCategoryInput::new("Vivienda", EntryType::Expense, 800.0)],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(service.templates().iter().filter(|t| t.is_default).count(), 1);
        assert_eq!(service.default_template().unwrap().id, created.id);

        let seeded = service
            .templates()
            .iter()
            .find(|t| t.name == "Presupuesto Personal")
            .unwrap()
            .id
            .clone();
        service.set_default_template(&seeded).unwrap();
        assert_eq!(service.default_template().unwrap().id, seeded);
        service.delete_template(&created.id).unwrap();
        assert_eq!(service.templates().len(), 1);
    }

    #[test]
    fn line_edits_recompute_totals_and_removal_drops_alerts() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 420.0, 3)])
            .unwrap();
        let food_id = budget.categories[1].id.clone();
        let updated = service
            .update_budget_category(
                &budget.id,
                &food_id,
                BudgetCategoryUpdate {
                    budgeted_amount: Some(1000.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.percentage, 42.0);
        assert_eq!(updated.status, BudgetStatus::Healthy);
        assert!(service.active_alerts().is_empty());
        assert_eq!(
            service.get_budget(&budget.id).unwrap().totals.budgeted_expenses,
            1000.0
        );

        service.remove_category_from_budget(&budget.id, &food_id).unwrap();
        assert!(service.alerts().iter().all(|a| a.category_id != food_id));
        let line = service
            .add_category_to_budget(
                &budget.id,
                BudgetCategoryInput::new("Transporte", EntryType::Expense, 150.0),
            )
            .unwrap();
        assert_eq!(line.remaining, 150.0);
        assert!(service
            .add_category_to_budget(
                &budget.id,
                BudgetCategoryInput::new("Transporte", EntryType::Expense, 1.0),
            )
            .is_err());
    }

    #[test]
    fn alerts_can_be_read_and_cleared() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 350.0, 3)])
            .unwrap();
        let alert_id = service.unread_alerts()[0].id.clone();
        service.mark_alert_as_read(&alert_id).unwrap();
        assert!(service.unread_alerts().is_empty());
        service.clear_alert(&alert_id).unwrap();
        assert!(matches!(
            service.clear_alert(&alert_id),
            Err(FinanceError::AlertNotFound(_))
        ));
    }

    #[test]
    fn deleting_a_budget_drops_its_alerts() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 500.0, 3)])
            .unwrap();
        service.delete_budget(&budget.id).unwrap();
        assert!(service.alerts().is_empty());
        assert!(matches!(
            service.delete_budget(&budget.id),
            Err(FinanceError::BudgetNotFound(_))
        ));
    }

    #[test]
    fn settings_are_validated_and_feed_new_budgets() {
        let (mut service, _) = service();
        let mut settings = service.settings().clone();
        settings.default_warning_threshold = 120.0;
        assert!(service.update_settings(settings.clone()).is_err());
        settings.default_warning_threshold = 70.0;
        settings.default_alert_threshold = 90.0;
        service.update_settings(settings).unwrap();
        let budget = service.create_budget(CreateBudgetDto::new(5, 2025)).unwrap();
        assert_eq!(budget.settings.warning_threshold, 70.0);
        assert_eq!(budget.settings.alert_threshold, 90.0);
    }

    #[test]
    fn renaming_onto_an_existing_line_is_refused() {
        let (mut service, _) = service();
        let budget = service
            .create_budget(
                CreateBudgetDto::new(11, 2024)
                    .with_category(BudgetCategoryInput::new("Alimentación", EntryType::Expense, 400.0))
                    .with_category(BudgetCategoryInput::new("Transporte", EntryType::Expense, 100.0)),
            )
            .unwrap();
        let transport = budget.categories[1].id.clone();
        let result = service.update_budget_category(
            &budget.id,
            &transport,
            BudgetCategoryUpdate {
                name: Some(" Alimentación ".into()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(FinanceError::Validation(_))));
        assert_eq!(
            service.get_budget(&budget.id).unwrap().categories[1].name,
            "Transporte"
        );

        let kept = service
            .update_budget_category(
                &budget.id,
                &transport,
                BudgetCategoryUpdate {
                    name: Some("Transporte".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(kept.name, "Transporte");
    }

    #[test]
    fn untouched_lines_total_positive_zero() {
        let (mut service, _) = service();
        let budget = food_budget(&mut service);
        let updated = service
            .recalculate_budget_from_transactions(&budget.id, &[spend(1, 50.0, 4)])
            .unwrap();
        let salary = &updated.categories[0];
        assert_eq!(salary.spent_amount, 0.0);
        assert!(salary.spent_amount.is_sign_positive());
        assert!(salary.percentage.is_sign_positive());
        assert!(updated.totals.actual_income.is_sign_positive());
        let json = serde_json::to_string(&updated).unwrap();
        assert!(!json.contains("-0.0"), "negative zero leaked: {}", json);
    }

    #[test]
    fn superseded_budget_alerts_are_retired() {
        let (mut service, _) = service();
        let first = food_budget(&mut service);
        service
            .recalculate_budget_from_transactions(&first.id, &[spend(1, 420.0, 3)])
            .unwrap();
        assert_eq!(service.unread_alerts().len(), 1);

        let second = food_budget(&mut service);
        assert!(service.unread_alerts().is_empty());
        assert!(service.active_alerts().is_empty());

        service.recalculate_all(&[spend(1, 420.0, 3)]);
        let active = service.active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].budget_id, second.id);

        service.activate_budget(&first.id).unwrap();
        let active = service.active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].budget_id, first.id);
    }
}
