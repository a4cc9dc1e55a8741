use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::domain::budget::{
    Budget, BudgetCategory, BudgetCategoryInput, BudgetCategoryUpdate, CreateBudgetDto,
};
use crate::domain::category::CategoryStats;
use crate::domain::transaction::{NewTransaction, Transaction};
use crate::storage::LocalStorage;

use super::services::summary_service::DashboardSummary;
use super::services::{
    BudgetService, CategoryService, ServiceResult, SummaryService, TransactionChange,
    TransactionService,
};
use super::time::Clock;

/// Facade that owns the three stores over one storage handle and keeps
/// budgets in step with transaction changes.
pub struct FinanceTracker {
    storage: LocalStorage,
    clock: Arc<dyn Clock>,
    transactions: TransactionService,
    categories: CategoryService,
    budgets: BudgetService,
}

impl FinanceTracker {
    pub fn open(storage: LocalStorage, clock: Arc<dyn Clock>) -> Self {
        let categories = CategoryService::open(storage.clone(), clock.clone());
        let transactions = TransactionService::open(storage.clone(), clock.clone());
        let budgets = BudgetService::open(storage.clone(), clock.clone());
        Self {
            storage,
            clock,
            transactions,
            categories,
            budgets,
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategoryService {
        &mut self.categories
    }

    pub fn budgets(&self) -> &BudgetService {
        &self.budgets
    }

    pub fn budgets_mut(&mut self) -> &mut BudgetService {
        &mut self.budgets
    }

    pub fn add_transaction(&mut self, new: NewTransaction) -> ServiceResult<Transaction> {
        let change = self.transactions.add(new)?;
        self.notify(&change);
        Ok(change.transaction().clone())
    }

    pub fn update_transaction(
        &mut self,
        id: i64,
        new: NewTransaction,
    ) -> ServiceResult<Transaction> {
        let change = self.transactions.update(id, new)?;
        self.notify(&change);
        Ok(change.transaction().clone())
    }

    pub fn delete_transaction(&mut self, id: i64) -> ServiceResult<Transaction> {
        let change = self.transactions.delete(id)?;
        self.notify(&change);
        Ok(change.transaction().clone())
    }

    /// Forwards every expense version touched by `change` to the budgets.
    /// The transaction is already stored, so budget failures are only logged.
    fn notify(&mut self, change: &TransactionChange) {
        for txn in change.expense_versions() {
            let result = self.budgets.update_category_spending(
                &txn.category,
                txn.amount,
                txn.kind,
                txn.date.month(),
                txn.date.year(),
                self.transactions.all(),
            );
            match result {
                Ok(Some(budget_id)) => {
                    debug!(budget_id = %budget_id, txn_id = txn.id, "budget notified")
                }
                Ok(None) => {}
                Err(err) => warn!(txn_id = txn.id, error = %err, "budget notification failed"),
            }
        }
    }

    pub fn import_transactions(&mut self, json: &str) -> ServiceResult<usize> {
        let count = self.transactions.import_transactions(json)?;
        self.budgets.recalculate_all(self.transactions.all());
        Ok(count)
    }

    pub fn clear_transactions(&mut self) {
        self.transactions.clear_all();
        self.budgets.recalculate_all(self.transactions.all());
    }

    /// Removes transactions, preferences and the version stamp, then brings
    /// budgets back in line with the now-empty history.
    pub fn reset_application(&mut self) {
        self.transactions.reset_application();
        self.budgets.recalculate_all(self.transactions.all());
    }

    /// Creates a budget and fills in spending already recorded for its month.
    pub fn create_budget(&mut self, dto: CreateBudgetDto) -> ServiceResult<Budget> {
        let budget = self.budgets.create_budget(dto)?;
        self.budgets
            .recalculate_budget_from_transactions(&budget.id, self.transactions.all())
    }

    pub fn create_budget_from_template(
        &mut self,
        template_id: &str,
        month: u32,
        year: i32,
    ) -> ServiceResult<Budget> {
        let budget = self
            .budgets
            .create_budget_from_template(template_id, month, year)?;
        self.budgets
            .recalculate_budget_from_transactions(&budget.id, self.transactions.all())
    }

    pub fn add_budget_category(
        &mut self,
        budget_id: &str,
        input: BudgetCategoryInput,
    ) -> ServiceResult<BudgetCategory> {
        let added = self.budgets.add_category_to_budget(budget_id, input)?;
        let budget = self
            .budgets
            .recalculate_budget_from_transactions(budget_id, self.transactions.all())?;
        Ok(budget.category(&added.id).cloned().unwrap_or(added))
    }

    /// Edits a budget line; a rename picks up the spending recorded under
    /// the new name.
    pub fn update_budget_category(
        &mut self,
        budget_id: &str,
        category_id: &str,
        changes: BudgetCategoryUpdate,
    ) -> ServiceResult<BudgetCategory> {
        let renamed = changes.name.is_some();
        let updated = self
            .budgets
            .update_budget_category(budget_id, category_id, changes)?;
        if !renamed {
            return Ok(updated);
        }
        let budget = self
            .budgets
            .recalculate_budget_from_transactions(budget_id, self.transactions.all())?;
        Ok(budget.category(category_id).cloned().unwrap_or(updated))
    }

    pub fn recalculate_budget(&mut self, budget_id: &str) -> ServiceResult<Budget> {
        self.budgets
            .recalculate_budget_from_transactions(budget_id, self.transactions.all())
    }

    pub fn dashboard(&self, recent_count: usize) -> DashboardSummary {
        SummaryService::dashboard(self.transactions.all(), recent_count)
    }

    pub fn category_stats(&self) -> CategoryStats {
        self.categories.category_stats(self.transactions.all())
    }

    pub fn is_category_in_use(&self, category_id: &str) -> bool {
        self.categories
            .is_category_in_use(category_id, self.transactions.all())
    }

    pub fn active_budget(&self) -> Option<&Budget> {
        self.budgets.active_budget(self.today())
    }
}
