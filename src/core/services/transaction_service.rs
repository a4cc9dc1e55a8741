use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::core::errors::FinanceError;
use crate::core::time::Clock;
use crate::domain::common::{total_of, EntryType};
use crate::domain::transaction::{
    validate_import_value, NewTransaction, Transaction, TransactionFilter,
};
use crate::storage::{json_file::write_atomic, keys, LocalStorage};
use crate::utils::build_info::APP_VERSION;

use super::ServiceResult;

const EXPORT_PREFIX: &str = "finance-tracker-backup";

/// Outcome of a transaction mutation, handed to whoever keeps budgets in sync.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionChange {
    Added(Transaction),
    Updated {
        previous: Transaction,
        current: Transaction,
    },
    Deleted(Transaction),
}

impl TransactionChange {
    /// The transaction as it exists after the change (or as it was, for deletes).
    pub fn transaction(&self) -> &Transaction {
        match self {
            TransactionChange::Added(txn) | TransactionChange::Deleted(txn) => txn,
            TransactionChange::Updated { current, .. } => current,
        }
    }

    /// Every expense version involved; budgets only track these.
    pub fn expense_versions(&self) -> Vec<&Transaction> {
        let versions = match self {
            TransactionChange::Added(txn) | TransactionChange::Deleted(txn) => vec![txn],
            TransactionChange::Updated { previous, current } => vec![previous, current],
        };
        versions.into_iter().filter(|txn| txn.is_expense()).collect()
    }
}

/// Owns the transaction collection and persists it as one JSON array.
pub struct TransactionService {
    storage: LocalStorage,
    clock: Arc<dyn Clock>,
    transactions: Vec<Transaction>,
}

impl TransactionService {
    /// Loads stored transactions and stamps the current application version.
    pub fn open(storage: LocalStorage, clock: Arc<dyn Clock>) -> Self {
        let transactions = storage
            .get::<Vec<Transaction>>(keys::TRANSACTIONS)
            .unwrap_or_default();
        storage.set(keys::APP_VERSION, APP_VERSION);
        info!(count = transactions.len(), "transactions loaded");
        Self {
            storage,
            clock,
            transactions,
        }
    }

    pub fn all(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, id: i64) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn add(&mut self, new: NewTransaction) -> ServiceResult<TransactionChange> {
        new.validate().map_err(FinanceError::Validation)?;
        let txn = Transaction::from_new(self.next_id(), new);
        self.transactions.push(txn.clone());
        self.persist();
        info!(id = txn.id, category = %txn.category, amount = txn.amount, "transaction added");
        Ok(TransactionChange::Added(txn))
    }

    /// Replaces the transaction with `id` wholesale, keeping its id.
    pub fn update(&mut self, id: i64, new: NewTransaction) -> ServiceResult<TransactionChange> {
        new.validate().map_err(FinanceError::Validation)?;
        let slot = self
            .transactions
            .iter_mut()
            .find(|txn| txn.id == id)
            .ok_or(FinanceError::TransactionNotFound(id))?;
        let current = Transaction::from_new(id, new);
        let previous = std::mem::replace(slot, current.clone());
        self.persist();
        info!(id, "transaction updated");
        Ok(TransactionChange::Updated { previous, current })
    }

    pub fn delete(&mut self, id: i64) -> ServiceResult<TransactionChange> {
        let index = self
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| {
                warn!(id, "delete requested for unknown transaction");
                FinanceError::TransactionNotFound(id)
            })?;
        let removed = self.transactions.remove(index);
        self.persist();
        info!(id, "transaction deleted");
        Ok(TransactionChange::Deleted(removed))
    }

    pub fn total_income(&self) -> f64 {
        self.total_for(EntryType::Income)
    }

    /// Expenses as a positive magnitude.
    pub fn total_expenses(&self) -> f64 {
        self.total_for(EntryType::Expense)
    }

    pub fn balance(&self) -> f64 {
        self.total_income() - self.total_expenses()
    }

    fn total_for(&self, kind: EntryType) -> f64 {
        total_of(
            self.transactions
                .iter()
                .filter(|txn| txn.kind == kind)
                .map(Transaction::magnitude),
        )
    }

    /// Validates every element before replacing the collection in one write.
    pub fn import_transactions(&mut self, json: &str) -> ServiceResult<usize> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| FinanceError::InvalidImport(format!("not valid JSON: {}", err)))?;
        let elements = value
            .as_array()
            .ok_or_else(|| FinanceError::InvalidImport("expected a JSON array".into()))?;
        for (index, element) in elements.iter().enumerate() {
            validate_import_value(index, element).map_err(|reason| {
                warn!(%reason, "import rejected");
                FinanceError::InvalidImport(reason)
            })?;
        }
        let imported: Vec<Transaction> = serde_json::from_value(value)
            .map_err(|err| FinanceError::InvalidImport(err.to_string()))?;
        let count = imported.len();
        self.transactions = imported;
        self.persist();
        info!(count, "transactions imported");
        Ok(count)
    }

    pub fn export_transactions(&self) -> ServiceResult<String> {
        Ok(serde_json::to_string_pretty(&self.transactions)?)
    }

    pub fn export_file_name(date: NaiveDate) -> String {
        format!("{}-{}.json", EXPORT_PREFIX, date.format("%Y-%m-%d"))
    }

    /// Writes the export document into `dir` and returns its path.
    pub fn export_to_dir(&self, dir: &Path, date: NaiveDate) -> ServiceResult<PathBuf> {
        let path = dir.join(Self::export_file_name(date));
        write_atomic(&path, &self.export_transactions()?)?;
        info!(path = %path.display(), "transactions exported");
        Ok(path)
    }

    /// Drops transactions, preferences and the version stamp.
    pub fn reset_application(&mut self) {
        for key in keys::LEGACY_KEYS {
            self.storage.remove(key);
        }
        self.transactions.clear();
        info!("application data reset");
    }

    pub fn clear_all(&mut self) {
        self.transactions.clear();
        self.persist();
    }

    /// Matching transactions, newest first.
    pub fn filtered(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        let mut matches: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .collect();
        matches.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        matches
    }

    pub fn recent(&self, count: usize) -> Vec<&Transaction> {
        let mut all = self.filtered(&TransactionFilter::default());
        all.truncate(count);
        all
    }

    pub fn categories_in_use(&self) -> Vec<String> {
        self.transactions
            .iter()
            .map(|txn| txn.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn next_id(&self) -> i64 {
        let now = self.clock.now().timestamp_millis();
        let highest = self.transactions.iter().map(|txn| txn.id).max();
        match highest {
            Some(highest) if highest >= now => highest + 1,
            _ => now,
        }
    }

    fn persist(&self) {
        self.storage.set(keys::TRANSACTIONS, &self.transactions);
    }
}
