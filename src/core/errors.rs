use thiserror::Error;

use crate::storage::StorageError;

/// Failures surfaced by the stores to their callers.
#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("Invalid import: {0}")]
    InvalidImport(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Default category `{0}` cannot be deleted")]
    DefaultCategoryProtected(String),
    #[error("Budget not found: {0}")]
    BudgetNotFound(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Alert not found: {0}")]
    AlertNotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
