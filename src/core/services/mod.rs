pub mod budget_service;
pub mod category_service;
pub mod summary_service;
pub mod transaction_service;

pub use budget_service::BudgetService;
pub use category_service::CategoryService;
pub use summary_service::SummaryService;
pub use transaction_service::{TransactionChange, TransactionService};

use super::errors::FinanceError;

pub type ServiceResult<T> = Result<T, FinanceError>;
