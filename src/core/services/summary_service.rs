use std::{collections::BTreeMap, fmt};

use crate::domain::common::{total_of, EntryType};
use crate::domain::transaction::Transaction;

/// Sign of the overall balance, as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatus {
    Positive,
    Negative,
    Balanced,
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BalanceStatus::Positive => "positive",
            BalanceStatus::Negative => "negative",
            BalanceStatus::Balanced => "balanced",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseShare {
    pub category: String,
    pub amount: f64,
    /// Share of all expenses, 0-100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub status: BalanceStatus,
    pub transaction_count: usize,
    pub recent: Vec<Transaction>,
    pub expense_breakdown: Vec<ExpenseShare>,
}

pub struct SummaryService;

impl SummaryService {
    pub fn dashboard(transactions: &[Transaction], recent_count: usize) -> DashboardSummary {
        let total_income = Self::total(transactions, EntryType::Income);
        let total_expenses = Self::total(transactions, EntryType::Expense);
        let balance = total_income - total_expenses;

        let mut recent: Vec<Transaction> = transactions.to_vec();
        recent.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        recent.truncate(recent_count);

        DashboardSummary {
            total_income,
            total_expenses,
            balance,
            status: Self::balance_status(balance),
            transaction_count: transactions.len(),
            recent,
            expense_breakdown: Self::expense_breakdown(transactions),
        }
    }

    pub fn balance_status(balance: f64) -> BalanceStatus {
        if balance > 0.0 {
            BalanceStatus::Positive
        } else if balance < 0.0 {
            BalanceStatus::Negative
        } else {
            BalanceStatus::Balanced
        }
    }

    /// Expense totals per category name, largest first.
    pub fn expense_breakdown(transactions: &[Transaction]) -> Vec<ExpenseShare> {
        let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
        for txn in transactions.iter().filter(|txn| txn.is_expense()) {
            *by_category.entry(txn.category.as_str()).or_default() += txn.magnitude();
        }
        let total = total_of(by_category.values().copied());
        let mut shares: Vec<ExpenseShare> = by_category
            .into_iter()
            .map(|(category, amount)| ExpenseShare {
                category: category.to_string(),
                amount,
                percentage: if total > 0.0 { amount / total * 100.0 } else { 0.0 },
            })
            .collect();
        shares.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        shares
    }

    fn total(transactions: &[Transaction], kind: EntryType) -> f64 {
        total_of(
            transactions
                .iter()
                .filter(|txn| txn.kind == kind)
                .map(Transaction::magnitude),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::NewTransaction;
    use chrono::NaiveDate;

    fn sample() -> Vec<Transaction> {
        let on = |day| NaiveDate::from_ymd_opt(2024, 11, day).unwrap();
        vec![
            Transaction::from_new(1, NewTransaction::income("Nómina", 1000.0, "Salario", on(1))),
            Transaction::from_new(2, NewTransaction::expense("Super", 300.0, "Alimentación", on(2))),
            Transaction::from_new(3, NewTransaction::expense("Bus", 100.0, "Transporte", on(3))),
            Transaction::from_new(4, NewTransaction::expense("Cena", 100.0, "Alimentación", on(4))),
        ]
    }

    #[test]
    fn dashboard_reports_totals_status_and_recent_items() {
        let summary = SummaryService::dashboard(&sample(), 2);
        assert_eq!(summary.total_income, 1000.0);
        assert_eq!(summary.total_expenses, 500.0);
        assert_eq!(summary.balance, 500.0);
        assert_eq!(summary.status, BalanceStatus::Positive);
        let ids: Vec<i64> = summary.recent.iter().map(|txn| txn.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn breakdown_groups_expenses_by_category() {
        let shares = SummaryService::expense_breakdown(&sample());
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category, "Alimentación");
        assert_eq!(shares[0].amount, 400.0);
        assert_eq!(shares[0].percentage, 80.0);
    }

    #[test]
    fn balance_status_has_three_states() {
        assert_eq!(SummaryService::balance_status(-0.5), BalanceStatus::Negative);
        assert_eq!(SummaryService::balance_status(0.0), BalanceStatus::Balanced);
        assert!(SummaryService::dashboard(&[], 5).expense_breakdown.is_empty());
    }
}
