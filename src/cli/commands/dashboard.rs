use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{
    balance_status, format_amount, format_percentage, print_two_column, progress_bar, severity,
};
use crate::cli::ui::table::{Table, TableColumn};

use super::transaction::transaction_table;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "dashboard",
        "Show balance, recent activity and the current budget",
        "dashboard",
        cmd_dashboard,
    )]
}

fn cmd_dashboard(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let summary = context.tracker.dashboard(context.config.recent_count);

    output::section("Overview");
    print_two_column(&[
        ("Income", format_amount(summary.total_income, &currency)),
        ("Expenses", format_amount(summary.total_expenses, &currency)),
        (
            "Balance",
            format!(
                "{} ({})",
                format_amount(summary.balance, &currency),
                balance_status(summary.status)
            ),
        ),
        ("Transactions", summary.transaction_count.to_string()),
    ]);

    output::section("Recent transactions");
    if summary.recent.is_empty() {
        output::info("No transactions yet. Use `tx add` to record one.");
    } else {
        let recent: Vec<_> = summary.recent.iter().collect();
        output::info(transaction_table(&recent, &currency).render());
    }

    if !summary.expense_breakdown.is_empty() {
        output::section("Expenses by category");
        let mut table = Table::new(vec![
            TableColumn::left("Category").max(24),
            TableColumn::right("Amount"),
            TableColumn::right("Share"),
        ]);
        for share in &summary.expense_breakdown {
            table.push(vec![
                share.category.clone(),
                format_amount(share.amount, &currency),
                format_percentage(share.percentage),
            ]);
        }
        output::info(table.render());
    }

    match context.tracker.active_budget() {
        Some(budget) => {
            output::section(format!("Budget: {}", budget.name));
            let used = if budget.totals.budgeted_expenses > 0.0 {
                budget.totals.actual_expenses / budget.totals.budgeted_expenses * 100.0
            } else {
                0.0
            };
            print_two_column(&[
                (
                    "Spent",
                    format!(
                        "{} of {}",
                        format_amount(budget.totals.actual_expenses, &currency),
                        format_amount(budget.totals.budgeted_expenses, &currency)
                    ),
                ),
                ("Used", format!("{} {}", progress_bar(used, 20), format_percentage(used))),
                ("Variance", format_amount(budget.totals.variance, &currency)),
            ]);
        }
        None => output::hint("No budget for this month. Try `budget from-template`."),
    }

    let unread = context.tracker.budgets().unread_alerts();
    if !unread.is_empty() {
        output::section(format!("Alerts ({} unread)", unread.len()));
        for alert in unread {
            output::warning(format!("[{}] {}", severity(alert.severity), alert.message));
        }
    }
    Ok(())
}
