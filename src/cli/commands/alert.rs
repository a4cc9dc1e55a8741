use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{severity, short_id};
use crate::cli::ui::table::{Table, TableColumn};
use crate::domain::budget::BudgetAlert;

use super::{unknown_subcommand, ParsedArgs};

const USAGE: &str = "alert list [--all]
alert read <alert|all>
alert clear <alert>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "alert",
        "Review budget alerts",
        USAGE,
        cmd_alert,
    )]
}

fn cmd_alert(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (sub, rest) = match args.split_first() {
        Some((sub, rest)) => (Some(*sub), rest),
        None => (None, args),
    };
    match sub.map(str::to_lowercase).as_deref() {
        Some("list") | Some("ls") | None => alert_list(context, rest),
        Some("read") => alert_read(context, rest),
        Some("clear") | Some("rm") => alert_clear(context, rest),
        _ => Err(unknown_subcommand("alert", sub, USAGE)),
    }
}

fn alert_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &["all"])?;
    let budgets = context.tracker.budgets();
    let mut alerts: Vec<&BudgetAlert> = if parsed.flag("all") {
        budgets.alerts().iter().collect()
    } else {
        budgets.active_alerts()
    };
    alerts.sort_by(|a, b| b.date_created.cmp(&a.date_created));

    let mut table = Table::new(vec![
        TableColumn::left("ID"),
        TableColumn::left("Severity"),
        TableColumn::left("Budget").max(24),
        TableColumn::left("Message").max(48),
        TableColumn::left("State"),
    ]);
    for alert in alerts {
        let budget = budgets
            .get_budget(&alert.budget_id)
            .map(|budget| budget.name.clone())
            .unwrap_or_else(|| "(deleted)".into());
        let state = match (alert.is_active, alert.is_read) {
            (false, _) => "resolved",
            (true, false) => "new",
            (true, true) => "read",
        };
        table.push(vec![
            short_id(&alert.id).to_string(),
            severity(alert.severity),
            budget,
            alert.message.clone(),
            state.to_string(),
        ]);
    }
    if table.is_empty() {
        output::info("No alerts.");
    } else {
        output::info(table.render());
    }
    Ok(())
}

fn alert_read(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: alert read <alert|all>".into()))?;
    let ids: Vec<String> = if reference.eq_ignore_ascii_case("all") {
        context
            .tracker
            .budgets()
            .unread_alerts()
            .into_iter()
            .map(|alert| alert.id.clone())
            .collect()
    } else {
        vec![context.resolve_alert_id(reference)?]
    };
    for id in &ids {
        context.tracker.budgets_mut().mark_alert_as_read(id)?;
    }
    output::success(format!("Marked {} alert(s) as read.", ids.len()));
    Ok(())
}

fn alert_clear(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: alert clear <alert>".into()))?;
    let id = context.resolve_alert_id(reference)?;
    let removed = context.tracker.budgets_mut().clear_alert(&id)?;
    output::success(format!("Cleared alert: {}", removed.message));
    Ok(())
}
