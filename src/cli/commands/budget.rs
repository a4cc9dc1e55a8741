use chrono::Datelike;

use crate::cli::context::{parse_period, CommandError, CommandResult, ShellContext};
use crate::cli::forms::{BudgetWizard, FormResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{
    budget_status, format_amount, format_percentage, print_two_column, progress_bar, short_id,
};
use crate::cli::ui::table::{Table, TableColumn};
use crate::domain::budget::{
    Budget, BudgetCategoryInput, BudgetCategoryUpdate, BudgetSettingsPatch, BudgetUpdate,
    CreateBudgetDto,
};
use crate::domain::common::Displayable;

use super::{parse_amount, parse_kind, unknown_subcommand, ParsedArgs};

const USAGE: &str = "budget list
budget show [budget]
budget create <YYYY-MM> [name:type:amount ...] [--name n] [--template t] [--copy-from budget]
budget from-template [template] [YYYY-MM]
budget copy <budget> <YYYY-MM>
budget set <budget> [--name n] [--warning pct] [--alert pct] [--rollover on|off]
budget activate <budget>
budget delete <budget>
budget add-category <budget> <name> <income|expense> <amount>
budget set-amount <budget> <line> <amount>
budget rename-category <budget> <line> <new name>
budget remove-category <budget> <line>
budget recalc [budget]
budget performance [budget]
(<budget> is an id, id prefix, YYYY-MM or `current`)";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "budget",
        "Plan monthly budgets and track them against spending",
        USAGE,
        cmd_budget,
    )]
}

fn cmd_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (sub, rest) = match args.split_first() {
        Some((sub, rest)) => (Some(*sub), rest),
        None => (None, args),
    };
    match sub.map(str::to_lowercase).as_deref() {
        Some("list") | Some("ls") => budget_list(context),
        Some("show") | None => budget_show(context, rest),
        Some("create") => budget_create(context, rest),
        Some("from-template") => budget_from_template(context, rest),
        Some("copy") => budget_copy(context, rest),
        Some("set") => budget_set(context, rest),
        Some("activate") => budget_activate(context, rest),
        Some("delete") | Some("rm") => budget_delete(context, rest),
        Some("add-category") => budget_add_category(context, rest),
        Some("set-amount") => budget_set_amount(context, rest),
        Some("rename-category") => budget_rename_category(context, rest),
        Some("remove-category") => budget_remove_category(context, rest),
        Some("recalc") => budget_recalc(context, rest),
        Some("performance") | Some("perf") => budget_performance(context, rest),
        _ => Err(unknown_subcommand("budget", sub, USAGE)),
    }
}

fn required_period(input: &str) -> Result<(u32, i32), CommandError> {
    parse_period(input)
        .map(|(year, month)| (month, year))
        .ok_or_else(|| CommandError::InvalidArguments(format!("invalid period `{}` (use YYYY-MM)", input)))
}

/// `name:type:amount`, where the name may itself contain colons.
pub(crate) fn parse_line(spec: &str) -> Result<BudgetCategoryInput, CommandError> {
    let invalid = || {
        CommandError::InvalidArguments(format!(
            "invalid budget line `{}` (use name:type:amount)",
            spec
        ))
    };
    let mut parts = spec.rsplitn(3, ':');
    let amount = parts.next().ok_or_else(invalid)?;
    let kind = parts.next().ok_or_else(invalid)?;
    let name = parts.next().ok_or_else(invalid)?;
    Ok(BudgetCategoryInput::new(
        name,
        parse_kind(kind)?,
        parse_amount(amount)?,
    ))
}

fn budget_list(context: &mut ShellContext) -> CommandResult {
    let currency = context.currency().to_string();
    let mut budgets: Vec<&Budget> = context.tracker.budgets().budgets().iter().collect();
    budgets.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
    let mut table = Table::new(vec![
        TableColumn::left("ID"),
        TableColumn::left("Period"),
        TableColumn::left("Name").max(32),
        TableColumn::left("Active"),
        TableColumn::right("Budgeted"),
        TableColumn::right("Spent"),
    ]);
    for budget in budgets {
        table.push(vec![
            short_id(&budget.id).to_string(),
            format!("{}-{:02}", budget.year, budget.month),
            budget.name.clone(),
            if budget.is_active { "*" } else { "" }.to_string(),
            format_amount(budget.totals.budgeted_expenses, &currency),
            format_amount(budget.totals.actual_expenses, &currency),
        ]);
    }
    if table.is_empty() {
        output::info("No budgets yet. Try `budget from-template`.");
    } else {
        output::info(table.render());
    }
    Ok(())
}

fn budget_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let budget = context.resolve_budget(args.first().copied().unwrap_or("current"))?;
    let currency = context.currency();
    output::section(budget.display_label());
    let totals = &budget.totals;
    print_two_column(&[
        ("ID", budget.id.clone()),
        (
            "Income",
            format!(
                "{} of {}",
                format_amount(totals.actual_income, currency),
                format_amount(totals.budgeted_income, currency)
            ),
        ),
        (
            "Expenses",
            format!(
                "{} of {}",
                format_amount(totals.actual_expenses, currency),
                format_amount(totals.budgeted_expenses, currency)
            ),
        ),
        ("Projected", format_amount(totals.projected_balance, currency)),
        ("Actual", format_amount(totals.actual_balance, currency)),
        ("Variance", format_amount(totals.variance, currency)),
        (
            "Thresholds",
            format!(
                "warning {} / alert {}",
                format_percentage(budget.settings.warning_threshold),
                format_percentage(budget.settings.alert_threshold)
            ),
        ),
    ]);

    let mut table = Table::new(vec![
        TableColumn::left("Line"),
        TableColumn::left("Category").max(24),
        TableColumn::left("Type"),
        TableColumn::right("Budgeted"),
        TableColumn::right("Spent"),
        TableColumn::right("Remaining"),
        TableColumn::left("Progress"),
        TableColumn::left("Status"),
    ]);
    for line in &budget.categories {
        table.push(vec![
            short_id(&line.id).to_string(),
            format!("{} {}", line.icon.as_deref().unwrap_or(""), line.name)
                .trim()
                .to_string(),
            line.kind.as_str().to_string(),
            format_amount(line.budgeted_amount, currency),
            format_amount(line.spent_amount, currency),
            format_amount(line.remaining, currency),
            format!("{} {}", progress_bar(line.percentage, 10), format_percentage(line.percentage)),
            budget_status(line.status),
        ]);
    }
    if table.is_empty() {
        output::info("This budget has no lines. Use `budget add-category`.");
    } else {
        output::info(table.render());
    }
    Ok(())
}

fn report_created(budget: &Budget) {
    output::success(format!(
        "Created budget `{}` for {} with {} lines ({}).",
        budget.name,
        budget.period_label(),
        budget.categories.len(),
        short_id(&budget.id)
    ));
}

fn budget_create(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dto = if args.is_empty() {
        if !context.is_interactive() {
            return Err(CommandError::InvalidArguments(format!("usage: {}", USAGE)));
        }
        match BudgetWizard::new(context.today()).run(&mut context.interaction())? {
            FormResult::Completed(dto) => dto,
            FormResult::Cancelled => {
                output::info("Budget not created.");
                return Ok(());
            }
        }
    } else {
        let parsed = ParsedArgs::parse(args, &[])?;
        let (month, year) = required_period(parsed.required(0, "period")?)?;
        let mut dto = CreateBudgetDto::new(month, year);
        dto.name = parsed.option("name").map(str::to_string);
        if let Some(template) = parsed.option("template") {
            dto.template_id = Some(context.resolve_template(template)?.id.clone());
        }
        if let Some(source) = parsed.option("copy-from") {
            dto.copy_from_budget_id = Some(context.resolve_budget_id(source)?);
        }
        for spec in parsed.positionals.iter().skip(1) {
            dto = dto.with_category(parse_line(spec)?);
        }
        dto
    };
    let budget = context.tracker.create_budget(dto)?;
    report_created(&budget);
    Ok(())
}

fn budget_from_template(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    // Either argument may be omitted; a period-shaped argument is the period.
    let (mut template_ref, mut period_ref) = (None, None);
    for arg in args {
        if parse_period(arg).is_some() {
            period_ref = Some(*arg);
        } else {
            template_ref = Some(*arg);
        }
    }
    let template_id = match template_ref {
        Some(reference) => context.resolve_template(reference)?.id.clone(),
        None => context
            .tracker
            .budgets()
            .default_template()
            .map(|template| template.id.clone())
            .ok_or_else(|| CommandError::Message("No default template configured.".into()))?,
    };
    let (month, year) = match period_ref {
        Some(period) => required_period(period)?,
        None => (context.today().month(), context.today().year()),
    };
    let budget = context
        .tracker
        .create_budget_from_template(&template_id, month, year)?;
    report_created(&budget);
    Ok(())
}

fn budget_copy(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let source = context.resolve_budget_id(parsed.required(0, "source budget")?)?;
    let (month, year) = required_period(parsed.required(1, "target period")?)?;
    let mut dto = CreateBudgetDto::new(month, year);
    dto.copy_from_budget_id = Some(source);
    dto.name = parsed.option("name").map(str::to_string);
    let budget = context.tracker.create_budget(dto)?;
    report_created(&budget);
    Ok(())
}

fn parse_switch(input: &str) -> Result<bool, CommandError> {
    match input.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(CommandError::InvalidArguments(format!(
            "expected on or off, got `{}`",
            other
        ))),
    }
}

fn budget_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let id = context.resolve_budget_id(parsed.required(0, "budget")?)?;
    let settings = BudgetSettingsPatch {
        warning_threshold: parsed.amount("warning")?,
        alert_threshold: parsed.amount("alert")?,
        rollover_unused: parsed.option("rollover").map(parse_switch).transpose()?,
        auto_create_next: parsed.option("auto-create").map(parse_switch).transpose()?,
    };
    let has_settings = settings != BudgetSettingsPatch::default();
    let changes = BudgetUpdate {
        name: parsed.option("name").map(str::to_string),
        settings: has_settings.then_some(settings),
    };
    if changes.name.is_none() && changes.settings.is_none() {
        return Err(CommandError::InvalidArguments("nothing to change".into()));
    }
    let budget = context.tracker.budgets_mut().update_budget(&id, changes)?;
    context.tracker.budgets_mut().check_budget_alerts(&id)?;
    output::success(format!("Updated budget `{}`.", budget.name));
    Ok(())
}

fn budget_activate(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: budget activate <budget>".into()))?;
    let id = context.resolve_budget_id(reference)?;
    let budget = context.tracker.budgets_mut().activate_budget(&id)?;
    output::success(format!("`{}` is now the active budget for {}.", budget.name, budget.period_label()));
    Ok(())
}

fn budget_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: budget delete <budget>".into()))?;
    let id = context.resolve_budget_id(reference)?;
    if !context.confirm("Delete this budget and its alerts?")? {
        return Ok(());
    }
    let budget = context.tracker.budgets_mut().delete_budget(&id)?;
    output::success(format!("Deleted budget `{}`.", budget.name));
    Ok(())
}

fn budget_add_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let id = context.resolve_budget_id(parsed.required(0, "budget")?)?;
    let mut input = BudgetCategoryInput::new(
        parsed.required(1, "category name")?,
        parse_kind(parsed.required(2, "category type")?)?,
        parse_amount(parsed.required(3, "amount")?)?,
    );
    input.color = parsed.option("color").map(str::to_string);
    input.icon = parsed.option("icon").map(str::to_string);
    let line = context.tracker.add_budget_category(&id, input)?;
    output::success(format!(
        "Added `{}` with {} budgeted.",
        line.name,
        format_amount(line.budgeted_amount, context.currency())
    ));
    Ok(())
}

fn budget_set_amount(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let budget = context.resolve_budget(parsed.required(0, "budget")?)?;
    let line_id = context
        .resolve_budget_line(budget, parsed.required(1, "budget line")?)?
        .id
        .clone();
    let budget_id = budget.id.clone();
    let changes = BudgetCategoryUpdate {
        budgeted_amount: Some(parse_amount(parsed.required(2, "amount")?)?),
        ..Default::default()
    };
    let line = context
        .tracker
        .update_budget_category(&budget_id, &line_id, changes)?;
    output::success(format!(
        "`{}` now budgets {} ({} used, {}).",
        line.name,
        format_amount(line.budgeted_amount, context.currency()),
        format_percentage(line.percentage),
        line.status
    ));
    Ok(())
}

fn budget_rename_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let budget = context.resolve_budget(parsed.required(0, "budget")?)?;
    let line_id = context
        .resolve_budget_line(budget, parsed.required(1, "budget line")?)?
        .id
        .clone();
    let budget_id = budget.id.clone();
    let changes = BudgetCategoryUpdate {
        name: Some(parsed.required(2, "new name")?.to_string()),
        ..Default::default()
    };
    let line = context
        .tracker
        .update_budget_category(&budget_id, &line_id, changes)?;
    output::success(format!(
        "Line renamed to `{}` ({} spent).",
        line.name,
        format_amount(line.spent_amount, context.currency())
    ));
    Ok(())
}

fn budget_remove_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let budget = context.resolve_budget(parsed.required(0, "budget")?)?;
    let line_id = context
        .resolve_budget_line(budget, parsed.required(1, "budget line")?)?
        .id
        .clone();
    let budget_id = budget.id.clone();
    let removed = context
        .tracker
        .budgets_mut()
        .remove_category_from_budget(&budget_id, &line_id)?;
    output::success(format!("Removed `{}` from the budget.", removed.name));
    Ok(())
}

fn budget_recalc(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first() {
        Some(reference) => {
            let id = context.resolve_budget_id(reference)?;
            let budget = context.tracker.recalculate_budget(&id)?;
            output::success(format!("Recalculated `{}`.", budget.name));
        }
        None => {
            let ids: Vec<String> = context
                .tracker
                .budgets()
                .budgets()
                .iter()
                .map(|budget| budget.id.clone())
                .collect();
            for id in &ids {
                context.tracker.recalculate_budget(id)?;
            }
            output::success(format!("Recalculated {} budgets.", ids.len()));
        }
    }
    Ok(())
}

fn budget_performance(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let budget = context.resolve_budget(args.first().copied().unwrap_or("current"))?;
    let report = context
        .tracker
        .budgets()
        .get_budget_performance(&budget.id)
        .ok_or_else(|| CommandError::Message("Budget has no performance data.".into()))?;
    output::section(format!("Performance: {}", budget.display_label()));
    let metrics = &report.performance;
    print_two_column(&[
        ("Score", format!("{:.0}/100", metrics.overall_score)),
        ("On track", metrics.categories_on_track.to_string()),
        ("Over budget", metrics.categories_over_budget.to_string()),
        ("Variance", format_amount(metrics.total_variance, context.currency())),
        ("Savings rate", format_percentage(metrics.savings_rate)),
        (
            "Best",
            report.insights.best_category.clone().unwrap_or_else(|| "-".into()),
        ),
        (
            "Worst",
            report.insights.worst_category.clone().unwrap_or_else(|| "-".into()),
        ),
    ]);
    for recommendation in &report.insights.recommendations {
        output::hint(recommendation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::test_context;
    use crate::domain::budget::BudgetStatus;
    use crate::domain::common::EntryType;

    #[test]
    fn budget_lines_parse_from_the_right() {
        let line = parse_line("Casa: alquiler:expense:1200").unwrap();
        assert_eq!(line.name, "Casa: alquiler");
        assert_eq!(line.kind, EntryType::Expense);
        assert_eq!(line.budgeted_amount, 1200.0);
        assert!(parse_line("Casa:1200").is_err());
    }

    #[test]
    fn create_spend_and_adjust_a_budget() {
        let (mut context, _dir) = test_context();
        context
            .process_line("budget create 2024-11 Alimentación:expense:400 --name Noviembre")
            .unwrap();
        context
            .process_line("tx add expense Super 380 Alimentación 2024-11-05")
            .unwrap();
        let budget = context.resolve_budget("2024-11").unwrap();
        let line = budget.find_category("Alimentación", EntryType::Expense).unwrap();
        assert_eq!(line.status, BudgetStatus::Warning);

        context
            .process_line("budget set-amount 2024-11 Alimentación 300")
            .unwrap();
        let budget = context.resolve_budget("current").unwrap();
        let line = budget.find_category("Alimentación", EntryType::Expense).unwrap();
        assert_eq!(line.status, BudgetStatus::Exceeded);
        assert!(!context.tracker.budgets().active_alerts().is_empty());

        context.process_line("budget show").unwrap();
        context.process_line("budget performance 2024-11").unwrap();
        context
            .process_line("budget remove-category current Alimentación")
            .unwrap();
        assert!(context.resolve_budget("current").unwrap().categories.is_empty());
    }

    #[test]
    fn copy_and_template_creation_use_the_right_periods() {
        let (mut context, _dir) = test_context();
        context.process_line("budget from-template").unwrap();
        let november = context.resolve_budget("2024-11").unwrap();
        assert_eq!(november.categories.len(), 9);
        context.process_line("budget copy 2024-11 2024-12").unwrap();
        assert_eq!(context.resolve_budget("2024-12").unwrap().categories.len(), 9);

        context.process_line("budget create 2024-12 --name Segundo").unwrap();
        let active: Vec<_> = context
            .tracker
            .budgets()
            .budgets()
            .iter()
            .filter(|budget| budget.is_for(12, 2024) && budget.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Segundo");
    }

    #[test]
    fn renaming_a_line_refuses_duplicates_and_recounts_spending() {
        let (mut context, _dir) = test_context();
        context
            .process_line("budget create 2024-11 Alimentación:expense:400 Varios:expense:100")
            .unwrap();
        context
            .process_line("tx add expense Taxi 25 Transporte 2024-11-05")
            .unwrap();
        context
            .process_line("budget remove-category current Transporte")
            .unwrap();

        assert!(context
            .process_line("budget rename-category current Varios Alimentación")
            .is_err());
        context
            .process_line("budget rename-category current Varios Transporte")
            .unwrap();

        let budget = context.resolve_budget("current").unwrap();
        let line = budget.find_category("Transporte", EntryType::Expense).unwrap();
        assert_eq!(line.spent_amount, 25.0);
        assert_eq!(budget.totals.actual_expenses, 25.0);
    }
}
