use std::fs;
use std::path::PathBuf;

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, OutputPreferences};
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{format_percentage, print_two_column};
use crate::core::FinanceError;

use super::{unknown_subcommand, ParsedArgs};

const USAGE: &str = "settings show
settings set <locale|currency|color|plain|recent> <value>
settings budget [--warning pct] [--alert pct] [--currency c] [--auto-create on|off]
settings export [dir]
settings import <file>
settings reset";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "settings",
        "Preferences, backups and data reset",
        USAGE,
        cmd_settings,
    )]
}

fn cmd_settings(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (sub, rest) = match args.split_first() {
        Some((sub, rest)) => (Some(*sub), rest),
        None => (None, args),
    };
    match sub.map(str::to_lowercase).as_deref() {
        Some("show") | None => settings_show(context),
        Some("set") => settings_set(context, rest),
        Some("budget") => settings_budget(context, rest),
        Some("export") => settings_export(context, rest),
        Some("import") => settings_import(context, rest),
        Some("reset") => settings_reset(context),
        _ => Err(unknown_subcommand("settings", sub, USAGE)),
    }
}

fn settings_show(context: &mut ShellContext) -> CommandResult {
    output::section("Preferences");
    let entries: Vec<(&str, String)> = context.config.entries();
    print_two_column(&entries);

    let budget = context.tracker.budgets().settings();
    output::section("Budgets");
    print_two_column(&[
        ("currency", budget.default_currency.clone()),
        ("warning", format_percentage(budget.default_warning_threshold)),
        ("alert", format_percentage(budget.default_alert_threshold)),
        (
            "auto-create",
            if budget.auto_create_monthly_budgets { "on" } else { "off" }.to_string(),
        ),
    ]);
    output::hint(format!("Backups go to {}", context.export_dir.display()));
    Ok(())
}

fn settings_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (key, value) = match args {
        [key, value] => (*key, *value),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: settings set <key> <value>".into(),
            ))
        }
    };
    let mut config = context.config.clone();
    config.set(&key.to_ascii_lowercase(), value)?;
    context.apply_config(config);
    output::success(format!("{} updated.", key));
    Ok(())
}

fn on_off(input: &str) -> Result<bool, CommandError> {
    match input.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(CommandError::InvalidArguments(format!(
            "expected on or off, got `{}`",
            input
        ))),
    }
}

fn settings_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let mut settings = context.tracker.budgets().settings().clone();
    if let Some(warning) = parsed.amount("warning")? {
        settings.default_warning_threshold = warning;
    }
    if let Some(alert) = parsed.amount("alert")? {
        settings.default_alert_threshold = alert;
    }
    if let Some(currency) = parsed.option("currency") {
        settings.default_currency = currency.trim().to_uppercase();
    }
    if let Some(flag) = parsed.option("auto-create") {
        settings.auto_create_monthly_budgets = on_off(flag)?;
    }
    if settings == *context.tracker.budgets().settings() {
        return settings_show(context);
    }
    context.tracker.budgets_mut().update_settings(settings)?;
    output::success("Budget defaults updated.");
    Ok(())
}

fn settings_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dir = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| context.export_dir.clone());
    fs::create_dir_all(&dir)?;
    let path = context
        .tracker
        .transactions()
        .export_to_dir(&dir, context.today())?;
    output::success(format!(
        "Exported {} transactions to {}.",
        context.tracker.transactions().all().len(),
        path.display()
    ));
    Ok(())
}

fn settings_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: settings import <file>".into()))?;
    let json = fs::read_to_string(path)?;
    if !context.confirm("Replace every transaction with the file contents?")? {
        return Ok(());
    }
    match context.tracker.import_transactions(&json) {
        Ok(count) => {
            output::success(format!("Imported {} transactions.", count));
            Ok(())
        }
        Err(FinanceError::InvalidImport(reason)) => Err(CommandError::Message(format!(
            "Invalid backup file, nothing was changed: {}",
            reason
        ))),
        Err(err) => Err(err.into()),
    }
}

fn settings_reset(context: &mut ShellContext) -> CommandResult {
    if !context.confirm("Delete all transactions and preferences?")? {
        return Ok(());
    }
    context.tracker.reset_application();
    context.config = context.config_manager.reset();
    output::set_preferences(OutputPreferences::from(&context.config));
    output::success("Application data reset.");
    Ok(())
}
