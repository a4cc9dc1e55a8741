use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{format_amount, format_percentage, print_two_column, short_id};
use crate::cli::ui::table::{Table, TableColumn};
use crate::domain::budget::{BudgetCategoryInput, NewTemplate};
use crate::domain::common::{total_of, Displayable, EntryType};

use super::budget::parse_line;
use super::{unknown_subcommand, ParsedArgs};

const USAGE: &str = "template list
template show <template>
template create <name> [name:type:amount ...] [--from budget] [--description d] [--default]
template delete <template>
template default <template>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "template",
        "Manage reusable budget templates",
        USAGE,
        cmd_template,
    )]
}

fn cmd_template(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (sub, rest) = match args.split_first() {
        Some((sub, rest)) => (Some(*sub), rest),
        None => (None, args),
    };
    match sub.map(str::to_lowercase).as_deref() {
        Some("list") | Some("ls") | None => template_list(context),
        Some("show") => template_show(context, rest),
        Some("create") => template_create(context, rest),
        Some("delete") | Some("rm") => template_delete(context, rest),
        Some("default") => template_default(context, rest),
        _ => Err(unknown_subcommand("template", sub, USAGE)),
    }
}

fn template_list(context: &mut ShellContext) -> CommandResult {
    let currency = context.currency().to_string();
    let mut table = Table::new(vec![
        TableColumn::left("ID"),
        TableColumn::left("Name").max(32),
        TableColumn::right("Lines"),
        TableColumn::right("Planned expenses"),
        TableColumn::left("Default"),
    ]);
    for template in context.tracker.budgets().templates() {
        let planned = total_of(
            template
                .categories
                .iter()
                .filter(|line| line.kind == EntryType::Expense)
                .map(|line| line.default_amount),
        );
        table.push(vec![
            short_id(&template.id).to_string(),
            template.name.clone(),
            template.categories.len().to_string(),
            format_amount(planned, &currency),
            if template.is_default { "*" } else { "" }.to_string(),
        ]);
    }
    if table.is_empty() {
        output::info("No templates.");
    } else {
        output::info(table.render());
    }
    Ok(())
}

fn template_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: template show <template>".into()))?;
    let template = context.resolve_template(reference)?;
    let currency = context.currency();
    output::section(template.display_label());
    print_two_column(&[
        ("ID", template.id.clone()),
        ("Description", template.description.clone().unwrap_or_else(|| "-".into())),
        (
            "Thresholds",
            format!(
                "warning {} / alert {}",
                format_percentage(template.default_settings.warning_threshold),
                format_percentage(template.default_settings.alert_threshold)
            ),
        ),
    ]);
    let mut table = Table::new(vec![
        TableColumn::left("Category").max(28),
        TableColumn::left("Type"),
        TableColumn::right("Amount"),
    ]);
    for line in &template.categories {
        table.push(vec![
            format!("{} {}", line.icon.as_deref().unwrap_or(""), line.name)
                .trim()
                .to_string(),
            line.kind.as_str().to_string(),
            format_amount(line.default_amount, currency),
        ]);
    }
    output::info(table.render());
    Ok(())
}

fn template_create(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &["default"])?;
    let name = parsed.required(0, "template name")?;
    let mut new = NewTemplate {
        name: name.to_string(),
        description: parsed.option("description").map(str::to_string),
        is_default: parsed.flag("default"),
        ..Default::default()
    };
    if let Some(source) = parsed.option("from") {
        let budget = context.resolve_budget(source)?;
        new.categories = budget.categories.iter().map(BudgetCategoryInput::from).collect();
        new.default_settings = budget.settings;
    }
    for spec in parsed.positionals.iter().skip(1) {
        new.categories.push(parse_line(spec)?);
    }
    let template = context.tracker.budgets_mut().create_template(new)?;
    output::success(format!(
        "Created template `{}` with {} lines ({}).",
        template.name,
        template.categories.len(),
        short_id(&template.id)
    ));
    Ok(())
}

fn template_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: template delete <template>".into()))?;
    let id = context.resolve_template(reference)?.id.clone();
    if !context.confirm("Delete this template?")? {
        return Ok(());
    }
    let removed = context.tracker.budgets_mut().delete_template(&id)?;
    output::success(format!("Deleted template `{}`.", removed.name));
    Ok(())
}

fn template_default(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: template default <template>".into()))?;
    let id = context.resolve_template(reference)?.id.clone();
    let template = context.tracker.budgets_mut().set_default_template(&id)?;
    output::success(format!("`{}` is now the default template.", template.name));
    Ok(())
}
