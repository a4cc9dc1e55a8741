use std::fs;

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::forms::{CategoryForm, FormEngine, FormResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{format_amount, format_percentage};
use crate::cli::ui::table::{Table, TableColumn};
use crate::domain::category::{CategorySummary, CategoryUpdate, NewCategory};

use super::{unknown_subcommand, ParsedArgs};

const USAGE: &str = "category list [--type t]
category add <name> <income|expense> [--description d] [--color #RRGGBB] [--icon i]
category edit <category> [--name n] [--type t] [--description d] [--color c] [--icon i]
category delete <category> [--type t]
category reset
category stats
category export <file>
category import <file>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "category",
        "Manage income and expense categories",
        USAGE,
        cmd_category,
    )]
}

fn cmd_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (sub, rest) = match args.split_first() {
        Some((sub, rest)) => (Some(*sub), rest),
        None => (None, args),
    };
    match sub.map(str::to_lowercase).as_deref() {
        Some("list") | Some("ls") | None => category_list(context, rest),
        Some("add") => category_add(context, rest),
        Some("edit") => category_edit(context, rest),
        Some("delete") | Some("rm") => category_delete(context, rest),
        Some("reset") => category_reset(context),
        Some("stats") => category_stats(context),
        Some("export") => category_export(context, rest),
        Some("import") => category_import(context, rest),
        _ => Err(unknown_subcommand("category", sub, USAGE)),
    }
}

fn category_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let kind = parsed.kind()?;
    let categories = context.tracker.categories();
    let mut table = Table::new(vec![
        TableColumn::left("ID").max(20),
        TableColumn::left("Name").max(24),
        TableColumn::left("Type"),
        TableColumn::left("Icon"),
        TableColumn::left("Color"),
        TableColumn::left("Default"),
    ]);
    for category in categories
        .all()
        .iter()
        .filter(|category| kind.map_or(true, |kind| category.kind == kind))
    {
        table.push(vec![
            category.id.clone(),
            category.name.clone(),
            category.kind.as_str().to_string(),
            category.icon.clone().unwrap_or_default(),
            category.color.clone().unwrap_or_default(),
            if category.is_default { "yes" } else { "" }.to_string(),
        ]);
    }
    if table.is_empty() {
        output::info("No categories.");
    } else {
        output::info(table.render());
    }
    Ok(())
}

fn category_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let new = if args.is_empty() {
        if !context.is_interactive() {
            return Err(CommandError::InvalidArguments(format!("usage: {}", USAGE)));
        }
        match FormEngine::new(&CategoryForm::new()).run(&mut context.interaction())? {
            FormResult::Completed(new) => new,
            FormResult::Cancelled => {
                output::info("Category not saved.");
                return Ok(());
            }
        }
    } else {
        let parsed = ParsedArgs::parse(args, &[])?;
        let name = parsed.required(0, "category name")?;
        let kind = super::parse_kind(parsed.required(1, "category type")?)?;
        NewCategory {
            name: name.to_string(),
            kind,
            description: parsed.option("description").map(str::to_string),
            color: parsed.option("color").map(str::to_string),
            icon: parsed.option("icon").map(str::to_string),
        }
    };
    let category = context.tracker.categories_mut().create(new)?;
    output::success(format!("Created category `{}` ({}).", category.name, category.id));
    Ok(())
}

fn category_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let reference = parsed.required(0, "category")?;
    let changes = CategoryUpdate {
        name: parsed.option("name").map(str::to_string),
        kind: parsed.kind()?,
        description: parsed.option("description").map(str::to_string),
        color: parsed.option("color").map(str::to_string),
        icon: parsed.option("icon").map(str::to_string),
    };
    if changes == CategoryUpdate::default() {
        return Err(CommandError::InvalidArguments(
            "nothing to change; pass at least one --option".into(),
        ));
    }
    // The type option here describes the new type, so resolve without it.
    let id = context.resolve_category(reference, None)?.id.clone();
    let category = context.tracker.categories_mut().update(&id, changes)?;
    output::success(format!("Updated category `{}`.", category.name));
    Ok(())
}

fn category_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let reference = parsed.required(0, "category")?;
    let category = context.resolve_category(reference, parsed.kind()?)?.clone();
    if category.is_default {
        output::warning(format!(
            "`{}` is a default category and cannot be deleted.",
            category.name
        ));
        return Ok(());
    }
    if context.tracker.is_category_in_use(&category.id) {
        output::warning(format!(
            "`{}` is still used by transactions; they keep the name as plain text.",
            category.name
        ));
    }
    if !context.confirm(&format!("Delete category `{}`?", category.name))? {
        return Ok(());
    }
    context.tracker.categories_mut().delete(&category.id)?;
    output::success(format!("Deleted category `{}`.", category.name));
    Ok(())
}

fn category_reset(context: &mut ShellContext) -> CommandResult {
    if !context.confirm("Remove custom categories and restore the defaults?")? {
        return Ok(());
    }
    context.tracker.categories_mut().reset_to_default();
    output::success("Categories restored to defaults.");
    Ok(())
}

fn category_stats(context: &mut ShellContext) -> CommandResult {
    let stats = context.tracker.category_stats();
    let currency = context.currency().to_string();
    let render = |title: &str, total: f64, rows: &[CategorySummary]| {
        output::section(format!("{} ({})", title, format_amount(total, &currency)));
        if rows.is_empty() {
            output::info("No activity.");
            return;
        }
        let mut table = Table::new(vec![
            TableColumn::left("Category").max(24),
            TableColumn::right("Count"),
            TableColumn::right("Total"),
            TableColumn::right("Share"),
        ]);
        for row in rows {
            table.push(vec![
                row.category.name.clone(),
                row.transaction_count.to_string(),
                format_amount(row.total_amount, &currency),
                format_percentage(row.percentage),
            ]);
        }
        output::info(table.render());
    };
    render("Income", stats.total_income, &stats.income_categories);
    render("Expenses", stats.total_expenses, &stats.expense_categories);
    Ok(())
}

fn category_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: category export <file>".into()))?;
    let json = context.tracker.categories().export_categories()?;
    fs::write(path, json)?;
    output::success(format!("Categories exported to {}.", path));
    Ok(())
}

fn category_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: category import <file>".into()))?;
    let json = fs::read_to_string(path)?;
    let count = context.tracker.categories_mut().import_categories(&json)?;
    output::success(format!("Imported {} categories.", count));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::context::test_context;

    #[test]
    fn custom_categories_can_be_added_edited_and_deleted() {
        let (mut context, _dir) = test_context();
        let before = context.tracker.categories().all().len();
        context
            .process_line("category add Mascotas expense --icon 🐶")
            .unwrap();
        assert_eq!(context.tracker.categories().all().len(), before + 1);
        context
            .process_line("category edit Mascotas --name \"Mascotas y veterinario\"")
            .unwrap();
        assert!(context
            .resolve_category("mascotas y veterinario", None)
            .is_ok());
        context
            .process_line("category delete \"Mascotas y veterinario\"")
            .unwrap();
        assert_eq!(context.tracker.categories().all().len(), before);
    }

    #[test]
    fn default_categories_survive_delete() {
        let (mut context, _dir) = test_context();
        let before = context.tracker.categories().all().to_vec();
        context.process_line("category delete Alimentación").unwrap();
        assert_eq!(context.tracker.categories().all(), before.as_slice());
    }

    #[test]
    fn export_then_import_round_trips_through_a_file() {
        let (mut context, dir) = test_context();
        let path = dir.path().join("categories.json");
        let path = path.to_string_lossy();
        context
            .process_line(&format!("category export \"{}\"", path))
            .unwrap();
        context.process_line("category add Mascotas expense").unwrap();
        context
            .process_line(&format!("category import \"{}\"", path))
            .unwrap();
        assert!(context.resolve_category("Mascotas", None).is_err());
    }
}
