use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::forms::{FormEngine, FormResult, TransactionForm};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::ui::formatting::{format_amount, print_two_column};
use crate::cli::ui::table::{Table, TableColumn};
use crate::core::FinanceError;
use crate::domain::common::{total_of, EntryType};
use crate::domain::transaction::{NewTransaction, Transaction, TransactionFilter};

use super::{parse_amount, parse_date, parse_kind, unknown_subcommand, ParsedArgs};

const USAGE: &str = "tx add <income|expense> <description> <amount> <category> [YYYY-MM-DD]
tx edit <id> [--type t] [--description d] [--amount n] [--category c] [--date d]
tx delete <id>
tx list [--type t] [--category c] [--search text] [--limit n]
tx show <id>
tx clear";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "tx",
        "Record, edit, delete and list transactions",
        USAGE,
        cmd_tx,
    )]
}

fn cmd_tx(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (sub, rest) = match args.split_first() {
        Some((sub, rest)) => (Some(*sub), rest),
        None => (None, args),
    };
    match sub.map(str::to_lowercase).as_deref() {
        Some("add") => tx_add(context, rest),
        Some("edit") => tx_edit(context, rest),
        Some("delete") | Some("rm") => tx_delete(context, rest),
        Some("list") | Some("ls") => tx_list(context, rest),
        Some("show") => tx_show(context, rest),
        Some("clear") => tx_clear(context),
        _ => Err(unknown_subcommand("tx", sub, USAGE)),
    }
}

fn parse_id(input: &str) -> Result<i64, CommandError> {
    input
        .parse()
        .map_err(|_| CommandError::InvalidArguments(format!("invalid transaction id `{}`", input)))
}

fn category_names(context: &ShellContext) -> Vec<String> {
    context
        .tracker
        .categories()
        .all()
        .iter()
        .map(|category| category.name.clone())
        .collect()
}

fn tx_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let new = if args.is_empty() {
        if !context.is_interactive() {
            return Err(CommandError::InvalidArguments(format!("usage: {}", USAGE)));
        }
        let form = TransactionForm::new(&category_names(context), context.today(), None);
        match FormEngine::new(&form).run(&mut context.interaction())? {
            FormResult::Completed(new) => new,
            FormResult::Cancelled => {
                output::info("Transaction not saved.");
                return Ok(());
            }
        }
    } else {
        let parsed = ParsedArgs::parse(args, &[])?;
        let kind = parse_kind(parsed.required(0, "type")?)?;
        let description = parsed.required(1, "description")?;
        let amount = parse_amount(parsed.required(2, "amount")?)?;
        let category = parsed.required(3, "category")?;
        let date = match parsed.positional(4).or(parsed.option("date")) {
            Some(raw) => parse_date(raw)?,
            None => context.today(),
        };
        NewTransaction::new(description, amount, category, date, kind)
    };

    warn_unknown_category(context, &new);
    let txn = context.tracker.add_transaction(new)?;
    output::success(format!("Recorded transaction #{}: {}", txn.id, describe(&txn, context.currency())));
    Ok(())
}

fn warn_unknown_category(context: &ShellContext, new: &NewTransaction) {
    if context
        .tracker
        .categories()
        .find_by_name(&new.category, new.kind)
        .is_none()
    {
        output::hint(format!(
            "`{}` is not a known {} category; see `category list`.",
            new.category.trim(),
            new.kind.as_str()
        ));
    }
}

fn tx_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let id = parse_id(parsed.required(0, "transaction id")?)?;
    let current = context
        .tracker
        .transactions()
        .get(id)
        .cloned()
        .ok_or(FinanceError::TransactionNotFound(id))?;

    let edited = if args.len() == 1 && context.is_interactive() {
        let form = TransactionForm::new(&category_names(context), context.today(), Some(&current));
        match FormEngine::new(&form).run(&mut context.interaction())? {
            FormResult::Completed(new) => new,
            FormResult::Cancelled => {
                output::info("Transaction unchanged.");
                return Ok(());
            }
        }
    } else {
        let mut new = NewTransaction::from(&current);
        if let Some(kind) = parsed.kind()? {
            new.kind = kind;
        }
        if let Some(description) = parsed.option("description") {
            new.description = description.to_string();
        }
        if let Some(amount) = parsed.amount("amount")? {
            new.amount = amount;
        }
        if let Some(category) = parsed.option("category") {
            new.category = category.to_string();
        }
        if let Some(date) = parsed.option("date") {
            new.date = parse_date(date)?;
        }
        new
    };

    let txn = context.tracker.update_transaction(id, edited)?;
    output::success(format!("Updated transaction #{}: {}", txn.id, describe(&txn, context.currency())));
    Ok(())
}

fn tx_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = parse_id(args.first().copied().ok_or_else(|| {
        CommandError::InvalidArguments("usage: tx delete <id>".into())
    })?)?;
    if context.tracker.transactions().get(id).is_none() {
        return Err(FinanceError::TransactionNotFound(id).into());
    }
    if !context.confirm(&format!("Delete transaction #{}?", id))? {
        output::info("Deletion cancelled.");
        return Ok(());
    }
    let txn = context.tracker.delete_transaction(id)?;
    output::success(format!("Deleted transaction #{} ({}).", txn.id, txn.description));
    Ok(())
}

fn tx_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let filter = TransactionFilter {
        kind: parsed.kind()?,
        category: parsed.option("category").map(str::to_string),
        search: parsed.option("search").map(str::to_string),
    };
    let limit = parsed
        .option("limit")
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| CommandError::InvalidArguments(format!("invalid limit `{}`", raw)))
        })
        .transpose()?;

    let mut matches = context.tracker.transactions().filtered(&filter);
    let total = matches.len();
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
    if matches.is_empty() {
        output::info("No transactions match.");
        return Ok(());
    }
    output::info(transaction_table(&matches, context.currency()).render());
    let shown_income: f64 = sum(&matches, EntryType::Income);
    let shown_expenses: f64 = sum(&matches, EntryType::Expense);
    output::info(format!(
        "{} of {} shown | income {} | expenses {}",
        matches.len(),
        total,
        format_amount(shown_income, context.currency()),
        format_amount(shown_expenses, context.currency())
    ));
    Ok(())
}

fn sum(transactions: &[&Transaction], kind: EntryType) -> f64 {
    total_of(
        transactions
            .iter()
            .filter(|txn| txn.kind == kind)
            .map(|txn| txn.magnitude()),
    )
}

fn tx_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = parse_id(args.first().copied().ok_or_else(|| {
        CommandError::InvalidArguments("usage: tx show <id>".into())
    })?)?;
    let txn = context
        .tracker
        .transactions()
        .get(id)
        .ok_or(FinanceError::TransactionNotFound(id))?;
    output::section(format!("Transaction #{}", txn.id));
    print_two_column(&[
        ("Description", txn.description.clone()),
        ("Type", txn.kind.to_string()),
        ("Amount", format_amount(txn.amount, context.currency())),
        ("Category", txn.category.clone()),
        ("Date", txn.date.to_string()),
    ]);
    Ok(())
}

fn tx_clear(context: &mut ShellContext) -> CommandResult {
    if !context.confirm("Delete every transaction?")? {
        return Ok(());
    }
    context.tracker.clear_transactions();
    output::success("All transactions deleted.");
    Ok(())
}

fn describe(txn: &Transaction, currency: &str) -> String {
    format!(
        "{} {} [{}] on {}",
        txn.description,
        format_amount(txn.amount, currency),
        txn.category,
        txn.date
    )
}

pub(crate) fn transaction_table(transactions: &[&Transaction], currency: &str) -> Table {
    let mut table = Table::new(vec![
        TableColumn::right("ID"),
        TableColumn::left("Date"),
        TableColumn::left("Description").max(32),
        TableColumn::left("Category").max(20),
        TableColumn::right("Amount"),
    ]);
    for txn in transactions {
        table.push(vec![
            txn.id.to_string(),
            txn.date.to_string(),
            txn.description.clone(),
            txn.category.clone(),
            format_amount(txn.amount, currency),
        ]);
    }
    table
}
