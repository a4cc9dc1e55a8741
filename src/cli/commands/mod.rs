use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::common::EntryType;

use super::context::CommandError;
use super::registry::CommandEntry;

pub mod alert;
pub mod budget;
pub mod category;
pub mod dashboard;
pub mod settings;
pub mod system;
pub mod template;
pub mod transaction;

pub(crate) fn all_definitions() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(dashboard::definitions());
    commands.extend(transaction::definitions());
    commands.extend(category::definitions());
    commands.extend(budget::definitions());
    commands.extend(template::definitions());
    commands.extend(alert::definitions());
    commands.extend(settings::definitions());
    commands.extend(system::definitions());
    commands
}

/// Positional arguments plus `--key value` / `--key=value` options and bare
/// `--flag` switches.
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs<'a> {
    pub positionals: Vec<&'a str>,
    options: HashMap<&'a str, &'a str>,
    flags: Vec<&'a str>,
}

impl<'a> ParsedArgs<'a> {
    /// `switches` names the options that never take a value.
    pub fn parse(args: &[&'a str], switches: &[&str]) -> Result<Self, CommandError> {
        let mut parsed = ParsedArgs::default();
        let mut iter = args.iter().copied();
        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                parsed.positionals.push(arg);
                continue;
            };
            if let Some((key, value)) = name.split_once('=') {
                parsed.options.insert(key, value);
            } else if switches.iter().any(|switch| *switch == name) {
                parsed.flags.push(name);
            } else {
                let value = iter.next().ok_or_else(|| {
                    CommandError::InvalidArguments(format!("option --{} needs a value", name))
                })?;
                parsed.options.insert(name, value);
            }
        }
        Ok(parsed)
    }

    pub fn positional(&self, index: usize) -> Option<&'a str> {
        self.positionals.get(index).copied()
    }

    pub fn required(&self, index: usize, what: &str) -> Result<&'a str, CommandError> {
        self.positional(index)
            .ok_or_else(|| CommandError::InvalidArguments(format!("missing {}", what)))
    }

    pub fn option(&self, name: &str) -> Option<&'a str> {
        self.options.get(name).copied()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|flag| *flag == name)
    }

    pub fn kind(&self) -> Result<Option<EntryType>, CommandError> {
        self.option("type").map(parse_kind).transpose()
    }

    pub fn amount(&self, name: &str) -> Result<Option<f64>, CommandError> {
        self.option(name).map(parse_amount).transpose()
    }
}

pub(crate) fn parse_kind(input: &str) -> Result<EntryType, CommandError> {
    input.parse().map_err(CommandError::InvalidArguments)
}

pub(crate) fn parse_amount(input: &str) -> Result<f64, CommandError> {
    input
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidArguments(format!("invalid amount `{}`", input)))
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

pub(crate) fn unknown_subcommand(command: &str, sub: Option<&str>, usage: &str) -> CommandError {
    match sub {
        Some(sub) => CommandError::InvalidArguments(format!(
            "unknown subcommand `{} {}`; usage: {}",
            command, sub, usage
        )),
        None => CommandError::InvalidArguments(format!("usage: {}", usage)),
    }
}
