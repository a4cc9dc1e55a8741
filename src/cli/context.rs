//! Shell state, dispatch and the error types shared by command handlers.

use std::{io, path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use dialoguer::{theme::ColorfulTheme, Confirm};
use strsim::levenshtein;
use thiserror::Error;
use tracing::warn;

use crate::config::{Config, ConfigError, ConfigManager};
use crate::core::{Clock, FinanceError, FinanceTracker, SystemClock};
use crate::domain::budget::{Budget, BudgetCategory, BudgetTemplate};
use crate::domain::category::Category;
use crate::domain::common::EntryType;
use crate::storage::{JsonFileBackend, LocalStorage};
use crate::utils::paths;

use super::commands;
use super::forms::{DialoguerInteraction, ValidationError};
use super::output::{self, OutputPreferences};
use super::registry::{CommandEntry, CommandRegistry};

/// Environment variable that switches the shell to line-by-line stdin mode.
pub const SCRIPT_ENV: &str = "FINANCE_TRACKER_CLI_SCRIPT";

const MIN_PREFIX_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

impl CliMode {
    pub fn from_env() -> Self {
        if std::env::var_os(SCRIPT_ENV).is_some() {
            CliMode::Script
        } else {
            CliMode::Interactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Finance(#[from] FinanceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<ValidationError> for CommandError {
    fn from(err: ValidationError) -> Self {
        CommandError::InvalidArguments(err.message)
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub tracker: FinanceTracker,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub theme: ColorfulTheme,
    pub export_dir: PathBuf,
    pub running: bool,
    pub last_command: Option<String>,
}

impl ShellContext {
    /// Opens the on-disk store under the data directory.
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let backend = JsonFileBackend::new(paths::store_dir());
        let storage = LocalStorage::new(backend);
        if !storage.is_available() {
            warn!(
                path = %paths::store_dir().display(),
                "storage unavailable; changes will not be saved"
            );
        }
        Ok(Self::with_storage(
            mode,
            storage,
            Arc::new(SystemClock),
            paths::exports_dir(),
        ))
    }

    pub fn with_storage(
        mode: CliMode,
        storage: LocalStorage,
        clock: Arc<dyn Clock>,
        export_dir: PathBuf,
    ) -> Self {
        let config_manager = ConfigManager::new(storage.clone());
        let config = config_manager.load();
        output::set_preferences(OutputPreferences::from(&config));
        let mut registry = CommandRegistry::new();
        for entry in commands::all_definitions() {
            registry.register(entry);
        }
        Self {
            mode,
            registry,
            tracker: FinanceTracker::open(storage, clock),
            config_manager,
            config,
            theme: ColorfulTheme::default(),
            export_dir,
            running: true,
            last_command: None,
        }
    }

    pub fn prompt(&self) -> String {
        "finance> ".to_string()
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub fn today(&self) -> NaiveDate {
        self.tracker.today()
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    pub fn is_interactive(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub fn interaction(&self) -> DialoguerInteraction<'_> {
        DialoguerInteraction::new(&self.theme)
    }

    /// Saves `config` and applies its output preferences.
    pub fn apply_config(&mut self, config: Config) {
        self.config_manager.save(&config);
        output::set_preferences(OutputPreferences::from(&config));
        self.config = config;
    }

    pub fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match super::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                output::warning(err);
                return Ok(LoopControl::Continue);
            }
        };
        let Some(raw) = tokens.first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.last_command = Some(line.trim().to_string());
        match self.dispatch(&command, raw, &args) {
            Ok(LoopControl::Exit) => {
                self.running = false;
                Ok(LoopControl::Exit)
            }
            other => other,
        }
    }

    pub fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = self.closest_command(input) {
            output::info(format!("Suggestion: `{}`?", best));
        }
    }

    pub fn closest_command(&self, input: &str) -> Option<&'static str> {
        let needle = input.to_lowercase();
        self.registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance)
            .filter(|(distance, _)| *distance <= 3)
            .map(|(_, name)| name)
    }

    pub fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Confirm::with_theme(&self.theme)
            .with_prompt("Exit shell?")
            .default(true)
            .interact()
            .map_err(|err| CliError::Input(err.to_string()))
    }

    /// Asks before destructive actions; script mode proceeds.
    pub fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }

    pub fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::Finance(FinanceError::DefaultCategoryProtected(name)) => {
                output::warning(format!("`{}` is a default category and cannot be deleted.", name));
            }
            other => output::error(other),
        }
        Ok(())
    }

    /// Accepts a full budget id, a unique id prefix, `YYYY-MM` for the active
    /// budget of that month, or `current`.
    pub fn resolve_budget(&self, reference: &str) -> Result<&Budget, CommandError> {
        let budgets = self.tracker.budgets();
        if reference.eq_ignore_ascii_case("current") {
            return self.tracker.active_budget().ok_or_else(|| {
                CommandError::Message("No active budget for the current month.".into())
            });
        }
        if let Some((year, month)) = parse_period(reference) {
            return budgets.budget_for_month(month, year).ok_or_else(|| {
                FinanceError::BudgetNotFound(reference.to_string()).into()
            });
        }
        if let Some(budget) = budgets.get_budget(reference) {
            return Ok(budget);
        }
        unique_by_prefix(budgets.budgets(), reference, |budget| &budget.id)
            .ok_or_else(|| FinanceError::BudgetNotFound(reference.to_string()).into())
    }

    pub fn resolve_budget_id(&self, reference: &str) -> Result<String, CommandError> {
        self.resolve_budget(reference).map(|budget| budget.id.clone())
    }

    /// Matches a line by id, id prefix, or name.
    pub fn resolve_budget_line<'b>(
        &self,
        budget: &'b Budget,
        reference: &str,
    ) -> Result<&'b BudgetCategory, CommandError> {
        budget
            .category(reference)
            .or_else(|| {
                budget
                    .categories
                    .iter()
                    .find(|line| line.name.eq_ignore_ascii_case(reference))
            })
            .or_else(|| unique_by_prefix(&budget.categories, reference, |line| &line.id))
            .ok_or_else(|| FinanceError::CategoryNotFound(reference.to_string()).into())
    }

    /// Matches a category by id, id prefix, or name. Names present under both
    /// types need `kind` to disambiguate.
    pub fn resolve_category(
        &self,
        reference: &str,
        kind: Option<EntryType>,
    ) -> Result<&Category, CommandError> {
        let categories = self.tracker.categories();
        if let Some(category) = categories.get(reference) {
            return Ok(category);
        }
        let by_name: Vec<&Category> = EntryType::ALL
            .into_iter()
            .filter(|candidate| kind.map_or(true, |kind| kind == *candidate))
            .filter_map(|candidate| categories.find_by_name(reference, candidate))
            .collect();
        match by_name.as_slice() {
            [single] => return Ok(*single),
            [_, _, ..] => {
                return Err(CommandError::InvalidArguments(format!(
                    "`{}` exists as both income and expense; add --type",
                    reference
                )))
            }
            [] => {}
        }
        unique_by_prefix(categories.all(), reference, |category| &category.id)
            .ok_or_else(|| FinanceError::CategoryNotFound(reference.to_string()).into())
    }

    pub fn resolve_template(&self, reference: &str) -> Result<&BudgetTemplate, CommandError> {
        let budgets = self.tracker.budgets();
        budgets
            .get_template(reference)
            .or_else(|| {
                budgets
                    .templates()
                    .iter()
                    .find(|template| template.name.eq_ignore_ascii_case(reference))
            })
            .or_else(|| unique_by_prefix(budgets.templates(), reference, |template| &template.id))
            .ok_or_else(|| FinanceError::TemplateNotFound(reference.to_string()).into())
    }

    pub fn resolve_alert_id(&self, reference: &str) -> Result<String, CommandError> {
        let alerts = self.tracker.budgets().alerts();
        alerts
            .iter()
            .find(|alert| alert.id == reference)
            .or_else(|| unique_by_prefix(alerts, reference, |alert| &alert.id))
            .map(|alert| alert.id.clone())
            .ok_or_else(|| FinanceError::AlertNotFound(reference.to_string()).into())
    }
}

/// `YYYY-MM` as (year, month).
pub fn parse_period(input: &str) -> Option<(i32, u32)> {
    let (year, month) = input.split_once('-')?;
    if year.len() != 4 {
        return None;
    }
    let year = year.parse().ok()?;
    let month = month.parse().ok().filter(|month| (1..=12).contains(month))?;
    Some((year, month))
}

fn unique_by_prefix<'a, T>(
    items: &'a [T],
    prefix: &str,
    id: impl Fn(&T) -> &String,
) -> Option<&'a T> {
    if prefix.len() < MIN_PREFIX_LEN {
        return None;
    }
    let mut matches = items.iter().filter(|item| id(item).starts_with(prefix));
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

#[cfg(test)]
pub(crate) fn test_context() -> (ShellContext, tempfile::TempDir) {
    use crate::core::FixedClock;
    use crate::storage::MemoryBackend;
    use chrono::{TimeZone, Utc};

    let dir = tempfile::tempdir().expect("tempdir");
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 11, 20, 8, 0, 0).unwrap(),
    ));
    let context = ShellContext::with_storage(
        CliMode::Script,
        LocalStorage::new(MemoryBackend::new()),
        clock,
        dir.path().to_path_buf(),
    );
    (context, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_commands_suggest_the_closest_name() {
        let (context, _dir) = test_context();
        assert_eq!(context.closest_command("dashbord"), Some("dashboard"));
        assert_eq!(context.closest_command("zzzzzzzzzz"), None);
    }

    #[test]
    fn exit_stops_the_loop() {
        let (mut context, _dir) = test_context();
        assert_eq!(context.process_line("   ").unwrap(), LoopControl::Continue);
        assert_eq!(context.process_line("exit").unwrap(), LoopControl::Exit);
        assert!(!context.running);
        assert_eq!(context.last_command.as_deref(), Some("exit"));
    }

    #[test]
    fn periods_parse_as_year_and_month() {
        assert_eq!(parse_period("2024-11"), Some((2024, 11)));
        assert_eq!(parse_period("2024-13"), None);
        assert_eq!(parse_period("24-11"), None);
    }

    #[test]
    fn categories_resolve_by_name_or_id() {
        let (context, _dir) = test_context();
        let food = context
            .resolve_category("alimentación", None)
            .unwrap()
            .id
            .clone();
        assert_eq!(food, "expense-default-1");
        assert_eq!(
            context.resolve_category(&food, None).unwrap().name,
            "Alimentación"
        );
        assert!(context.resolve_category("Nada", None).is_err());
    }
}
