//! Prompt-driven forms used when an interactive command is run without
//! arguments.
//!
//! A form is a [`FormFlow`]: an ordered list of field descriptors plus a
//! `commit` step that turns the collected strings into a domain value. The
//! [`FormEngine`] walks the fields through a [`FormInteraction`], which is
//! backed by `dialoguer` in the shell and by a scripted queue in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::cli::output;
use crate::domain::budget::{BudgetCategoryInput, CreateBudgetDto};
use crate::domain::category::NewCategory;
use crate::domain::common::EntryType;
use crate::domain::transaction::{NewTransaction, Transaction};

#[derive(Debug, Clone, PartialEq)]
pub enum FormResult<T> {
    Completed(T),
    Cancelled,
}

/// How a single prompt was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Value(String),
    /// Keep the default or current value.
    Keep,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    Integer,
    Date,
    Choice(Vec<String>),
}

type ValidatorCallback = dyn Fn(&str) -> Result<String, String> + Send + Sync;

/// Built-in validation helpers. Each returns the normalized value.
#[derive(Clone)]
pub enum Validator {
    None,
    NonEmpty,
    PositiveNumber,
    NonNegativeNumber,
    Date,
    Month,
    Year,
    OneOf(Vec<String>),
    Custom(Arc<ValidatorCallback>),
}

impl Validator {
    pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
        let trimmed = input.trim();
        match self {
            Validator::None => Ok(trimmed.to_string()),
            Validator::NonEmpty => {
                if trimmed.is_empty() {
                    Err(ValidationError::new("Value cannot be empty"))
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Validator::PositiveNumber => parse_number(trimmed).and_then(|value| {
                if value > 0.0 {
                    Ok(value.to_string())
                } else {
                    Err(ValidationError::new("Value must be greater than zero"))
                }
            }),
            Validator::NonNegativeNumber => parse_number(trimmed).and_then(|value| {
                if value >= 0.0 {
                    Ok(value.to_string())
                } else {
                    Err(ValidationError::new("Amount must be zero or positive"))
                }
            }),
            Validator::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|date| date.to_string())
                .map_err(|_| ValidationError::new("Use YYYY-MM-DD format")),
            Validator::Month => trimmed
                .parse::<u32>()
                .ok()
                .filter(|month| (1..=12).contains(month))
                .map(|month| month.to_string())
                .ok_or_else(|| ValidationError::new("Enter a month between 1 and 12")),
            Validator::Year => trimmed
                .parse::<i32>()
                .ok()
                .filter(|year| (1970..=9999).contains(year))
                .map(|year| year.to_string())
                .ok_or_else(|| ValidationError::new("Enter a four-digit year")),
            Validator::OneOf(options) => options
                .iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
                .cloned()
                .ok_or_else(|| {
                    ValidationError::new(format!("Value must be one of: {}", options.join(", ")))
                }),
            Validator::Custom(func) => func(trimmed).map_err(ValidationError::new),
        }
    }
}

fn parse_number(input: &str) -> Result<f64, ValidationError> {
    input
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::new("Enter a numeric value"))
}

#[derive(Clone)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help: Option<String>,
    pub validator: Validator,
}

impl FieldDescriptor {
    pub fn new(key: &'static str, label: &'static str, kind: FieldKind, validator: Validator) -> Self {
        Self {
            key,
            label,
            kind,
            required: true,
            help: None,
            validator,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

pub struct FormDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

/// What an interaction needs to render one field.
pub struct PromptContext<'a> {
    pub descriptor: &'a FieldDescriptor,
    pub default: Option<&'a str>,
    pub index: usize,
    pub total: usize,
}

pub trait FormInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse;

    /// Asks a yes/no question; `false` on any failure.
    fn confirm(&mut self, prompt: &str, summary: &[String]) -> bool;

    fn report_invalid(&mut self, field: &FieldDescriptor, error: &ValidationError) {
        output::warning(format!("{}: {}", field.label, error));
    }
}

pub trait FormFlow {
    type Output;

    fn descriptor(&self) -> &FormDescriptor;

    fn defaults(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::new()
    }

    fn commit(&self, values: &BTreeMap<&'static str, String>) -> Result<Self::Output, ValidationError>;
}

pub struct FormEngine<'a, F: FormFlow> {
    flow: &'a F,
}

impl<'a, F: FormFlow> FormEngine<'a, F> {
    pub fn new(flow: &'a F) -> Self {
        Self { flow }
    }

    pub fn run<I: FormInteraction>(
        &self,
        interaction: &mut I,
    ) -> Result<FormResult<F::Output>, ValidationError> {
        let descriptor = self.flow.descriptor();
        let defaults = self.flow.defaults();
        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();
        let total = descriptor.fields.len();

        let mut index = 0;
        while index < total {
            let field = &descriptor.fields[index];
            let default = defaults.get(field.key).map(String::as_str);
            let context = PromptContext {
                descriptor: field,
                default,
                index,
                total,
            };
            let raw = match interaction.prompt_field(&context) {
                PromptResponse::Cancel => return Ok(FormResult::Cancelled),
                PromptResponse::Keep => match default {
                    Some(value) => value.to_string(),
                    None if field.required => {
                        interaction.report_invalid(field, &ValidationError::new("A value is required"));
                        continue;
                    }
                    None => String::new(),
                },
                PromptResponse::Value(value) => value,
            };
            if raw.trim().is_empty() && !field.required {
                values.insert(field.key, String::new());
                index += 1;
                continue;
            }
            match field.validator.validate(&raw) {
                Ok(value) => {
                    values.insert(field.key, value);
                    index += 1;
                }
                Err(err) => interaction.report_invalid(field, &err),
            }
        }

        let summary: Vec<String> = descriptor
            .fields
            .iter()
            .map(|field| {
                let value = values.get(field.key).map(String::as_str).unwrap_or("");
                format!("  {}: {}", field.label, if value.is_empty() { "-" } else { value })
            })
            .collect();
        if !interaction.confirm(&format!("Save {}?", descriptor.name), &summary) {
            return Ok(FormResult::Cancelled);
        }
        self.flow.commit(&values).map(FormResult::Completed)
    }
}

fn optional(values: &BTreeMap<&'static str, String>, key: &str) -> Option<String> {
    values.get(key).filter(|value| !value.is_empty()).cloned()
}

fn required<'v>(values: &'v BTreeMap<&'static str, String>, key: &str) -> Result<&'v str, ValidationError> {
    values
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ValidationError::new(format!("missing value for `{}`", key)))
}

fn parse_field<T: std::str::FromStr>(
    values: &BTreeMap<&'static str, String>,
    key: &str,
) -> Result<T, ValidationError> {
    required(values, key)?
        .parse::<T>()
        .map_err(|_| ValidationError::new(format!("invalid value for `{}`", key)))
}

fn type_choices() -> Vec<String> {
    vec!["expense".into(), "income".into()]
}

/// Records or edits a transaction.
pub struct TransactionForm {
    descriptor: FormDescriptor,
    defaults: BTreeMap<&'static str, String>,
}

impl TransactionForm {
    pub fn new(category_names: &[String], today: NaiveDate, initial: Option<&Transaction>) -> Self {
        let mut category = FieldDescriptor::new("category", "Category", FieldKind::Text, Validator::NonEmpty);
        if !category_names.is_empty() {
            category = category.with_help(format!("Known categories: {}", category_names.join(", ")));
        }
        let descriptor = FormDescriptor {
            name: "transaction",
            fields: vec![
                FieldDescriptor::new(
                    "type",
                    "Type",
                    FieldKind::Choice(type_choices()),
                    Validator::OneOf(type_choices()),
                ),
                FieldDescriptor::new("description", "Description", FieldKind::Text, Validator::NonEmpty),
                FieldDescriptor::new("amount", "Amount", FieldKind::Decimal, Validator::PositiveNumber),
                category,
                FieldDescriptor::new("date", "Date", FieldKind::Date, Validator::Date),
            ],
        };
        let mut defaults = BTreeMap::new();
        defaults.insert("date", today.to_string());
        defaults.insert("type", EntryType::Expense.as_str().to_string());
        if let Some(txn) = initial {
            defaults.insert("type", txn.kind.as_str().to_string());
            defaults.insert("description", txn.description.clone());
            defaults.insert("amount", txn.magnitude().to_string());
            defaults.insert("category", txn.category.clone());
            defaults.insert("date", txn.date.to_string());
        }
        Self { descriptor, defaults }
    }
}

impl FormFlow for TransactionForm {
    type Output = NewTransaction;

    fn descriptor(&self) -> &FormDescriptor {
        &self.descriptor
    }

    fn defaults(&self) -> BTreeMap<&'static str, String> {
        self.defaults.clone()
    }

    fn commit(&self, values: &BTreeMap<&'static str, String>) -> Result<NewTransaction, ValidationError> {
        let kind: EntryType = required(values, "type")?
            .parse()
            .map_err(ValidationError::new)?;
        let date = NaiveDate::parse_from_str(required(values, "date")?, "%Y-%m-%d")
            .map_err(|_| ValidationError::new("Use YYYY-MM-DD format"))?;
        Ok(NewTransaction::new(
            required(values, "description")?,
            parse_field(values, "amount")?,
            required(values, "category")?,
            date,
            kind,
        ))
    }
}

pub struct CategoryForm {
    descriptor: FormDescriptor,
}

impl CategoryForm {
    pub fn new() -> Self {
        Self {
            descriptor: FormDescriptor {
                name: "category",
                fields: vec![
                    FieldDescriptor::new("name", "Name", FieldKind::Text, Validator::NonEmpty),
                    FieldDescriptor::new(
                        "type",
                        "Type",
                        FieldKind::Choice(type_choices()),
                        Validator::OneOf(type_choices()),
                    ),
                    FieldDescriptor::new("description", "Description", FieldKind::Text, Validator::None)
                        .optional(),
                    FieldDescriptor::new("icon", "Icon", FieldKind::Text, Validator::None).optional(),
                    FieldDescriptor::new("color", "Color", FieldKind::Text, Validator::Custom(Arc::new(
                        |input| {
                            let hex = input.strip_prefix('#').unwrap_or(input);
                            if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                                Ok(format!("#{}", hex.to_ascii_uppercase()))
                            } else {
                                Err("Use a hex color such as #FF6B6B".into())
                            }
                        },
                    )))
                    .optional()
                    .with_help("Leave empty to pick one from the palette."),
                ],
            },
        }
    }
}

impl Default for CategoryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FormFlow for CategoryForm {
    type Output = NewCategory;

    fn descriptor(&self) -> &FormDescriptor {
        &self.descriptor
    }

    fn commit(&self, values: &BTreeMap<&'static str, String>) -> Result<NewCategory, ValidationError> {
        let kind: EntryType = required(values, "type")?
            .parse()
            .map_err(ValidationError::new)?;
        let mut category = NewCategory::new(required(values, "name")?, kind);
        category.description = optional(values, "description");
        category.icon = optional(values, "icon");
        category.color = optional(values, "color");
        Ok(category)
    }
}

/// One category line inside the budget form.
pub struct BudgetLineForm {
    descriptor: FormDescriptor,
}

impl BudgetLineForm {
    pub fn new() -> Self {
        Self {
            descriptor: FormDescriptor {
                name: "budget line",
                fields: vec![
                    FieldDescriptor::new("name", "Category", FieldKind::Text, Validator::NonEmpty),
                    FieldDescriptor::new(
                        "type",
                        "Type",
                        FieldKind::Choice(type_choices()),
                        Validator::OneOf(type_choices()),
                    ),
                    FieldDescriptor::new(
                        "amount",
                        "Budgeted amount",
                        FieldKind::Decimal,
                        Validator::NonNegativeNumber,
                    ),
                ],
            },
        }
    }
}

impl Default for BudgetLineForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FormFlow for BudgetLineForm {
    type Output = BudgetCategoryInput;

    fn descriptor(&self) -> &FormDescriptor {
        &self.descriptor
    }

    fn defaults(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([("type", EntryType::Expense.as_str().to_string())])
    }

    fn commit(
        &self,
        values: &BTreeMap<&'static str, String>,
    ) -> Result<BudgetCategoryInput, ValidationError> {
        let kind: EntryType = required(values, "type")?
            .parse()
            .map_err(ValidationError::new)?;
        Ok(BudgetCategoryInput::new(
            required(values, "name")?,
            kind,
            parse_field(values, "amount")?,
        ))
    }
}

struct BudgetHeaderForm {
    descriptor: FormDescriptor,
    today: NaiveDate,
}

impl FormFlow for BudgetHeaderForm {
    type Output = CreateBudgetDto;

    fn descriptor(&self) -> &FormDescriptor {
        &self.descriptor
    }

    fn defaults(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("month", self.today.month().to_string()),
            ("year", self.today.year().to_string()),
        ])
    }

    fn commit(&self, values: &BTreeMap<&'static str, String>) -> Result<CreateBudgetDto, ValidationError> {
        let mut dto = CreateBudgetDto::new(parse_field(values, "month")?, parse_field(values, "year")?);
        dto.name = optional(values, "name");
        Ok(dto)
    }
}

struct LineIndexForm {
    descriptor: FormDescriptor,
}

impl FormFlow for LineIndexForm {
    type Output = usize;

    fn descriptor(&self) -> &FormDescriptor {
        &self.descriptor
    }

    fn commit(&self, values: &BTreeMap<&'static str, String>) -> Result<usize, ValidationError> {
        parse_field::<usize>(values, "index").map(|index| index - 1)
    }
}

/// Budget creation: a header form followed by a growable list of category
/// lines that can be appended to or removed by position before saving.
pub struct BudgetWizard {
    header: BudgetHeaderForm,
    line: BudgetLineForm,
}

impl BudgetWizard {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            header: BudgetHeaderForm {
                descriptor: FormDescriptor {
                    name: "budget period",
                    fields: vec![
                        FieldDescriptor::new("name", "Name", FieldKind::Text, Validator::None)
                            .optional()
                            .with_help("Leave empty for \"Budget <Month> <Year>\"."),
                        FieldDescriptor::new("month", "Month", FieldKind::Integer, Validator::Month),
                        FieldDescriptor::new("year", "Year", FieldKind::Integer, Validator::Year),
                    ],
                },
                today,
            },
            line: BudgetLineForm::new(),
        }
    }

    pub fn run<I: FormInteraction>(
        &self,
        interaction: &mut I,
    ) -> Result<FormResult<CreateBudgetDto>, ValidationError> {
        let mut dto = match FormEngine::new(&self.header).run(interaction)? {
            FormResult::Completed(dto) => dto,
            FormResult::Cancelled => return Ok(FormResult::Cancelled),
        };

        while interaction.confirm("Add a category line?", &entry_lines(&dto)) {
            if let FormResult::Completed(entry) = FormEngine::new(&self.line).run(interaction)? {
                dto = dto.with_category(entry);
            }
        }

        while !dto.categories.is_empty() && interaction.confirm("Remove a line?", &entry_lines(&dto)) {
            let count = dto.categories.len();
            let picker = LineIndexForm {
                descriptor: FormDescriptor {
                    name: "removal",
                    fields: vec![FieldDescriptor::new(
                        "index",
                        "Line number",
                        FieldKind::Integer,
                        Validator::Custom(Arc::new(move |input| {
                            input
                                .parse::<usize>()
                                .ok()
                                .filter(|index| (1..=count).contains(index))
                                .map(|index| index.to_string())
                                .ok_or_else(|| format!("Enter a line number between 1 and {}", count))
                        })),
                    )],
                },
            };
            if let FormResult::Completed(index) = FormEngine::new(&picker).run(interaction)? {
                dto.remove_category(index);
            }
        }

        Ok(FormResult::Completed(dto))
    }
}

fn entry_lines(dto: &CreateBudgetDto) -> Vec<String> {
    dto.categories
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            format!(
                "  {}. {} ({}) {:.2}",
                idx + 1,
                entry.name,
                entry.kind.as_str(),
                entry.budgeted_amount
            )
        })
        .collect()
}

/// Terminal-backed interaction built on `dialoguer`.
pub struct DialoguerInteraction<'t> {
    theme: &'t ColorfulTheme,
}

impl<'t> DialoguerInteraction<'t> {
    pub fn new(theme: &'t ColorfulTheme) -> Self {
        Self { theme }
    }
}

impl FormInteraction for DialoguerInteraction<'_> {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse {
        let field = context.descriptor;
        if let Some(help) = &field.help {
            output::hint(help);
        }
        let label = format!("[{}/{}] {}", context.index + 1, context.total, field.label);
        if let FieldKind::Choice(options) = &field.kind {
            let default = context
                .default
                .and_then(|value| options.iter().position(|option| option == value))
                .unwrap_or(0);
            return match Select::with_theme(self.theme)
                .with_prompt(label)
                .items(options)
                .default(default)
                .interact_opt()
            {
                Ok(Some(index)) => PromptResponse::Value(options[index].clone()),
                _ => PromptResponse::Cancel,
            };
        }
        let mut input = Input::<String>::with_theme(self.theme)
            .with_prompt(label)
            .allow_empty(true);
        if let Some(default) = context.default {
            input = input.with_initial_text(default);
        }
        match input.interact_text() {
            Ok(value) if value.trim().is_empty() => PromptResponse::Keep,
            Ok(value) => PromptResponse::Value(value),
            Err(_) => PromptResponse::Cancel,
        }
    }

    fn confirm(&mut self, prompt: &str, summary: &[String]) -> bool {
        for line in summary {
            output::info(line);
        }
        Confirm::with_theme(self.theme)
            .with_prompt(prompt)
            .default(true)
            .interact()
            .unwrap_or(false)
    }
}
