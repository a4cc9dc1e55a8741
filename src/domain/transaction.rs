//! Domain types for recorded income and expense transactions.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::common::{Displayable, EntryType, NamedEntity};

/// A single recorded movement of money.
///
/// `amount` is signed: expenses are stored negative, income positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EntryType,
}

impl Transaction {
    pub fn from_new(id: i64, new: NewTransaction) -> Self {
        let new = new.normalized();
        Self {
            id,
            description: new.description,
            amount: new.amount,
            category: new.category,
            date: new.date,
            kind: new.kind,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.kind == EntryType::Expense
    }

    /// Unsigned size of the movement.
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    pub fn falls_in(&self, month: u32, year: i32) -> bool {
        self.date.month() == month && self.date.year() == year
    }
}

impl NamedEntity for Transaction {
    fn name(&self) -> &str {
        &self.description
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!("{} {} ({})", self.date, self.description, self.category)
    }
}

/// User-submitted transaction data, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EntryType,
}

impl NewTransaction {
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
        kind: EntryType,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            category: category.into(),
            date,
            kind,
        }
    }

    pub fn expense(
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self::new(description, amount, category, date, EntryType::Expense)
    }

    pub fn income(
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self::new(description, amount, category, date, EntryType::Income)
    }

    /// Trims text fields and forces the amount sign to match the type.
    pub fn normalized(mut self) -> Self {
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();
        self.amount = match self.kind {
            EntryType::Expense => -self.amount.abs(),
            EntryType::Income => self.amount.abs(),
        };
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("description must not be empty".into());
        }
        if self.category.trim().is_empty() {
            return Err("category must not be empty".into());
        }
        if !self.amount.is_finite() || self.amount == 0.0 {
            return Err("amount must be a non-zero number".into());
        }
        Ok(())
    }
}

impl From<&Transaction> for NewTransaction {
    fn from(txn: &Transaction) -> Self {
        Self {
            description: txn.description.clone(),
            amount: txn.amount,
            category: txn.category.clone(),
            date: txn.date,
            kind: txn.kind,
        }
    }
}

/// List-view filter: every populated field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<EntryType>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if txn.kind != kind {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &txn.category != category {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let needle = search.to_lowercase();
                return txn.description.to_lowercase().contains(&needle)
                    || txn.category.to_lowercase().contains(&needle);
            }
        }
        true
    }
}

/// Field-by-field shape check for one imported element.
pub fn validate_import_value(index: usize, value: &Value) -> Result<(), String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("element {} is not an object", index))?;

    let check = |field: &str, ok: fn(&Value) -> bool, expected: &str| {
        match object.get(field) {
            Some(value) if ok(value) => Ok(()),
            Some(_) => Err(format!(
                "element {}: field `{}` must be {}",
                index, field, expected
            )),
            None => Err(format!("element {}: missing field `{}`", index, field)),
        }
    };

    check("id", |v| v.is_i64() || v.is_u64(), "an integer")?;
    check("description", Value::is_string, "a string")?;
    check("amount", Value::is_number, "a number")?;
    check("category", Value::is_string, "a string")?;
    check(
        "date",
        |v| {
            v.as_str()
                .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok())
                .unwrap_or(false)
        },
        "an ISO date (YYYY-MM-DD)",
    )?;
    check(
        "type",
        |v| matches!(v.as_str(), Some("income") | Some("expense")),
        "`income` or `expense`",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
    }

    #[test]
    fn normalization_signs_amount_by_type() {
        let expense =
            NewTransaction::expense(" Cena ", 15000.0, "Alimentación", date(10)).normalized();
        assert_eq!(expense.amount, -15000.0);
        assert_eq!(expense.description, "Cena");

        let income =
            NewTransaction::income("Salario", -150000.0, "Salario", date(1)).normalized();
        assert_eq!(income.amount, 150000.0);
    }

    #[test]
    fn serializes_with_original_field_names() {
        let txn = Transaction::from_new(
            7,
            NewTransaction::expense("Uber", 2500.0, "Transporte", date(12)),
        );
        let value = serde_json::to_value(&txn).unwrap();
        assert_eq!(value["type"], "expense");
        assert_eq!(value["date"], "2024-11-12");
        assert_eq!(value["amount"], -2500.0);
    }

    #[test]
    fn filter_combines_type_category_and_search() {
        let txn = Transaction::from_new(
            1,
            NewTransaction::expense("Netflix Premium", 3500.0, "Entretenimiento", date(5)),
        );
        let mut filter = TransactionFilter {
            kind: Some(EntryType::Expense),
            search: Some("netflix".into()),
            ..Default::default()
        };
        assert!(filter.matches(&txn));
        filter.category = Some("Servicios".into());
        assert!(!filter.matches(&txn));
        filter.category = None;
        filter.search = Some("entre".into());
        assert!(filter.matches(&txn));
    }

    #[test]
    fn import_validation_reports_the_offending_field() {
        let good = json!({
            "id": 1, "description": "x", "amount": -3.5,
            "category": "c", "date": "2024-11-01", "type": "expense"
        });
        assert!(validate_import_value(0, &good).is_ok());

        let mut missing = good.clone();
        missing.as_object_mut().unwrap().remove("category");
        let err = validate_import_value(2, &missing).unwrap_err();
        assert!(err.contains("category"), "{err}");

        let mut wrong = good.clone();
        wrong["amount"] = json!("12");
        assert!(validate_import_value(0, &wrong).is_err());

        let mut kind = good;
        kind["type"] = json!("transfer");
        assert!(validate_import_value(0, &kind).is_err());
    }
}
