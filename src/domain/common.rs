//! Shared traits and enums for finance records.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Adds amounts starting from `0.0`; an empty input totals `0.0`, never `-0.0`.
pub fn total_of(amounts: impl IntoIterator<Item = f64>) -> f64 {
    amounts.into_iter().fold(0.0, |acc, amount| acc + amount)
}

/// Direction of money flow, shared by transactions, categories and budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub const ALL: [EntryType; 2] = [EntryType::Income, EntryType::Expense];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Income => "income",
            EntryType::Expense => "expense",
        }
    }

    /// Icon used when a record does not carry its own.
    pub fn default_icon(self) -> &'static str {
        match self {
            EntryType::Income => "💰",
            EntryType::Expense => "💸",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryType::Income => "Income",
            EntryType::Expense => "Expense",
        };
        f.write_str(label)
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" | "in" | "i" => Ok(EntryType::Income),
            "expense" | "out" | "e" => Ok(EntryType::Expense),
            other => Err(format!(
                "unknown type `{}` (expected income or expense)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&EntryType::Expense).unwrap();
        assert_eq!(json, "\"expense\"");
        let parsed: EntryType = serde_json::from_str("\"income\"").unwrap();
        assert_eq!(parsed, EntryType::Income);
    }

    #[test]
    fn parses_user_input() {
        assert_eq!("Income".parse::<EntryType>(), Ok(EntryType::Income));
        assert_eq!(" e ".parse::<EntryType>(), Ok(EntryType::Expense));
        assert!("transfer".parse::<EntryType>().is_err());
    }

    #[test]
    fn empty_totals_are_positive_zero() {
        let empty = total_of(std::iter::empty());
        assert_eq!(empty, 0.0);
        assert!(empty.is_sign_positive());
        assert_eq!(total_of([12.5, 7.5]), 20.0);
    }
}
