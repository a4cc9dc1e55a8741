//! Domain types representing income and expense categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::common::{Displayable, EntryType, NamedEntity};

/// Classifies transactions by name; referenced from transactions and budgets
/// by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl NamedEntity for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Category {
    fn display_label(&self) -> String {
        match &self.icon {
            Some(icon) => format!("{} {} ({})", icon, self.name, self.kind),
            None => format!("{} ({})", self.name, self.kind),
        }
    }
}

/// Fields supplied when creating a custom category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub kind: EntryType,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, kind: EntryType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            color: None,
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Partial edit; `None` leaves the field unchanged. The default flag and
/// creation time are not editable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub kind: Option<EntryType>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Aggregated activity for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub total_amount: f64,
    pub transaction_count: usize,
    /// Share of the total for the category's type, 0-100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryStats {
    pub income_categories: Vec<CategorySummary>,
    pub expense_categories: Vec<CategorySummary>,
    pub total_income: f64,
    pub total_expenses: f64,
}

/// Seed data for a built-in category.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

const fn seed(
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    color: &'static str,
) -> DefaultCategory {
    DefaultCategory {
        name,
        description,
        icon,
        color,
    }
}

pub const DEFAULT_INCOME_CATEGORIES: [DefaultCategory; 5] = [
    seed("Salario", "Ingresos por trabajo", "💼", "#10b981"),
    seed("Freelance", "Trabajos independientes", "💻", "#059669"),
    seed("Inversiones", "Rendimientos de inversiones", "📈", "#047857"),
    seed("Renta", "Ingresos por alquiler", "🏠", "#065f46"),
    seed("Otros Ingresos", "Otros tipos de ingresos", "💰", "#064e3b"),
];

pub const DEFAULT_EXPENSE_CATEGORIES: [DefaultCategory; 9] = [
    seed("Alimentación", "Comida y restaurantes", "🍽️", "#ef4444"),
    seed("Transporte", "Combustible, transporte público", "🚗", "#dc2626"),
    seed("Vivienda", "Alquiler, hipoteca, servicios", "🏡", "#b91c1c"),
    seed("Salud", "Médicos, medicamentos", "⚕️", "#991b1b"),
    seed("Entretenimiento", "Ocio, deportes, hobbies", "🎭", "#7f1d1d"),
    seed("Compras", "Ropa, tecnología, otros", "🛍️", "#fbbf24"),
    seed("Educación", "Cursos, libros, materiales", "📚", "#f59e0b"),
    seed("Servicios", "Internet, teléfono, suscripciones", "📱", "#d97706"),
    seed("Otros Gastos", "Gastos varios", "💸", "#92400e"),
];

/// Builds the full default category list, stamped with `now`.
pub fn default_categories(now: DateTime<Utc>) -> Vec<Category> {
    let build = |kind: EntryType, prefix: &str, seeds: &[DefaultCategory]| {
        seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| Category {
                id: format!("{}-default-{}", prefix, index + 1),
                name: seed.name.to_string(),
                kind,
                description: Some(seed.description.to_string()),
                color: Some(seed.color.to_string()),
                icon: Some(seed.icon.to_string()),
                is_default: true,
                created_at: now,
                updated_at: now,
            })
            .collect::<Vec<_>>()
    };

    let mut categories = build(EntryType::Income, "income", &DEFAULT_INCOME_CATEGORIES);
    categories.extend(build(
        EntryType::Expense,
        "expense",
        &DEFAULT_EXPENSE_CATEGORIES,
    ));
    categories
}
