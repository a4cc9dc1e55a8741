use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::errors::FinanceError;
use crate::core::time::Clock;
use crate::domain::budget::palette_color;
use crate::domain::category::{
    default_categories, Category, CategoryStats, CategorySummary, CategoryUpdate, NewCategory,
};
use crate::domain::common::{total_of, EntryType};
use crate::domain::transaction::Transaction;
use crate::storage::{keys, LocalStorage};

use super::ServiceResult;

/// Income and expense categories, seeded with defaults on first run.
pub struct CategoryService {
    storage: LocalStorage,
    clock: Arc<dyn Clock>,
    categories: Vec<Category>,
}

impl CategoryService {
    pub fn open(storage: LocalStorage, clock: Arc<dyn Clock>) -> Self {
        let mut service = Self {
            storage,
            clock,
            categories: Vec::new(),
        };
        match service.storage.get::<Vec<Category>>(keys::CATEGORIES) {
            Some(stored) => service.categories = stored,
            None => service.seed_defaults(),
        }
        service
    }

    fn seed_defaults(&mut self) {
        self.categories = default_categories(self.clock.now());
        self.persist();
        info!(count = self.categories.len(), "default categories seeded");
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn by_type(&self, kind: EntryType) -> Vec<&Category> {
        self.categories.iter().filter(|cat| cat.kind == kind).collect()
    }

    pub fn income_categories(&self) -> Vec<&Category> {
        self.by_type(EntryType::Income)
    }

    pub fn expense_categories(&self) -> Vec<&Category> {
        self.by_type(EntryType::Expense)
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.id == id)
    }

    /// Case-insensitive lookup within one type.
    pub fn find_by_name(&self, name: &str, kind: EntryType) -> Option<&Category> {
        let needle = name.trim().to_lowercase();
        self.categories
            .iter()
            .find(|cat| cat.kind == kind && cat.name.to_lowercase() == needle)
    }

    pub fn create(&mut self, new: NewCategory) -> ServiceResult<Category> {
        let name = Self::validate_name(&self.categories, None, &new.name, new.kind)?;
        let now = self.clock.now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name,
            kind: new.kind,
            description: new.description,
            color: new
                .color
                .or_else(|| Some(palette_color(self.categories.len()).to_string())),
            icon: new.icon.or_else(|| Some(new.kind.default_icon().to_string())),
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        self.categories.push(category.clone());
        self.persist();
        info!(id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn update(&mut self, id: &str, changes: CategoryUpdate) -> ServiceResult<Category> {
        let current = self
            .get(id)
            .ok_or_else(|| FinanceError::CategoryNotFound(id.to_string()))?;
        let kind = changes.kind.unwrap_or(current.kind);
        let candidate = changes.name.clone().unwrap_or_else(|| current.name.clone());
        let name = Self::validate_name(&self.categories, Some(id), &candidate, kind)?;
        let now = self.clock.now();

        let category = self
            .categories
            .iter_mut()
            .find(|cat| cat.id == id)
            .ok_or_else(|| FinanceError::CategoryNotFound(id.to_string()))?;
        category.name = name;
        category.kind = kind;
        if let Some(description) = changes.description {
            category.description = Some(description);
        }
        if let Some(color) = changes.color {
            category.color = Some(color);
        }
        if let Some(icon) = changes.icon {
            category.icon = Some(icon);
        }
        category.updated_at = now;
        let updated = category.clone();
        self.persist();
        info!(id, "category updated");
        Ok(updated)
    }

    /// Removes a custom category. Defaults are protected.
    pub fn delete(&mut self, id: &str) -> ServiceResult<Category> {
        let index = self
            .categories
            .iter()
            .position(|cat| cat.id == id)
            .ok_or_else(|| FinanceError::CategoryNotFound(id.to_string()))?;
        if self.categories[index].is_default {
            warn!(id, "refusing to delete default category");
            return Err(FinanceError::DefaultCategoryProtected(
                self.categories[index].name.clone(),
            ));
        }
        let removed = self.categories.remove(index);
        self.persist();
        info!(id, "category deleted");
        Ok(removed)
    }

    /// Drops every custom category and restores the seeded defaults.
    pub fn reset_to_default(&mut self) {
        self.storage.remove(keys::CATEGORIES);
        self.seed_defaults();
    }

    /// Whether any transaction references the category by name and type.
    pub fn is_category_in_use(&self, id: &str, transactions: &[Transaction]) -> bool {
        self.get(id).is_some_and(|cat| {
            transactions
                .iter()
                .any(|txn| txn.kind == cat.kind && txn.category == cat.name)
        })
    }

    pub fn category_stats(&self, transactions: &[Transaction]) -> CategoryStats {
        let total = |kind: EntryType| -> f64 {
            total_of(
                transactions
                    .iter()
                    .filter(|txn| txn.kind == kind)
                    .map(Transaction::magnitude),
            )
        };
        let total_income = total(EntryType::Income);
        let total_expenses = total(EntryType::Expense);

        let summarize = |kind: EntryType, type_total: f64| {
            let mut summaries: Vec<CategorySummary> = self
                .by_type(kind)
                .into_iter()
                .filter_map(|category| {
                    let matching: Vec<&Transaction> = transactions
                        .iter()
                        .filter(|txn| txn.kind == kind && txn.category == category.name)
                        .collect();
                    if matching.is_empty() {
                        return None;
                    }
                    let total_amount = total_of(matching.iter().map(|txn| txn.magnitude()));
                    Some(CategorySummary {
                        category: category.clone(),
                        total_amount,
                        transaction_count: matching.len(),
                        percentage: if type_total > 0.0 {
                            total_amount / type_total * 100.0
                        } else {
                            0.0
                        },
                    })
                })
                .collect();
            summaries.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
            summaries
        };

        CategoryStats {
            income_categories: summarize(EntryType::Income, total_income),
            expense_categories: summarize(EntryType::Expense, total_expenses),
            total_income,
            total_expenses,
        }
    }

    pub fn export_categories(&self) -> ServiceResult<String> {
        Ok(serde_json::to_string_pretty(&self.categories)?)
    }

    /// Replaces the catalogue with every well-formed entry of a JSON array.
    pub fn import_categories(&mut self, json: &str) -> ServiceResult<usize> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| FinanceError::InvalidImport(format!("not valid JSON: {}", err)))?;
        let Value::Array(elements) = value else {
            return Err(FinanceError::InvalidImport("expected a JSON array".into()));
        };
        let imported: Vec<Category> = elements
            .into_iter()
            .filter_map(|element| serde_json::from_value::<Category>(element).ok())
            .filter(|cat| !cat.id.is_empty() && !cat.name.trim().is_empty())
            .collect();
        let count = imported.len();
        self.categories = imported;
        self.persist();
        info!(count, "categories imported");
        Ok(count)
    }

    fn validate_name(
        categories: &[Category],
        exclude: Option<&str>,
        candidate: &str,
        kind: EntryType,
    ) -> ServiceResult<String> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(FinanceError::Validation(
                "category name must not be empty".into(),
            ));
        }
        let normalized = trimmed.to_lowercase();
        let duplicate = categories.iter().any(|cat| {
            cat.kind == kind
                && cat.name.trim().to_lowercase() == normalized
                && exclude.map_or(true, |id| cat.id != id)
        });
        if duplicate {
            Err(FinanceError::Validation(format!(
                "{} category `{}` already exists",
                kind, trimmed
            )))
        } else {
            Ok(trimmed.to_string())
        }
    }

    fn persist(&self) {
        self.storage.set(keys::CATEGORIES, &self.categories);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::SystemClock;
    use crate::domain::transaction::NewTransaction;
    use crate::storage::MemoryBackend;
    use chrono::NaiveDate;

    fn service() -> (CategoryService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let storage = LocalStorage::from_shared(backend.clone());
        (CategoryService::open(storage, Arc::new(SystemClock)), backend)
    }

    fn txn(id: i64, new: NewTransaction) -> Transaction {
        Transaction::from_new(id, new)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 10).unwrap()
    }

    #[test]
    fn first_open_seeds_and_persists_defaults_once() {
        let (service, backend) = service();
        assert_eq!(service.income_categories().len(), 5);
        assert_eq!(service.expense_categories().len(), 9);
        assert_eq!(backend.write_count(keys::CATEGORIES), 1);

        let reopened = CategoryService::open(
            LocalStorage::from_shared(backend.clone()),
            Arc::new(SystemClock),
        );
        assert_eq!(reopened.all().len(), 14);
        assert_eq!(backend.write_count(keys::CATEGORIES), 1);
    }

    #[test]
    fn deleting_a_default_is_refused_and_changes_nothing() {
        let (mut service, backend) = service();
        let before = service.all().to_vec();
        let err = service.delete("expense-default-1").unwrap_err();
        assert!(matches!(err, FinanceError::DefaultCategoryProtected(_)));
        assert_eq!(service.all(), before.as_slice());
        assert_eq!(backend.write_count(keys::CATEGORIES), 1);
    }

    #[test]
    fn deleting_a_custom_category_removes_exactly_that_entry() {
        let (mut service, _) = service();
        let custom = service
            .create(NewCategory::new("Mascotas", EntryType::Expense).with_icon("🐶"))
            .unwrap();
        let other = service
            .create(NewCategory::new("Regalos", EntryType::Expense))
            .unwrap();
        service.delete(&custom.id).unwrap();
        assert!(service.get(&custom.id).is_none());
        assert!(service.get(&other.id).is_some());
        assert_eq!(service.all().len(), 15);
    }

    #[test]
    fn names_are_unique_per_type_ignoring_case() {
        let (mut service, _) = service();
        let err = service
            .create(NewCategory::new("  alimentación ", EntryType::Expense))
            .unwrap_err();
        assert!(matches!(err, FinanceError::Validation(_)));
        service
            .create(NewCategory::new("Alimentación", EntryType::Income))
            .unwrap();
        assert!(service
            .create(NewCategory::new("   ", EntryType::Income))
            .is_err());
    }

    #[test]
    fn update_touches_only_supplied_fields() {
        let (mut service, _) = service();
        let updated = service
            .update(
                "expense-default-2",
                CategoryUpdate {
                    color: Some("#123456".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Transporte");
        assert_eq!(updated.color.as_deref(), Some("#123456"));
        assert!(updated.is_default);
        assert!(matches!(
            service.update("missing", CategoryUpdate::default()),
            Err(FinanceError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn reset_restores_only_defaults() {
        let (mut service, _) = service();
        service
            .create(NewCategory::new("Viajes", EntryType::Expense))
            .unwrap();
        service.reset_to_default();
        assert_eq!(service.all().len(), 14);
        assert!(service.find_by_name("viajes", EntryType::Expense).is_none());
    }

    #[test]
    fn usage_and_stats_match_on_name_and_type() {
        let (service, _) = service();
        let transactions = vec![
            txn(1, NewTransaction::expense("Super", 300.0, "Alimentación", day())),
            txn(2, NewTransaction::expense("Cena", 100.0, "Alimentación", day())),
            txn(3, NewTransaction::expense("Bus", 100.0, "Transporte", day())),
            txn(4, NewTransaction::income("Nómina", 1000.0, "Salario", day())),
        ];
        assert!(service.is_category_in_use("expense-default-1", &transactions));
        assert!(!service.is_category_in_use("expense-default-3", &transactions));

        let stats = service.category_stats(&transactions);
        assert_eq!(stats.total_expenses, 500.0);
        assert_eq!(stats.total_income, 1000.0);
        let food = &stats.expense_categories[0];
        assert_eq!(food.category.name, "Alimentación");
        assert_eq!(food.transaction_count, 2);
        assert_eq!(food.percentage, 80.0);
        assert_eq!(stats.income_categories[0].percentage, 100.0);
    }

    #[test]
    fn import_keeps_only_well_formed_entries() {
        let (mut service, _) = service();
        let payload = r#"[
            {"id": "c1", "name": "Uno", "type": "expense"},
            {"id": "c2", "name": "Dos", "type": "transfer"},
            {"name": "Tres", "type": "income"}
        ]"#;
        assert_eq!(service.import_categories(payload).unwrap(), 1);
        assert_eq!(service.all()[0].name, "Uno");
        assert!(service.import_categories("{}").is_err());
        assert_eq!(service.all().len(), 1);
    }
}
