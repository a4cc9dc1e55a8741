mod common;

use std::fs;

use common::{day, open_tracker, temp_store_dir};
use finance_tracker::{
    config::{Config, ConfigManager},
    domain::{
        budget::{BudgetCategoryInput, CreateBudgetDto},
        category::NewCategory,
        transaction::NewTransaction,
        EntryType,
    },
    storage::keys,
};

#[test]
fn state_survives_reopening_the_store() {
    let dir = temp_store_dir();
    let (txn_id, budget_id) = {
        let mut tracker = open_tracker(&dir);
        tracker
            .categories_mut()
            .create(NewCategory::new("Mascotas", EntryType::Expense))
            .unwrap();
        let budget = tracker
            .create_budget(CreateBudgetDto::new(11, 2024).with_category(
                BudgetCategoryInput::new("Mascotas", EntryType::Expense, 100.0),
            ))
            .unwrap();
        let txn = tracker
            .add_transaction(NewTransaction::expense("Veterinario", 45.0, "Mascotas", day(8)))
            .unwrap();
        (txn.id, budget.id)
    };

    let reopened = open_tracker(&dir);
    assert_eq!(reopened.transactions().get(txn_id).unwrap().amount, -45.0);
    assert!(reopened
        .categories()
        .find_by_name("mascotas", EntryType::Expense)
        .is_some());
    let budget = reopened.budgets().get_budget(&budget_id).unwrap();
    assert_eq!(budget.categories[0].spent_amount, 45.0);
    assert_eq!(reopened.budgets().templates().len(), 1);
}

#[test]
fn each_collection_lives_under_its_own_key() {
    let dir = temp_store_dir();
    let mut tracker = open_tracker(&dir);
    tracker
        .add_transaction(NewTransaction::income("Sueldo", 1000.0, "Salario", day(1)))
        .unwrap();

    let store = dir.join("store");
    for key in [
        keys::TRANSACTIONS,
        keys::CATEGORIES,
        keys::BUDGET_TEMPLATES,
        keys::APP_VERSION,
    ] {
        assert!(
            store.join(format!("{}.json", key)).exists(),
            "missing document for {}",
            key
        );
    }
    let raw = fs::read_to_string(store.join(format!("{}.json", keys::TRANSACTIONS))).unwrap();
    assert!(raw.contains("\"type\":\"income\""));
}

#[test]
fn corrupt_documents_fall_back_to_empty_collections() {
    let dir = temp_store_dir();
    drop(open_tracker(&dir));
    let store = dir.join("store");
    fs::write(store.join(format!("{}.json", keys::TRANSACTIONS)), "{not json").unwrap();

    let tracker = open_tracker(&dir);
    assert!(tracker.transactions().all().is_empty());
}

#[test]
fn preferences_are_cleared_by_an_application_reset() {
    let dir = temp_store_dir();
    let mut tracker = open_tracker(&dir);
    let manager = ConfigManager::new(tracker.storage().clone());
    let config = Config {
        currency: "ARS".into(),
        ..Config::default()
    };
    manager.save(&config);
    assert_eq!(manager.load().currency, "ARS");

    tracker.reset_application();
    assert_eq!(manager.load(), Config::default());
}
