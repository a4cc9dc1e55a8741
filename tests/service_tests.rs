mod common;

use common::{day, setup_tracker};
use finance_tracker::{
    core::FinanceError,
    domain::{
        budget::{AlertKind, BudgetCategoryInput, BudgetStatus, CreateBudgetDto},
        transaction::NewTransaction,
        EntryType,
    },
};

fn food_budget() -> CreateBudgetDto {
    CreateBudgetDto::new(11, 2024).with_category(BudgetCategoryInput::new(
        "Alimentación",
        EntryType::Expense,
        400.0,
    ))
}

#[test]
fn food_budget_warns_then_exceeds_without_duplicate_alerts() {
    let (mut tracker, _dir) = setup_tracker();
    let budget = tracker.create_budget(food_budget()).expect("create budget");

    tracker
        .add_transaction(NewTransaction::expense("Supermercado", 380.0, "Alimentación", day(5)))
        .expect("first expense");
    let line = &tracker.budgets().get_budget(&budget.id).unwrap().categories[0];
    assert_eq!(line.spent_amount, 380.0);
    assert_eq!(line.percentage, 95.0);
    assert_eq!(line.status, BudgetStatus::Warning);
    assert_eq!(tracker.budgets().active_alerts().len(), 1);
    assert_eq!(tracker.budgets().active_alerts()[0].kind, AlertKind::Warning);

    tracker
        .add_transaction(NewTransaction::expense("Verdulería", 40.0, "Alimentación", day(6)))
        .expect("second expense");
    let line = &tracker.budgets().get_budget(&budget.id).unwrap().categories[0];
    assert_eq!(line.percentage, 105.0);
    assert_eq!(line.status, BudgetStatus::Exceeded);

    let active = tracker.budgets().active_alerts();
    assert_eq!(active.len(), 2);
    assert!(active.iter().any(|alert| alert.kind == AlertKind::Exceeded));
    let warnings = tracker
        .budgets()
        .alerts()
        .iter()
        .filter(|alert| alert.kind == AlertKind::Warning)
        .count();
    assert_eq!(warnings, 1);
}

#[test]
fn deleting_the_expense_releases_the_budget() {
    let (mut tracker, _dir) = setup_tracker();
    let budget = tracker.create_budget(food_budget()).unwrap();
    let txn = tracker
        .add_transaction(NewTransaction::expense("Cena", 120.0, "Alimentación", day(10)))
        .unwrap();
    tracker.delete_transaction(txn.id).unwrap();

    let refreshed = tracker.budgets().get_budget(&budget.id).unwrap();
    assert_eq!(refreshed.categories[0].spent_amount, 0.0);
    assert_eq!(refreshed.totals.actual_expenses, 0.0);
}

#[test]
fn import_replaces_transactions_and_recomputes_budgets() {
    let (mut tracker, _dir) = setup_tracker();
    let budget = tracker.create_budget(food_budget()).unwrap();
    tracker
        .add_transaction(NewTransaction::income("Sueldo", 2000.0, "Salario", day(1)))
        .unwrap();

    let backup = r#"[
        {"id": 1, "description": "Feria", "amount": -50, "category": "Alimentación", "date": "2024-11-03", "type": "expense"},
        {"id": 2, "description": "Almacén", "amount": -25.5, "category": "Alimentación", "date": "2024-11-04", "type": "expense"}
    ]"#;
    assert_eq!(tracker.import_transactions(backup).unwrap(), 2);
    assert_eq!(tracker.transactions().all().len(), 2);
    assert_eq!(tracker.transactions().total_income(), 0.0);
    let line = &tracker.budgets().get_budget(&budget.id).unwrap().categories[0];
    assert_eq!(line.spent_amount, 75.5);

    let broken = r#"[{"id": 3, "description": "Sin fecha", "amount": -1, "category": "Otros", "type": "expense"}]"#;
    assert!(matches!(
        tracker.import_transactions(broken),
        Err(FinanceError::InvalidImport(_))
    ));
    assert_eq!(tracker.transactions().all().len(), 2);
}

#[test]
fn default_template_produces_a_named_budget() {
    let (mut tracker, _dir) = setup_tracker();
    let template = tracker.budgets().default_template().unwrap().clone();
    let budget = tracker
        .create_budget_from_template(&template.id, 12, 2024)
        .unwrap();
    assert_eq!(budget.name, format!("{} - December 2024", template.name));
    assert_eq!(budget.categories.len(), template.categories.len());
    assert!(budget.is_active);
}

#[test]
fn reset_application_keeps_categories_and_budgets() {
    let (mut tracker, _dir) = setup_tracker();
    let budget = tracker.create_budget(food_budget()).unwrap();
    tracker
        .add_transaction(NewTransaction::expense("Cena", 60.0, "Alimentación", day(2)))
        .unwrap();
    let categories = tracker.categories().all().len();

    tracker.reset_application();

    assert!(tracker.transactions().all().is_empty());
    assert_eq!(tracker.categories().all().len(), categories);
    let kept = tracker.budgets().get_budget(&budget.id).unwrap();
    assert_eq!(kept.categories[0].spent_amount, 0.0);
}
