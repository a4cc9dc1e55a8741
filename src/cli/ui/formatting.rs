use colored::Colorize;

use crate::cli::output::current_preferences;
use crate::core::services::summary_service::BalanceStatus;
use crate::domain::budget::{AlertSeverity, BudgetStatus};

/// Formats `amount` with thousands separators and the currency code,
/// e.g. `-1,234.50 ARS`.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{:02} {currency}", cents % 100)
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value + 0.0)
}

fn paint(text: String, color: colored::Color) -> String {
    if current_preferences().plain_mode {
        text
    } else {
        text.color(color).to_string()
    }
}

pub fn budget_status(status: BudgetStatus) -> String {
    let color = match status {
        BudgetStatus::Healthy => colored::Color::Green,
        BudgetStatus::Warning => colored::Color::Yellow,
        BudgetStatus::Exceeded => colored::Color::Red,
        BudgetStatus::Undefined => colored::Color::BrightBlack,
    };
    paint(status.to_string(), color)
}

pub fn balance_status(status: BalanceStatus) -> String {
    let color = match status {
        BalanceStatus::Positive => colored::Color::Green,
        BalanceStatus::Negative => colored::Color::Red,
        BalanceStatus::Balanced => colored::Color::White,
    };
    paint(status.to_string(), color)
}

pub fn severity(severity: AlertSeverity) -> String {
    let color = match severity {
        AlertSeverity::Low => colored::Color::BrightBlack,
        AlertSeverity::Medium => colored::Color::Yellow,
        AlertSeverity::High => colored::Color::Red,
    };
    paint(severity.to_string(), color)
}

/// Text progress bar, clamped at 100% so overspent lines stay one width.
pub fn progress_bar(percentage: f64, width: usize) -> String {
    let ratio = (percentage / 100.0).clamp(0.0, 1.0);
    let filled = (ratio * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

/// First eight characters of a uuid-style identifier.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn print_two_column(entries: &[(&str, String)]) {
    let width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in entries {
        println!("  {:<width$}  {}", label, value, width = width + 1);
    }
}
