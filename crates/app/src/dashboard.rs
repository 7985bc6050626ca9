//! Plain-text dashboard: herd summary, active animals, sales and milk history, and
//! anything in the data that needs attention.

use std::fmt::Write;

use rust_decimal::Decimal;

use herdbook_livestock::AnimalRecord;

use crate::Overview;

const RECENT_MILK_DAYS: usize = 7;

pub fn render(overview: &Overview) -> String {
    let mut out = String::new();
    summary(&mut out, overview);
    active_animals(&mut out, overview);
    sales(&mut out, overview);
    milk(&mut out, overview);
    attention(&mut out, overview);
    out
}

fn summary(out: &mut String, overview: &Overview) {
    let summary = overview.herd.summary();
    let _ = writeln!(out, "== Herd (active) ==");
    if summary.active == 0 {
        let _ = writeln!(out, "No active animals. Register animals to fill the dashboard.");
        return;
    }
    let _ = writeln!(out, "Total on farm: {}", summary.active);
    let _ = writeln!(out, "Females / Males: {} / {}", summary.females, summary.males);
    for (category, count) in &summary.by_category {
        let share = *count as f64 * 100.0 / summary.active as f64;
        let _ = writeln!(out, "  {category:<16} {count:>4}  ({share:.0}%)");
    }
}

fn active_animals(out: &mut String, overview: &Overview) {
    let active: Vec<&AnimalRecord> = overview.herd.active().collect();
    if active.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n== Animals ==");
    let _ = writeln!(
        out,
        "{:<8} {:<14} {:<10} {:<7} {:>8} {:<9} Photo",
        "ID", "Name", "Category", "Sex", "Kg", "Status"
    );
    for a in active {
        let photo = match a.photo_ref.displayable_url() {
            Some(_) => "yes",
            None if a.photo_ref.is_error() => "error",
            None => "-",
        };
        let _ = writeln!(
            out,
            "{:<8} {:<14} {:<10} {:<7} {:>8} {:<9} {photo}",
            a.id.as_str(),
            a.name,
            a.category,
            a.sex.label(),
            a.weight.kg().to_string(),
            a.status.label(),
        );
    }
}

fn sales(out: &mut String, overview: &Overview) {
    let sales = overview.ledger.sales();
    let _ = writeln!(out, "\n== Sales ==");
    if sales.is_empty() {
        let _ = writeln!(out, "No sales recorded.");
        return;
    }
    for sale in sales {
        let _ = writeln!(
            out,
            "{}  {:<8} {}  {}",
            sale.date, sale.animal_id, sale.detail1, sale.detail2
        );
    }
}

fn milk(out: &mut String, overview: &Overview) {
    let history = overview.ledger.milk_history();
    if history.is_empty() {
        return;
    }
    let recent = &history[history.len().saturating_sub(RECENT_MILK_DAYS)..];
    let total: Decimal = recent.iter().map(|m| m.litres).sum();
    let _ = writeln!(out, "\n== Milk (last {} entries) ==", recent.len());
    for day in recent {
        let _ = writeln!(out, "{}  {:>8} L  {:>3} cows", day.date, day.litres.to_string(), day.cows);
    }
    let _ = writeln!(out, "Total: {total} L");
}

fn attention(out: &mut String, overview: &Overview) {
    let mut notes = Vec::new();
    for id in overview.herd.duplicate_ids() {
        notes.push(format!("animal id {id} appears on more than one row; the first row is used"));
    }
    for row in overview.herd.rejected() {
        notes.push(format!("animals {}: {}", row.address, row.reason));
    }
    for row in overview.ledger.rejected() {
        notes.push(format!("ledger {}: {}", row.address, row.reason));
    }
    let recon = &overview.reconciliation;
    for id in &recon.sold_without_status {
        notes.push(format!("sale of {id} recorded but the animal is not marked Sold"));
    }
    for id in &recon.unknown_ids {
        notes.push(format!("sale recorded for unknown animal {id}"));
    }

    if notes.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n== Needs attention ==");
    for note in notes {
        let _ = writeln!(out, "! {note}");
    }
}
