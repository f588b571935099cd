use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mpe_common::CurrencyTable;
use mpe_engine::{
    db_types::{ExchangeRate, Payment},
    ConversionResult,
    TickSummary,
    VolatilityState,
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_rates(rates: &[ExchangeRate]) -> String {
    if rates.is_empty() {
        return "No exchange rates have been recorded".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Base", "Quote", "Rate", "Source", "Volatile", "Updated At"]);
    rates.iter().for_each(|r| {
        table.add_row(row![
            r.id,
            r.base_currency,
            r.quote_currency,
            r.rate,
            r.source,
            if r.is_volatile { "yes" } else { "" },
            timestamp(&r.updated_at),
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_currencies(currencies: &CurrencyTable) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Currency", "Decimals", "Settlement"]);
    currencies.iter().for_each(|c| {
        table.add_row(row![c.code, c.decimals, if c.settlement { "yes" } else { "" }]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_conversion(result: &ConversionResult) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Step", "Base", "Quote", "Rate", "Source"]);
    result.steps.iter().enumerate().for_each(|(i, step)| {
        let name = &step.source.source;
        let source = if step.is_inverse() { format!("{name} (inverted)") } else { name.clone() };
        table.add_row(row![i + 1, step.base_currency, step.quote_currency, step.rate, source]);
    });
    markdown_style(&mut table);
    let rate = result.effective_rate().map(|r| r.to_string()).unwrap_or_else(|| "n/a".to_string());
    format!(
        "{} -> {}: {result}\nEffective rate: {rate}\nOldest rate used: {}\n{table}",
        result.from_currency,
        result.to_currency,
        timestamp(&result.updated_at)
    )
}

pub fn format_market_states(states: &BTreeMap<String, VolatilityState>, reference: &str) -> String {
    if states.is_empty() {
        return "No currencies are monitored".to_string();
    }
    let mut table = Table::new();
    let high = format!("Window high ({reference})");
    table.set_titles(row!["Currency", "State", "Drop %", high, "Volatile since", "Checked At"]);
    states.iter().for_each(|(currency, s)| {
        table.add_row(row![
            currency,
            s.label(),
            s.current_drop_pct.round_dp(2),
            s.max_price_in_window.map(|p| p.to_string()).unwrap_or_default(),
            s.start_time.as_ref().map(timestamp).unwrap_or_default(),
            timestamp(&s.last_updated),
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_payments(payments: &[Payment]) -> String {
    if payments.is_empty() {
        return "No payments".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Purchase", "Amount", "Paid", "Method", "Status", "Memo", "Address", "Deadline"]);
    payments.iter().for_each(|p| {
        table.add_row(row![
            p.id,
            p.purchase_id,
            p.amount,
            p.paid_amount,
            p.payment_method,
            p.status,
            p.memo,
            p.receiving_address,
            timestamp(&p.deadline),
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_tick_summary(currency: &str, summary: &TickSummary) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Chain", "Addresses", "Failed", "Checked", "Complete", "Underpaid", "Timed out", "Partial"]);
    table.add_row(row![
        currency,
        summary.addresses,
        summary.failed_addresses,
        summary.payments_checked,
        summary.completed,
        summary.underpaid,
        summary.timed_out,
        summary.partial_updates,
    ]);
    markdown_style(&mut table);
    table.to_string()
}
