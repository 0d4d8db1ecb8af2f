//! Human-readable output: tables and one-line receipts.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use valuta_hub_core::models::currency::Currency;
use valuta_hub_core::models::timestamp;
use valuta_hub_core::services::portfolio_service::{
    DepositReceipt, PortfolioSummary, TradeReceipt,
};
use valuta_hub_core::services::rates_view::DisplayRow;
use valuta_hub_core::services::resolver::ResolvedRate;
use valuta_hub_core::services::updater::UpdateReport;

#[derive(Tabled)]
struct RateLine {
    #[tabled(rename = "Pair")]
    pair: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Tabled)]
struct WalletLine {
    #[tabled(rename = "Currency")]
    code: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Format a rate with enough digits for both BTC and JPY magnitudes.
pub fn fmt_rate(rate: f64) -> String {
    if rate >= 1.0 {
        format!("{rate:.4}")
    } else {
        format!("{rate:.8}")
    }
}

pub fn rates_table(rows: &[DisplayRow]) -> String {
    let lines = rows.iter().map(|row| RateLine {
        pair: row.pair.clone(),
        rate: fmt_rate(row.rate),
        updated: timestamp::format(&row.updated_at),
        source: row.source.clone(),
    });
    Table::new(lines).with(Style::rounded()).to_string()
}

pub fn portfolio_table(username: &str, summary: &PortfolioSummary) -> String {
    if summary.rows.is_empty() {
        return format!("Portfolio of '{username}' is empty.");
    }
    let base = &summary.base;
    let lines = summary.rows.iter().map(|row| WalletLine {
        code: row.code.clone(),
        balance: format!("{:.4}", row.balance),
        rate: if row.code == *base {
            "1.00".into()
        } else {
            fmt_rate(row.rate)
        },
        value: format!("{:.2} {base}", row.value),
    });
    format!(
        "Portfolio of '{username}' (base: {base}):\n{}\nTOTAL: {:.2} {base}",
        Table::new(lines).with(Style::rounded()),
        summary.total
    )
}

pub fn currencies_list(currencies: &[&Currency]) -> String {
    currencies
        .iter()
        .map(|c| c.display_info())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn rate_line(rate: &ResolvedRate) -> String {
    let updated = rate
        .updated_at
        .map(|ts| timestamp::format(&ts))
        .unwrap_or_else(|| "-".into());
    format!(
        "Rate {from}→{to}: {r} (updated: {updated}, {origin})\nReverse rate {to}→{from}: {rev}",
        from = rate.from,
        to = rate.to,
        r = fmt_rate(rate.rate),
        origin = rate.origin,
        rev = fmt_rate(rate.reverse_rate()),
    )
}

pub fn deposit_line(receipt: &DepositReceipt) -> String {
    format!(
        "Deposit done: +{:.2} USD\nBalance: {:.2} USD → {:.2} USD",
        receipt.amount, receipt.before, receipt.after
    )
}

pub fn buy_line(r: &TradeReceipt) -> String {
    format!(
        "Bought {:.4} {code} at {} USD/{code}\nPaid: {:.2} USD | USD balance: {:.2}",
        r.amount,
        fmt_rate(r.rate),
        r.usd_amount,
        r.usd_balance,
        code = r.code,
    )
}

pub fn sell_line(r: &TradeReceipt) -> String {
    format!(
        "Sold {:.4} {code} at {} USD/{code}\nReceived: {:.2} USD | {code}: {:.4} → {:.4} | USD balance: {:.2}",
        r.amount,
        fmt_rate(r.rate),
        r.usd_amount,
        r.before,
        r.after,
        r.usd_balance,
        code = r.code,
    )
}

pub fn update_summary(report: &UpdateReport) -> String {
    let mut out = if report.ok {
        format!(
            "Update successful. Total rates updated: {}. History records added: {}.",
            report.updated_pairs, report.history_added
        )
    } else {
        format!(
            "Update finished with errors. Rates updated: {}.",
            report.updated_pairs
        )
    };
    if let Some(ts) = report.last_refresh {
        out.push_str(&format!(" Last refresh: {}", timestamp::format(&ts)));
    }
    if !report.failed_sources.is_empty() {
        out.push_str(&format!(
            "\nFailed sources: {}",
            report.failed_sources.join(", ")
        ));
    }
    out
}
