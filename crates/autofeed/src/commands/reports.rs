//! History, analytics, and health handlers.

use std::fmt::Write as _;

use tabled::{Table, Tabled, settings::Style};

use autofeed_core::{Controller, FeedEvent, ServiceHealth, WeeklyTotals};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── History ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Device")]
    device: String,
}

impl From<&FeedEvent> for HistoryRow {
    fn from(e: &FeedEvent) -> Self {
        Self {
            when: when(e),
            amount: format!("{} {}", e.amount, e.unit),
            source: e.source.clone().unwrap_or_default(),
            device: e.device_id.clone().unwrap_or_default(),
        }
    }
}

fn when(e: &FeedEvent) -> String {
    e.recorded_at().map_or_else(
        || e.timestamp.clone(),
        |at| at.format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub async fn history(
    controller: &Controller,
    limit: Option<usize>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut events = controller.history().await?;
    if let Some(limit) = limit {
        events.truncate(limit);
    }
    let out = output::render_list(&global.output, &events, |e| HistoryRow::from(e), |e| {
        format!("{}\t{}", when(e), e.amount)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Analytics ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Grams")]
    grams: u64,
}

fn weekly_table(weekly: &WeeklyTotals) -> String {
    let mut rows: Vec<DayRow> = weekly
        .data
        .iter()
        .map(|(day, grams)| DayRow {
            day: day.clone(),
            grams: *grams,
        })
        .collect();
    rows.push(DayRow {
        day: "Total".into(),
        grams: weekly.total(),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

fn weekly_plain(weekly: &WeeklyTotals) -> String {
    let mut out = String::new();
    for (day, grams) in &weekly.data {
        let _ = writeln!(out, "{day}\t{grams}");
    }
    out.trim_end().to_owned()
}

pub async fn analytics(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let weekly = controller.weekly_analytics().await?;
    let out = output::render_single(&global.output, &weekly, weekly_table, weekly_plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Health ──────────────────────────────────────────────────────────

fn health_detail(h: &ServiceHealth, color: bool) -> String {
    let broker = if h.mqtt_connected {
        "connected".to_owned()
    } else {
        output::warning("disconnected", color)
    };
    format!("Service: {}\nBroker:  {broker}", h.status)
}

pub async fn health(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let health = controller.service_health().await?;
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &health,
        |h| health_detail(h, color),
        |h| h.status.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_table_appends_total() {
        let mut weekly = WeeklyTotals::default();
        weekly.data.insert("Mon".into(), 50);
        weekly.data.insert("Tue".into(), 30);
        let table = weekly_table(&weekly);
        assert!(table.contains("Total"));
        assert!(table.contains("80"));
        assert_eq!(weekly_plain(&weekly), "Mon\t50\nTue\t30");
    }

    #[test]
    fn history_row_falls_back_to_raw_timestamp() {
        let event = FeedEvent {
            timestamp: "sometime".into(),
            device_id: Some("F1".into()),
            amount: 40,
            unit: "g".into(),
            source: Some("schedule".into()),
        };
        let row = HistoryRow::from(&event);
        assert_eq!(row.when, "sometime");
        assert_eq!(row.amount, "40 g");

        let parsed = FeedEvent {
            timestamp: "2024-06-15 08:30:00".into(),
            ..event
        };
        assert_eq!(when(&parsed), "2024-06-15 08:30");
    }
}
