//! Terminal rendering of price series
//!
//! The simple display collaborator: turns the coordinator's published state
//! into colored tables, one per series, and carries the severity-typed user
//! notices.

use crate::config::UiConfig;
use crate::coordinator::RefreshState;
use crate::series::PriceSeries;
use crate::tariff::{TariffBand, classify};
use chrono::{DateTime, FixedOffset};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use tracing::{error, info, warn};

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

/// Emit a user-facing notice at the matching log level
pub fn notify(severity: Severity, message: &str) {
    match severity {
        Severity::Information => info!("{}", message),
        Severity::Warning => warn!("{}", message),
        Severity::Error => error!("{}", message),
    }
}

fn band_color(band: TariffBand) -> Color {
    match band {
        TariffBand::Valley => Color::Green,
        TariffBand::Plain => Color::White,
        TariffBand::Peak => Color::Red,
        TariffBand::Unclassified => Color::Reset,
    }
}

/// Build the rate table for one series
pub fn build_series_table(
    series: &PriceSeries,
    ui: &UiConfig,
    now: DateTime<FixedOffset>,
) -> Table {
    let current_instant = if ui.highlight_current {
        series.find_by_hour(now).map(|point| point.instant)
    } else {
        None
    };

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("period"),
        Cell::new("time"),
        Cell::new(format!("rate [{}]", ui.currency_unit)),
    ]);

    for point in &series.points {
        let band = classify(point.instant);
        let is_current = current_instant == Some(point.instant);

        let mut time_cell = Cell::new(point.instant.format("%H:%M"));
        let mut rate_cell =
            Cell::new(format!("{:.2}", point.value)).set_alignment(CellAlignment::Right);
        if is_current {
            time_cell = time_cell.add_attribute(Attribute::Bold);
            rate_cell = rate_cell.add_attribute(Attribute::Bold);
        }

        table.add_row(vec![
            Cell::new(band.label()).fg(band_color(band)),
            time_cell,
            rate_cell,
        ]);
    }

    table
}

/// Render the whole published day: one titled table per series
pub fn render_day(state: &RefreshState, ui: &UiConfig, now: DateTime<FixedOffset>) -> String {
    let mut out = String::new();

    if state.series.is_empty() {
        out.push_str(&format!("No price data for {}.\n", state.selected_date));
        return out;
    }

    for series in &state.series {
        out.push_str(&format!(
            "{} (Rates as of: {})\n",
            series.title,
            series.last_update.format("%Y-%m-%d %H:%M")
        ));
        out.push_str(&build_series_table(series, ui, now).to_string());
        out.push('\n');
    }

    out
}
