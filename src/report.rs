//! Report
//!
//! Console rendering of orders and settings status.

use std::{fmt::Write, io};

use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    display::PAID_QTY_META_KEY,
    pricing::{TotalPriceError, line_total, total_price},
    products::ProductId,
    settings::StatusSummary,
    storefront::{Order, OrderLine},
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Output could not be written.
    #[error("Failed to write report")]
    IO,

    /// Full-price total could not be calculated.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// Write an order as a table followed by a totals summary.
///
/// `display_names` are the line names as shown in the cart, in order; lines
/// without one fall back to the order line name.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn write_order(
    mut out: impl io::Write,
    order: &Order<'_>,
    display_names: &[String],
) -> Result<(), ReportError> {
    let mut builder = Builder::default();

    builder.push_record(["", "Item", "Qty", "Paid", "Base Price", "Unit Price", "Total"]);

    let mut offer_rows: Vec<usize> = Vec::new();

    for (idx, line) in order.lines.iter().enumerate() {
        let name = display_names
            .get(idx)
            .map_or(line.name.as_str(), String::as_str);

        let paid = line.meta_value(PAID_QTY_META_KEY);

        if paid.is_some() {
            offer_rows.push(idx + 1);
        }

        builder.push_record([
            format!("#{:<3}", idx + 1),
            name.to_string(),
            line.quantity.to_string(),
            paid.map_or_else(|| line.quantity.to_string(), str::to_string),
            line.base_price.to_string(),
            line.unit_price.to_string(),
            line.total.to_string(),
        ]);
    }

    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..7), Alignment::right());

    for row in offer_rows {
        table.modify((row, 5), Color::FG_GREEN);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReportError::IO)?;

    write_order_summary(&mut out, order)?;
    write_order_meta(&mut out, order)
}

fn write_order_meta(out: &mut impl io::Write, order: &Order<'_>) -> Result<(), ReportError> {
    for (idx, line) in order.lines.iter().enumerate() {
        for meta in &line.meta {
            writeln!(out, " #{:<3} {} = {}", idx + 1, meta.key, meta.value)
                .map_err(|_err| ReportError::IO)?;
        }
    }

    Ok(())
}

fn write_order_summary(out: &mut impl io::Write, order: &Order<'_>) -> Result<(), ReportError> {
    let currency = order.total.currency();
    let full_price = full_price(&order.lines, currency)?;
    let savings = Money::from_decimal(*full_price.amount() - *order.total.amount(), currency);
    let free_units: u32 = order
        .lines
        .iter()
        .filter_map(|line| {
            line.meta_value(PAID_QTY_META_KEY)
                .and_then(|paid| paid.parse::<u32>().ok())
                .map(|paid| line.quantity.saturating_sub(paid))
        })
        .sum();

    let rows = [
        (" Full price:".to_string(), format!("{full_price}  ")),
        (
            " \x1b[1mTotal:\x1b[0m".to_string(),
            format!("\x1b[1m{}  \x1b[0m", order.total),
        ),
        (
            " Savings:".to_string(),
            format!("({free_units} free) {savings}  "),
        ),
    ];

    let label_width = rows
        .iter()
        .map(|(label, _)| visible_width(label))
        .max()
        .unwrap_or(0);

    let value_width = rows
        .iter()
        .map(|(_, value)| visible_width(value))
        .max()
        .unwrap_or(0);

    for (label, value) in &rows {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    writeln!(out).map_err(|_err| ReportError::IO)
}

fn full_price<'a>(
    lines: &[OrderLine<'a>],
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, ReportError> {
    let full = total_price(
        lines
            .iter()
            .map(|line| line_total(line.base_price, line.quantity)),
        currency,
    )?;

    Ok(full)
}

/// Write the settings status as a two-column table.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn write_status(
    mut out: impl io::Write,
    status: &StatusSummary,
    selected: &[ProductId],
) -> Result<(), ReportError> {
    let mut builder = Builder::default();

    let ids = if selected.is_empty() {
        "-".to_string()
    } else {
        selected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    builder.push_record(["BOGO Status".to_string(), status.status_label().to_string()]);
    builder.push_record(["Scope".to_string(), status.scope.label().to_string()]);
    builder.push_record([
        "Selected products".to_string(),
        status.selected_count.to_string(),
    ]);
    builder.push_record(["Selected IDs".to_string(), ids]);

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::first(), Color::BOLD);

    let status_color = if status.enabled {
        Color::FG_GREEN
    } else {
        Color::FG_RED
    };

    table.modify((0, 1), status_color);

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "{table_str}").map_err(|_err| ReportError::IO)
}

/// Dim box-drawing characters so the data stands out.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Display width ignoring ANSI escape sequences.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReportError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReportError::IO)
}
