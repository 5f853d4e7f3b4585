//! Rendering of captured request data into log output.

use std::{fmt::Write, time::Duration};

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::logger::AccessRecord;

const COLUMN_GLUE: &str = "  ";

const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]/[month]/[day] - [hour]:[minute]:[second]");

/// Plain access line: `<status> <latency> <ip> <method> <path>[ <message>][ <header message>]`.
///
/// Disabled or empty fields are left out together with their separator.
pub fn line(record: &AccessRecord) -> String {
    let latency = latency(record.latency);
    let parts = [
        record.status.as_deref(),
        Some(latency.as_str()),
        record.ip.as_deref(),
        record.method.as_deref(),
        record.path.as_deref(),
        record.message.as_deref(),
        record.header_message.as_deref(),
    ];

    let mut line = String::new();
    for part in parts.into_iter().flatten().filter(|p| !p.is_empty()) {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(part);
    }
    line
}

/// Two-row table (titles and values) aligned by column, with a trailing newline.
///
/// Time and Latency are always present; the other columns only when the
/// record carries them.
pub fn columns(record: &AccessRecord) -> String {
    let mut titles = vec!["Time".to_string()];
    let mut values = vec![timestamp(record.end_time)];

    let mut push = |title: &str, value: &str| {
        titles.push(title.to_string());
        values.push(value.to_string());
    };

    if let Some(status) = &record.status {
        push("Status", status);
    }
    push("Latency", &latency(record.latency));
    if let Some(ip) = &record.ip {
        push("IP", ip);
    }
    if let Some(method) = &record.method {
        push("Method", method);
    }
    if let Some(path) = &record.path {
        push("Path", path);
    }
    if let Some(message) = &record.message {
        push("Message", message);
    }
    if let Some(header_message) = &record.header_message {
        push("HeaderMessage", header_message);
    }

    let mut output = align(&[titles, values]);
    output.push('\n');
    output
}

/// Pad cells so every column is as wide as its widest cell.
///
/// Cells are trimmed first and joined with two spaces, rows with `\n`.
/// Cell content is taken as is, a `|` inside a value stays in its column.
pub fn align<S: AsRef<str>>(rows: &[Vec<S>]) -> String {
    let cells: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.as_ref().trim()).collect())
        .collect();

    let mut widths: Vec<usize> = Vec::new();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(width),
                None => widths.push(width),
            }
        }
    }

    let mut output = String::new();
    for (n, row) in cells.iter().enumerate() {
        if n > 0 {
            output.push('\n');
        }
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str(COLUMN_GLUE);
            }
            let _ = write!(output, "{:<width$}", cell, width = widths[i]);
        }
    }
    output
}

/// `2006/01/02 - 15:04:05` style timestamp.
pub fn timestamp(time: OffsetDateTime) -> String {
    time.format(TIME_FORMAT).unwrap_or_default()
}

/// Human readable duration: `0s`, `850ns`, `5.2µs`, `1.5ms`, `3.25s`, `1m30s`.
pub fn latency(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return fraction(nanos, 1_000, 3) + "µs";
    }
    if nanos < 1_000_000_000 {
        return fraction(nanos, 1_000_000, 6) + "ms";
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    out.push_str(&fraction(secs, 1_000_000_000, 9));
    out.push('s');
    out
}

/// `value / unit` with up to `digits` decimals, trailing zeros dropped.
fn fraction(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0digits$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
