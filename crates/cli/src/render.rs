//! Terminal rendering - panels and tables

use console::{measure_text_width, pad_str, style, Alignment, Color, Style};
use std::fmt::Display;

/// Render a rounded panel with a title
pub fn panel(title: &str, body: &str, color: Color) -> String {
    let border = Style::new().fg(color);
    let lines: Vec<&str> = if body.is_empty() { vec![""] } else { body.lines().collect() };
    let width = lines
        .iter()
        .map(|l| measure_text_width(l))
        .chain(std::iter::once(measure_text_width(title) + 2))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let top_fill = width + 2 - (measure_text_width(title) + 2);
    out.push_str(&format!(
        "{} {} {}\n",
        border.apply_to("╭─"),
        style(title).fg(color).bold(),
        border.apply_to(format!("{}╮", "─".repeat(top_fill.saturating_sub(1))))
    ));
    for line in lines {
        out.push_str(&format!(
            "{} {} {}\n",
            border.apply_to("│"),
            pad_str(line, width, Alignment::Left, None),
            border.apply_to("│")
        ));
    }
    out.push_str(&format!(
        "{}\n",
        border.apply_to(format!("╰{}╯", "─".repeat(width + 2)))
    ));
    out
}

pub fn success(title: &str, body: &str) {
    print!("{}", panel(title, body, Color::Green));
}

pub fn info(title: &str, body: &str) {
    print!("{}", panel(title, body, Color::Blue));
}

pub fn warning(title: &str, body: &str) {
    print!("{}", panel(title, body, Color::Yellow));
}

/// Failure panel on stderr
pub fn failure(body: &str) {
    eprint!("{}", panel("Failure", body, Color::Red));
}

/// Render a table with a title row and a header
pub fn table<H: AsRef<str>>(title: &str, headers: &[H], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h.as_ref())).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(measure_text_width(cell));
            }
        }
    }

    let format_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| pad_str(cell, *w, Alignment::Left, None).into_owned())
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

    let mut out = format!("{}\n", style(title).bold().cyan());
    out.push_str(&format!(
        "{}\n",
        style(format_row(headers.iter().map(|h| h.as_ref().to_string()).collect())).bold()
    ));
    out.push_str(&format!("{}\n", "─".repeat(total)));
    for row in rows {
        out.push_str(&format_row(row.clone()));
        out.push('\n');
    }
    out
}

/// Two column key/value table
pub fn key_value_table<K: Display, V: Display>(title: &str, rows: &[(K, V)]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|(k, v)| vec![k.to_string(), v.to_string()])
        .collect();
    table(title, &["Key", "Value"], &rows)
}
