//! Text formatting helpers shared by the report renderers.

use unicode_width::UnicodeWidthStr;

/// Format a floating-point number with a fixed number of decimal places.
///
/// # Examples
///
/// ```
/// use volumetria_core::formatting::format_decimal;
///
/// assert_eq!(format_decimal(3.0, 2), "3.00");
/// assert_eq!(format_decimal(2.345, 1), "2.3");
/// assert_eq!(format_decimal(-1.5, 0), "-2");
/// ```
pub fn format_decimal(value: f64, decimals: u32) -> String {
    // Nudge by a tiny epsilon at the target precision so exact midpoints
    // round away from zero instead of following the binary representation.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * value.abs() * factor;
    let rounded = ((value.abs() * factor) + epsilon).round() / factor;
    let signed = if value < 0.0 { -rounded } else { rounded };
    format!("{:.prec$}", signed, prec = decimals as usize)
}

/// Terminal display width of `text` (accented and wide characters aware).
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Pad `text` with trailing spaces up to `width` display columns.
pub fn pad_right(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(pad))
}

/// Pad `text` with leading spaces up to `width` display columns.
pub fn pad_left(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text));
    format!("{}{}", " ".repeat(pad), text)
}

/// Alignment of a column in [`render_text_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Render a fixed-width table with a header rule.
///
/// `aligns` applies per column; columns beyond its length are left-aligned.
///
/// ```
/// use volumetria_core::formatting::{render_text_table, Align};
///
/// let out = render_text_table(
///     &["Tipo", "Qtd"],
///     &[vec!["X1".to_string(), "12".to_string()]],
///     &[Align::Left, Align::Right],
/// );
/// assert_eq!(out, "Tipo | Qtd\n-----+----\nX1   |  12");
/// ```
pub fn render_text_table(headers: &[&str], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let align_of = |i: usize| aligns.get(i).copied().unwrap_or(Align::Left);
    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match align_of(i) {
                Align::Left if i + 1 == widths.len() => cell.to_string(),
                Align::Left => pad_right(cell, widths[i]),
                Align::Right => pad_left(cell, widths[i]),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        let cells: Vec<&str> = (0..widths.len())
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        lines.push(render_row(cells));
    }

    lines.join("\n")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
