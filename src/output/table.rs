use unicode_width::UnicodeWidthStr;

use crate::db::models::EntityId;
use crate::filters::{FacetValue, FilterCollection, FilterOutcome};

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Pad to a display width; `{:<n}` counts chars, not columns.
fn pad(s: &str, width: usize) -> String {
    let s = truncate(s, width);
    let fill = width.saturating_sub(UnicodeWidthStr::width(s.as_str()));
    format!("{s}{}", " ".repeat(fill))
}

/// Print a facet's value catalogue.
pub fn print_facet_values(category: &str, facet: &str, values: &[FacetValue]) {
    if values.is_empty() {
        println!("No values for {category}.{facet}");
        return;
    }

    println!(
        "{} value{} for {category}.{facet}:\n",
        values.len(),
        if values.len() == 1 { "" } else { "s" }
    );
    println!("  {} {}", pad("VALUE", 32), "LABEL");
    println!("  {}", "-".repeat(72));
    for value in values {
        println!(
            "  {} {}",
            pad(&value.internal_value, 32),
            truncate(&value.display_value, 40)
        );
    }
}

/// Print the active filters of a collection, one line per facet.
pub fn print_active_filters(filters: &FilterCollection) {
    for category in filters.active_categories() {
        println!("{}:", category.display_name());
        for (spec, state) in category.sub_filters() {
            let params = state.query_params(&spec.name);
            if params.is_empty() {
                continue;
            }
            let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("  {} {}", pad(spec.display_name(), 24), rendered.join(" "));
        }
    }
}

/// Print a resolved outcome.
pub fn print_outcome(outcome: &FilterOutcome) {
    match outcome.ids() {
        None => println!("No active filter: every entity is shown."),
        Some(ids) if ids.is_empty() => println!("No entity matches the active filters."),
        Some(ids) => {
            println!(
                "{} matching entit{}:\n",
                ids.len(),
                if ids.len() == 1 { "y" } else { "ies" }
            );
            for line in id_lines(ids.iter().copied(), 72) {
                println!("  {line}");
            }
        }
    }
}

/// Lay ids out in lines no wider than `max_width`.
fn id_lines(ids: impl Iterator<Item = EntityId>, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for id in ids {
        let text = id.to_string();
        if !line.is_empty() && line.len() + 1 + text.len() > max_width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&text);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
