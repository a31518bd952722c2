use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::types::AvailabilityRow;

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: row"));

static COUNTRY_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("invalid selector: country cell"));

// The earliest date is the only bold span inside the data cells.
static EARLIEST_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td span.font-bold").expect("invalid selector: earliest"));

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_row(row: ElementRef) -> Option<AvailabilityRow> {
    let country_cell = row.select(&COUNTRY_CELL_SEL).next()?;
    let label = normalize_whitespace(&elem_text(country_cell));
    let earliest = row
        .select(&EARLIEST_SEL)
        .next()
        .map(|span| normalize_whitespace(&elem_text(span)))
        .unwrap_or_default();

    Some(AvailabilityRow::new(label, earliest))
}

/// Lazily walks every `<tr>` in document order, yielding the rows that have a
/// country header cell. Rows without one are layout and get skipped.
pub fn extract_rows(document: &Html) -> impl Iterator<Item = AvailabilityRow> + '_ {
    document.select(&ROW_SEL).filter_map(parse_row)
}

pub fn parse_availability_rows(html: &str) -> Vec<AvailabilityRow> {
    let document = Html::parse_document(html);
    let rows: Vec<_> = extract_rows(&document).collect();
    log::debug!("Extracted {} row(s) with a country cell", rows.len());
    rows
}
