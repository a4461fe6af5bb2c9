//! Layout report for a source sheet: what each header cell holds, which
//! field the configuration reads from it, and a few sample rows.

use anyhow::Result;
use log::{info, warn};

use crate::{
    cli::InspectArgs,
    config::ColumnOffsets,
    error::ExtractError,
    scanner::{ColumnMap, scan_year_columns},
    sheet::{Cell, SourceSheet, cell_at},
    table,
};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let config = crate::resolve_config(&args.config)?;
    let sheet = crate::load_source(&args.source)?;
    let header = sheet.header().ok_or(ExtractError::MissingHeader)?;
    let column_map = scan_year_columns(header, config.year_range, config.columns.values_from);

    let headers = ["#", "column", "value", "kind", "role"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    table::print_table(
        &headers,
        &header_rows(header, &config.columns, &column_map, args.columns),
    );
    println!();
    let (sample_headers, samples) = sample_rows(&sheet, args.rows, args.columns);
    table::print_table(&sample_headers, &samples);

    match column_map.span() {
        Some((first, last)) => info!(
            "{} year column(s) between {first} and {last} starting at column {}",
            column_map.len(),
            column_letter(config.columns.values_from)
        ),
        None => warn!(
            "No header cells resolve to a year in {} from column {} onwards",
            config.year_range,
            column_letter(config.columns.values_from)
        ),
    }
    Ok(())
}

/// Spreadsheet column name for a zero-based index: 0 is `A`, 26 is `AA`.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn role(index: usize, columns: &ColumnOffsets, column_map: &ColumnMap) -> String {
    let fixed = [
        (columns.scenario, "scenario"),
        (columns.region, "region"),
        (columns.metric, "metric"),
        (columns.unit, "unit"),
        (columns.sector, "sector"),
    ];
    if let Some((_, name)) = fixed.iter().find(|(offset, _)| *offset == index) {
        return name.to_string();
    }
    column_map
        .iter()
        .find(|column| column.index == index)
        .map(|column| format!("year {}", column.year))
        .unwrap_or_default()
}

pub fn header_rows(
    header: &[Cell],
    columns: &ColumnOffsets,
    column_map: &ColumnMap,
    limit: usize,
) -> Vec<Vec<String>> {
    header
        .iter()
        .enumerate()
        .take(limit)
        .map(|(idx, cell)| {
            vec![
                (idx + 1).to_string(),
                column_letter(idx),
                cell.to_string(),
                cell.kind().to_string(),
                role(idx, columns, column_map),
            ]
        })
        .collect()
}

/// First `rows` data rows, truncated to `columns` cells and headed by their
/// spreadsheet row number.
pub fn sample_rows(
    sheet: &SourceSheet,
    rows: usize,
    columns: usize,
) -> (Vec<String>, Vec<Vec<String>>) {
    let width = sheet.column_count().min(columns);
    let mut headers = vec!["row".to_string()];
    headers.extend((0..width).map(column_letter));
    let samples = sheet
        .data_rows()
        .take(rows)
        .map(|(row_number, row)| {
            let mut rendered = vec![row_number.to_string()];
            rendered.extend((0..width).map(|idx| cell_at(row, idx).to_string()));
            rendered
        })
        .collect();
    (headers, samples)
}
