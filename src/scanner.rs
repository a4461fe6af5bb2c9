//! Year-column discovery.
//!
//! Pathway sheets carry a variable number of metadata columns followed by
//! one column per year. The scanner looks only at the header row and keeps
//! the columns whose header resolves to a year inside the configured range,
//! so value columns are found by content rather than by literal position.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{error::ExtractError, sheet::Cell};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.min > self.max {
            return Err(ExtractError::InvalidYearRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(2014, 2050)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearColumn {
    pub index: usize,
    pub year: i32,
}

/// Year columns in left-to-right header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: Vec<YearColumn>,
}

impl ColumnMap {
    pub fn columns(&self) -> &[YearColumn] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.columns.iter().map(|column| column.year).collect()
    }

    /// Lowest and highest year discovered, if any.
    pub fn span(&self) -> Option<(i32, i32)> {
        let min = self.columns.iter().map(|c| c.year).min()?;
        let max = self.columns.iter().map(|c| c.year).max()?;
        Some((min, max))
    }
}

/// Resolves a header cell to an integral year, or `None` when the cell holds
/// anything else. Header years arrive both as numbers and as text such as
/// `"2020"` depending on how the workbook was authored.
pub fn resolve_year(cell: &Cell) -> Option<i32> {
    let number = match cell {
        Cell::Number(number) => *number,
        Cell::Text(text) => {
            let trimmed = text.trim();
            match trimmed.parse::<i32>() {
                Ok(year) => return Some(year),
                Err(_) => trimmed.parse::<f64>().ok()?,
            }
        }
        Cell::Empty | Cell::Bool(_) => return None,
    };
    if !number.is_finite() || number.fract() != 0.0 {
        return None;
    }
    if number < f64::from(i32::MIN) || number > f64::from(i32::MAX) {
        return None;
    }
    Some(number as i32)
}

/// Scans `header` from `start_offset` onward. The first column carrying a
/// given year wins; later repeats are ignored.
pub fn scan_year_columns(header: &[Cell], range: YearRange, start_offset: usize) -> ColumnMap {
    let mut seen = HashSet::new();
    let columns = header
        .iter()
        .enumerate()
        .skip(start_offset)
        .filter_map(|(index, cell)| {
            let year = resolve_year(cell)?;
            (range.contains(year) && seen.insert(year)).then_some(YearColumn { index, year })
        })
        .collect();
    ColumnMap { columns }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn resolve_year_accepts_numbers_and_text() {
        assert_eq!(resolve_year(&Cell::Number(2030.0)), Some(2030));
        assert_eq!(resolve_year(&text("2021")), Some(2021));
        assert_eq!(resolve_year(&text(" 2025.0 ")), Some(2025));
        assert_eq!(resolve_year(&Cell::Number(2020.5)), None);
        assert_eq!(resolve_year(&text("Sector")), None);
        assert_eq!(resolve_year(&Cell::Empty), None);
        assert_eq!(resolve_year(&Cell::Bool(true)), None);
    }

    #[test]
    fn scan_keeps_in_range_years_in_column_order() {
        let header = vec![
            text("Model"),
            text("Scenario"),
            Cell::Empty,
            text("Region"),
            text("Flow"),
            text("Unit"),
            Cell::Empty,
            text("Sector"),
            text("2010"),
            text("2014"),
            Cell::Number(2020.0),
            text("notes"),
            text("2050"),
            text("2051"),
        ];
        let map = scan_year_columns(&header, YearRange::default(), 8);
        assert_eq!(map.years(), vec![2014, 2020, 2050]);
        assert_eq!(
            map.columns().iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![9, 10, 12]
        );
        assert_eq!(map.span(), Some((2014, 2050)));
    }

    #[test]
    fn scan_ignores_columns_before_start_offset() {
        let header = vec![Cell::Number(2020.0), text("x"), text("2021")];
        assert_eq!(scan_year_columns(&header, YearRange::default(), 1).years(), vec![2021]);
        assert_eq!(
            scan_year_columns(&header, YearRange::default(), 0).years(),
            vec![2020, 2021]
        );
    }

    #[test]
    fn scan_drops_repeated_years() {
        let header = vec![text("2020"), Cell::Number(2020.0), text("2021")];
        let map = scan_year_columns(&header, YearRange::default(), 0);
        assert_eq!(map.years(), vec![2020, 2021]);
        assert_eq!(map.columns()[0].index, 0);
    }

    #[test]
    fn scan_keeps_out_of_order_years_in_column_order() {
        let header = vec![Cell::Number(2030.0), text("2020"), Cell::Number(2025.0)];
        let map = scan_year_columns(&header, YearRange::default(), 0);
        assert_eq!(map.years(), vec![2030, 2020, 2025]);
        assert_eq!(
            map.columns().iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(map.span(), Some((2020, 2030)));
    }

    #[test]
    fn empty_header_yields_empty_map() {
        let map = scan_year_columns(&[], YearRange::default(), 8);
        assert!(map.is_empty());
        assert_eq!(map.span(), None);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert_eq!(
            YearRange::new(2050, 2014).validate(),
            Err(ExtractError::InvalidYearRange {
                min: 2050,
                max: 2014
            })
        );
        assert!(YearRange::default().validate().is_ok());
    }
}
