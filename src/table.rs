use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Plain-text table: header, dashed separator, rows. Columns whose every
/// non-empty cell is numeric are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    let widths: Vec<usize> = widths.into_iter().map(|w| w.max(3)).collect();
    let aligns: Vec<Align> = (0..column_count)
        .map(|idx| column_alignment(rows, idx))
        .collect();

    let mut output = String::new();
    let header_aligns = vec![Align::Left; column_count];
    let _ = writeln!(output, "{}", format_row(headers, &widths, &header_aligns));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &header_aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn column_alignment(rows: &[Vec<String>], idx: usize) -> Align {
    let mut cells = rows
        .iter()
        .filter_map(|row| row.get(idx))
        .filter(|cell| !cell.is_empty())
        .peekable();
    if cells.peek().is_none() {
        return Align::Left;
    }
    if cells.all(|cell| cell.parse::<f64>().is_ok()) {
        Align::Right
    } else {
        Align::Left
    }
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .zip(aligns)
        .map(|((value, width), align)| {
            let cell = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&cell)));
            match align {
                Align::Left => format!("{cell}{padding}"),
                Align::Right => format!("{padding}{cell}"),
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> String {
    value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn numeric_columns_are_right_aligned() {
        let rendered = render_table(
            &strings(&["label", "rows"]),
            &[strings(&["Cement", "7"]), strings(&["Iron and steel", "12"])],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "label           rows");
        assert_eq!(lines[1], "--------------  ----");
        assert_eq!(lines[2], "Cement             7");
        assert_eq!(lines[3], "Iron and steel    12");
    }

    #[test]
    fn control_characters_are_flattened() {
        let rendered = render_table(&strings(&["v"]), &[strings(&["a\tb\nc"])]);
        assert!(rendered.contains("a b c"));
    }
}
