//! Table-to-markdown rule shared by all three extractors (SPEC_FULL §4.1).

/// Convert a grid of cell text into the shared markdown-table representation.
///
/// `grid[0]` is the header row; every other row is data. Rows shorter than
/// the header are right-padded with empty cells; longer rows are truncated.
/// Internal newlines in a cell are replaced with a single space.
///
/// Returns `(markdown, data_row_count, col_count)`.
#[must_use]
pub fn rows_to_markdown(grid: &[Vec<String>]) -> (String, usize, usize) {
    if grid.is_empty() {
        return (String::new(), 0, 0);
    }

    let cols = grid[0].len();
    let clean = |cell: &str| cell.replace(['\n', '\r'], " ").trim().to_string();

    let normalize_row = |row: &[String]| -> Vec<String> {
        let mut cells: Vec<String> = row.iter().map(|c| clean(c)).collect();
        cells.resize(cols, String::new());
        cells.truncate(cols);
        cells
    };

    let header = normalize_row(&grid[0]);
    let mut lines = Vec::with_capacity(grid.len() + 1);
    lines.push(render_row(&header));
    lines.push(render_separator(cols));

    for row in &grid[1..] {
        lines.push(render_row(&normalize_row(row)));
    }

    (lines.join("\n"), grid.len().saturating_sub(1), cols)
}

fn render_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

fn render_separator(cols: usize) -> String {
    format!("| {} |", vec!["---"; cols].join(" | "))
}
