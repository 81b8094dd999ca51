use tracing::trace;

use crate::domain::TadError;
use crate::table::{Column, ColumnKind, Table};

/// Rows scanned when sizing columns; wide tables below stay responsive.
const WIDTH_SCAN_ROWS: usize = 200;

/// The only capabilities the core needs from a grid widget: set the shape
/// and header labels, write a cell, read a cell back (which may be unset).
pub trait GridSurface {
    fn set_shape(&mut self, nrows: usize, headers: &[String]);
    fn set_cell(&mut self, row: usize, col: usize, text: &str);
    fn cell(&self, row: usize, col: usize) -> Option<&str>;
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn header(&self, col: usize) -> &str;
}

/// In-memory grid backing the terminal view and the tests.
#[derive(Debug, Clone, Default)]
pub struct GridBuffer {
    headers: Vec<String>,
    cells: Vec<Vec<Option<String>>>,
}

impl GridBuffer {
    pub fn new() -> Self {
        GridBuffer::default()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Cell text for display; unset cells render empty.
    pub fn display(&self, row: usize, col: usize) -> &str {
        self.cell(row, col).unwrap_or("")
    }
}

impl GridSurface for GridBuffer {
    fn set_shape(&mut self, nrows: usize, headers: &[String]) {
        self.headers = headers.to_vec();
        self.cells = vec![vec![None; headers.len()]; nrows];
    }

    fn set_cell(&mut self, row: usize, col: usize, text: &str) {
        if let Some(r) = self.cells.get_mut(row)
            && let Some(c) = r.get_mut(col)
        {
            *c = Some(text.to_string());
        }
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col)?.as_deref()
    }

    fn nrows(&self) -> usize {
        self.cells.len()
    }

    fn ncols(&self) -> usize {
        self.headers.len()
    }

    fn header(&self, col: usize) -> &str {
        self.headers.get(col).map(|s| s.as_str()).unwrap_or("")
    }
}

/// Render the whole table into the grid: headers, shape, every cell's
/// stored text. Empty cells become empty strings.
pub fn to_grid(table: &Table, grid: &mut impl GridSurface) {
    grid.set_shape(table.nrows(), &table.column_names());
    for (cidx, column) in table.columns().iter().enumerate() {
        for (ridx, value) in column.data.iter().enumerate() {
            grid.set_cell(ridx, cidx, value);
        }
    }
    trace!("Rendered {}x{} grid", table.nrows(), table.ncols());
}

/// Read the whole grid back into the table. The grid is authoritative: the
/// rebuilt table takes the grid's shape and headers, unset cells become
/// empty. Surviving column positions keep their kind; new columns are
/// inferred. This is the single point where edits enter the table.
pub fn from_grid(grid: &impl GridSurface, table: &mut Table) -> Result<(), TadError> {
    let nrows = grid.nrows();
    let columns = (0..grid.ncols())
        .map(|cidx| {
            let data: Vec<String> = (0..nrows)
                .map(|ridx| grid.cell(ridx, cidx).unwrap_or("").to_string())
                .collect();
            let kind = match table.columns().get(cidx) {
                Some(existing) => existing.kind,
                None => ColumnKind::infer(&data),
            };
            Column {
                name: grid.header(cidx).to_string(),
                kind,
                data,
            }
        })
        .collect();
    table.replace_columns(columns)
}

/// Rendered width per column: header and cell content, clamped.
pub fn column_widths(grid: &impl GridSurface, max_width: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = (0..grid.ncols())
        .map(|c| grid.header(c).chars().count())
        .collect();
    for row in 0..grid.nrows().min(WIDTH_SCAN_ROWS) {
        for (col, w) in widths.iter_mut().enumerate() {
            if let Some(cell) = grid.cell(row, col) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let max_width = max_width.max(1);
    widths.iter().map(|w| (*w).clamp(1, max_width)).collect()
}
