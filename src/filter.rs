use tracing::debug;

use crate::domain::TadError;
use crate::table::{Column, Table};

/// Keep the rows whose value in `column` contains `pattern` as a
/// case-sensitive substring. The empty pattern matches every row. Row
/// order and all columns are preserved; the input table is untouched.
pub fn filter(table: &Table, column: &str, pattern: &str) -> Result<Table, TadError> {
    if table.is_empty() {
        return Err(TadError::NoData);
    }
    let cidx = table
        .column_index(column)
        .ok_or_else(|| TadError::UnknownColumn(column.to_string()))?;

    let matches: Vec<usize> = table.columns()[cidx]
        .data
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.contains(pattern))
        .map(|(ridx, _)| ridx)
        .collect();
    debug!(
        "Filter \"{}\" on \"{}\": {} of {} rows",
        pattern,
        column,
        matches.len(),
        table.nrows()
    );

    let columns = table
        .columns()
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            kind: c.kind,
            data: matches.iter().map(|&ridx| c.data[ridx].clone()).collect(),
        })
        .collect();
    Ok(Table::from_columns(columns)?.with_delimiter(table.delimiter()))
}
