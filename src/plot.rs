use crate::domain::TadError;
use crate::table::{Column, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Histogram,
    Scatter,
}

/// A validated chart request: kind, column names and the extracted numeric
/// series. Everything downstream of this is the renderer's business.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub kind: ChartKind,
    pub x_name: String,
    pub y_name: Option<String>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

/// Validate a histogram of `column`: the table must hold data and every
/// non-empty cell of the column must parse as a number.
pub fn histogram(table: &Table, column: &str) -> Result<PlotData, TadError> {
    if table.is_empty() {
        return Err(TadError::NoData);
    }
    let col = numeric_column(table, column)?;
    Ok(PlotData {
        kind: ChartKind::Histogram,
        x_name: col.name.clone(),
        y_name: None,
        xs: col.numeric_values(),
        ys: Vec::new(),
    })
}

/// Validate a scatter of `x` against `y`: at least two columns in the
/// table, both columns numeric. Rows where either cell is empty are
/// skipped pairwise.
pub fn scatter(table: &Table, x: &str, y: &str) -> Result<PlotData, TadError> {
    if table.is_empty() {
        return Err(TadError::NoData);
    }
    if table.ncols() < 2 {
        return Err(TadError::Precondition(
            "scatter plot requires at least two columns".into(),
        ));
    }
    let xcol = numeric_column(table, x)?;
    let ycol = numeric_column(table, y)?;

    let (xs, ys): (Vec<f64>, Vec<f64>) = xcol
        .data
        .iter()
        .zip(ycol.data.iter())
        .filter_map(|(a, b)| match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(xv), Ok(yv)) => Some((xv, yv)),
            _ => None,
        })
        .unzip();

    Ok(PlotData {
        kind: ChartKind::Scatter,
        x_name: xcol.name.clone(),
        y_name: Some(ycol.name.clone()),
        xs,
        ys,
    })
}

/// Judged from the current cell data, not the load-time kind, so a column
/// broken by a grid edit fails here rather than plotting garbage.
fn numeric_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column, TadError> {
    let col = table
        .column(name)
        .ok_or_else(|| TadError::UnknownColumn(name.to_string()))?;
    if !col.is_numeric_data() {
        return Err(TadError::NotNumeric(name.to_string()));
    }
    Ok(col)
}
