use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::TadError;

/// Field separator of a delimited file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Pipe,
}

impl Delimiter {
    pub fn char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Delimiter::Comma),
            "tsv" => Some(Delimiter::Tab),
            "psv" => Some(Delimiter::Pipe),
            _ => None,
        }
    }
}

/// Load-time classification of a column. A column is Numeric iff every
/// non-empty cell parses as a number. Grid edits do not re-run this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    fn from_dtype(dtype: &DataType) -> Self {
        if Table::is_numeric_type(dtype) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    /// Re-derive the kind from cell data.
    pub fn infer(data: &[String]) -> Self {
        let mut nonempty = data.iter().filter(|c| !c.is_empty()).peekable();
        if nonempty.peek().is_none() {
            return ColumnKind::Text;
        }
        if nonempty.all(|c| c.parse::<f64>().is_ok()) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub data: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: Vec<String>) -> Self {
        let kind = ColumnKind::infer(&data);
        Column {
            name: name.into(),
            kind,
            data,
        }
    }

    /// True iff every non-empty cell currently parses as a number. This can
    /// diverge from `kind` once a grid edit has rewritten a cell.
    pub fn is_numeric_data(&self) -> bool {
        ColumnKind::infer(&self.data) == ColumnKind::Numeric
    }

    /// All parseable cell values, in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.data
            .iter()
            .filter_map(|c| c.parse::<f64>().ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn as_string(&self) -> String {
        format!(
            "\"{}\", {:?}, # rows {}",
            self.name,
            self.kind,
            self.data.len()
        )
    }
}

/// The authoritative in-memory dataset: ordered named columns of textual
/// cells, all of equal length, plus the delimiter of the backing file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    delimiter: Delimiter,
}

impl Table {
    pub fn empty() -> Self {
        Table::default()
    }

    /// Build a table, checking the shape invariants: unique column names and
    /// one value per row in every column.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TadError> {
        let mut seen = HashSet::new();
        for c in columns.iter() {
            if !seen.insert(c.name.as_str()) {
                return Err(TadError::Parse(format!("duplicate column \"{}\"", c.name)));
            }
        }
        if let Some(first) = columns.first() {
            let nrows = first.data.len();
            if columns.iter().any(|c| c.data.len() != nrows) {
                return Err(TadError::Parse("columns differ in length".into()));
            }
        }
        Ok(Table {
            columns,
            delimiter: Delimiter::Comma,
        })
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn set_delimiter(&mut self, delimiter: Delimiter) {
        self.delimiter = delimiter;
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Load a delimited file. The first row is the header; per-column type
    /// inference runs once over all rows. Rows whose field count differs
    /// from the header are rejected by the reader.
    pub fn load(path: &Path) -> Result<Self, TadError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TadError::FileNotFound,
            ErrorKind::PermissionDenied => TadError::PermissionDenied,
            _ => TadError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TadError::Parse("not a file".into()));
        }

        let delimiter = path
            .extension()
            .and_then(|s| s.to_str())
            .and_then(Delimiter::from_extension)
            .ok_or(TadError::UnknownFileType)?;

        let start_time = Instant::now();
        let frame = LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .with_separator(delimiter.char() as u8)
            .finish()?;
        let df = frame.collect()?;

        // Each column is materialized as strings in its own thread.
        let c_: Result<Vec<Column>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        let columns = c_?;

        info!(
            "Loaded {:?} in {}ms",
            path,
            start_time.elapsed().as_millis()
        );
        for c in columns.iter() {
            debug!("Column: {}", c.as_string());
        }

        Ok(Table { columns, delimiter })
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
        let original_dtype = df.column(col_name)?.dtype().clone();

        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let mut data = Vec::with_capacity(series.len());
        for value in series.into_iter() {
            data.push(value.unwrap_or("").to_string());
        }

        Ok(Column {
            name: col_name.to_string(),
            kind: ColumnKind::from_dtype(&original_dtype),
            data,
        })
    }

    /// Write header then rows with the table's own delimiter. Fields that
    /// contain the delimiter, a quote or a newline are quoted, inner quotes
    /// doubled, so a reload reproduces this table exactly.
    pub fn save(&self, path: &Path) -> Result<(), TadError> {
        let start_time = Instant::now();
        let series: Vec<_> = self
            .columns
            .iter()
            .map(|c| {
                let vals: Vec<Option<&str>> = c
                    .data
                    .iter()
                    .map(|v| if v.is_empty() { None } else { Some(v.as_str()) })
                    .collect();
                Series::new(c.name.as_str().into(), vals).into_column()
            })
            .collect();
        let mut df = DataFrame::new(series)?;

        let mut file = fs::File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(self.delimiter.char() as u8)
            .with_quote_style(QuoteStyle::Necessary)
            .finish(&mut df)?;

        info!(
            "Wrote {} rows to {:?} in {}ms",
            self.nrows(),
            path,
            start_time.elapsed().as_millis()
        );
        Ok(())
    }

    /// True iff nothing is loaded: zero rows and/or zero columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.columns[0].data.is_empty()
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.columns
            .get(col)
            .and_then(|c| c.data.get(row))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub(crate) fn replace_columns(&mut self, columns: Vec<Column>) -> Result<(), TadError> {
        let delimiter = self.delimiter;
        *self = Table::from_columns(columns)?.with_delimiter(delimiter);
        Ok(())
    }

    /// A new table with rows reordered by the given column. Numeric columns
    /// compare parsed values; cells that no longer parse order after the
    /// ones that do; text columns compare as strings.
    pub fn sorted(&self, column: usize, ascending: bool) -> Table {
        let Some(key) = self.columns.get(column) else {
            return self.clone();
        };

        let mut order: Vec<usize> = (0..self.nrows()).collect();
        if key.kind == ColumnKind::Numeric {
            order.sort_by(|&i, &j| {
                let a = &key.data[i];
                let b = &key.data[j];
                let ord = match (a.parse::<f64>(), b.parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => a.cmp(b),
                };
                if ascending { ord } else { ord.reverse() }
            });
        } else {
            order.sort_by(|&i, &j| {
                let ord = key.data[i].cmp(&key.data[j]);
                if ascending { ord } else { ord.reverse() }
            });
        }

        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: c.kind,
                data: order.iter().map(|&i| c.data[i].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            delimiter: self.delimiter,
        }
    }

    fn is_numeric_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(vals: &[&str]) -> Vec<String> {
        vals.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("name", strings(&["alice", "bob", "carol"])),
            Column::new("score", strings(&["1.5", "", "10"])),
        ])
        .unwrap()
    }

    #[test]
    fn infer_numeric_ignores_empty_cells() {
        assert_eq!(
            ColumnKind::infer(&strings(&["1", "", "2.5"])),
            ColumnKind::Numeric
        );
        assert_eq!(
            ColumnKind::infer(&strings(&["1", "x", "2.5"])),
            ColumnKind::Text
        );
        // A column of only empty cells carries no numeric evidence.
        assert_eq!(ColumnKind::infer(&strings(&["", ""])), ColumnKind::Text);
    }

    #[test]
    fn from_columns_rejects_bad_shapes() {
        let dup = Table::from_columns(vec![
            Column::new("a", strings(&["1"])),
            Column::new("a", strings(&["2"])),
        ]);
        assert!(matches!(dup, Err(TadError::Parse(_))));

        let ragged = Table::from_columns(vec![
            Column::new("a", strings(&["1"])),
            Column::new("b", strings(&["2", "3"])),
        ]);
        assert!(matches!(ragged, Err(TadError::Parse(_))));
    }

    #[test]
    fn cell_and_shape_accessors() {
        let t = sample();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.ncols(), 2);
        assert_eq!(t.cell(0, 0), "alice");
        assert_eq!(t.cell(1, 1), "");
        assert_eq!(t.cell(9, 9), "");
        assert_eq!(t.column_index("score"), Some(1));
        assert_eq!(t.column_index("missing"), None);
        assert!(!t.is_empty());
        assert!(Table::empty().is_empty());
    }

    #[test]
    fn header_only_table_is_empty() {
        let t = Table::from_columns(vec![Column::new("a", vec![])]).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.ncols(), 1);
    }

    #[test]
    fn delimiter_from_extension() {
        assert_eq!(Delimiter::from_extension("csv"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::from_extension("CSV"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::from_extension("tsv"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::from_extension("psv"), Some(Delimiter::Pipe));
        assert_eq!(Delimiter::from_extension("parquet"), None);
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert!(matches!(
            Table::load(&path),
            Err(TadError::UnknownFileType)
        ));
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            Table::load(Path::new("/no/such/file.csv")),
            Err(TadError::FileNotFound)
        ));
    }

    #[test]
    fn load_infers_column_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "city,pop\noslo,700000\nbergen,290000\n").unwrap();
        let t = Table::load(&path).unwrap();
        assert_eq!(t.columns()[0].kind, ColumnKind::Text);
        assert_eq!(t.columns()[1].kind, ColumnKind::Numeric);
    }

    #[test]
    fn load_rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n4,5,6,7\n").unwrap();
        assert!(Table::load(&path).is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let t = Table::from_columns(vec![
            Column::new("name", strings(&["alice", "bob"])),
            Column::new("score", strings(&["1.5", "2.0"])),
        ])
        .unwrap();
        t.save(&path).unwrap();
        let back = Table::load(&path).unwrap();
        assert_eq!(back.column_names(), t.column_names());
        assert_eq!(back.nrows(), t.nrows());
        for r in 0..t.nrows() {
            for c in 0..t.ncols() {
                assert_eq!(back.cell(r, c), t.cell(r, c));
            }
        }
    }

    #[test]
    fn round_trip_keeps_special_characters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.csv");
        let tricky = "he said \"hi\", then\nleft";
        let t = Table::from_columns(vec![
            Column::new("note", strings(&[tricky, "plain"])),
            Column::new("tag", strings(&["x", "y"])),
        ])
        .unwrap();
        t.save(&path).unwrap();
        let back = Table::load(&path).unwrap();
        assert_eq!(back.cell(0, 0), tricky);
        assert_eq!(back.cell(1, 0), "plain");
    }

    #[test]
    fn round_trip_keeps_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaps.csv");
        let t = Table::from_columns(vec![
            Column::new("a", strings(&["1", ""])),
            Column::new("b", strings(&["", "x"])),
        ])
        .unwrap();
        t.save(&path).unwrap();
        let back = Table::load(&path).unwrap();
        assert_eq!(back.cell(0, 1), "");
        assert_eq!(back.cell(1, 0), "");
        assert_eq!(back.cell(1, 1), "x");
    }

    #[test]
    fn sorted_numeric_orders_by_value() {
        let t = Table::from_columns(vec![Column::new(
            "n",
            strings(&["10", "9", "100"]),
        )])
        .unwrap();
        let asc = t.sorted(0, true);
        assert_eq!(asc.columns()[0].data, strings(&["9", "10", "100"]));
        let desc = t.sorted(0, false);
        assert_eq!(desc.columns()[0].data, strings(&["100", "10", "9"]));
    }

    #[test]
    fn sorted_text_orders_lexicographically() {
        let t = Table::from_columns(vec![
            Column::new("w", strings(&["pear", "apple", "plum"])),
            Column::new("n", strings(&["1", "2", "3"])),
        ])
        .unwrap();
        let asc = t.sorted(0, true);
        assert_eq!(asc.columns()[0].data, strings(&["apple", "pear", "plum"]));
        // Sibling columns follow the reordering.
        assert_eq!(asc.columns()[1].data, strings(&["2", "1", "3"]));
    }

    #[test]
    fn sorted_numeric_puts_unparseable_cells_last() {
        let mut t = Table::from_columns(vec![Column::new("n", strings(&["3", "1", "2"]))]).unwrap();
        // Simulate a grid edit that broke the column.
        t.columns[0].data[1] = "oops".to_string();
        let asc = t.sorted(0, true);
        assert_eq!(asc.columns()[0].data, strings(&["2", "3", "oops"]));
    }
}
