use tracing::debug;

use crate::domain::TadError;
use crate::table::Table;

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (N-1); NaN below two samples.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Statistics for every wholly numeric column, in table column order.
/// A column participates iff all its non-empty cells parse as numbers and
/// at least one does; other columns are skipped.
pub fn summarize(table: &Table) -> Result<Vec<ColumnSummary>, TadError> {
    if table.is_empty() {
        return Err(TadError::NoData);
    }

    let mut summaries = Vec::new();
    for column in table.columns() {
        if !column.is_numeric_data() {
            debug!("Skipping non numeric column \"{}\"", column.name);
            continue;
        }
        let mut values = column.numeric_values();
        if values.is_empty() {
            continue;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count < 2 {
            f64::NAN
        } else {
            let ss = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        };

        summaries.push(ColumnSummary {
            name: column.name.clone(),
            count,
            mean,
            std,
            min: values[0],
            q25: percentile(&values, 25.0),
            median: percentile(&values, 50.0),
            q75: percentile(&values, 75.0),
            max: values[count - 1],
        });
    }
    Ok(summaries)
}

/// Order statistic with linear interpolation between neighbours.
/// `sorted` must be non-empty and ascending.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

const STAT_LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// One aligned text block: statistic labels down the side, one column of
/// numbers per summarized table column.
pub fn render(summaries: &[ColumnSummary]) -> String {
    if summaries.is_empty() {
        return "no numeric columns".to_string();
    }

    let cells: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.count.to_string(),
                fmt_stat(s.mean),
                fmt_stat(s.std),
                fmt_stat(s.min),
                fmt_stat(s.q25),
                fmt_stat(s.median),
                fmt_stat(s.q75),
                fmt_stat(s.max),
            ]
        })
        .collect();

    let widths: Vec<usize> = summaries
        .iter()
        .zip(cells.iter())
        .map(|(s, col)| {
            col.iter()
                .map(|v| v.chars().count())
                .max()
                .unwrap_or(0)
                .max(s.name.chars().count())
        })
        .collect();
    let label_width = STAT_LABELS.iter().map(|l| l.len()).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(&" ".repeat(label_width));
    for (s, &w) in summaries.iter().zip(widths.iter()) {
        out.push_str(&format!("  {:>w$}", s.name));
    }
    out.push('\n');
    for (ridx, label) in STAT_LABELS.iter().enumerate() {
        out.push_str(&format!("{label:<label_width$}"));
        for (col, &w) in cells.iter().zip(widths.iter()) {
            out.push_str(&format!("  {:>w$}", col[ridx]));
        }
        out.push('\n');
    }
    out
}

/// Stable decimal rendering: six decimals, trailing zeros trimmed.
fn fmt_stat(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn strings(vals: &[&str]) -> Vec<String> {
        vals.iter().map(|s| s.to_string()).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn one_two_three_four() {
        let t = Table::from_columns(vec![Column::new("n", strings(&["1", "2", "3", "4"]))])
            .unwrap();
        let s = &summarize(&t).unwrap()[0];
        assert_eq!(s.count, 4);
        assert!(close(s.mean, 2.5));
        assert!(close(s.min, 1.0));
        assert!(close(s.max, 4.0));
        assert!(close(s.median, 2.5));
        assert!(close(s.q25, 1.75));
        assert!(close(s.q75, 3.25));
        // Sample std of 1..4 is sqrt(5/3).
        assert!(close(s.std, (5.0_f64 / 3.0).sqrt()));
    }

    #[test]
    fn empty_table_is_an_error() {
        assert!(matches!(summarize(&Table::empty()), Err(TadError::NoData)));
    }

    #[test]
    fn non_numeric_columns_are_skipped() {
        let t = Table::from_columns(vec![
            Column::new("word", strings(&["a", "b"])),
            Column::new("n", strings(&["1", "2"])),
        ])
        .unwrap();
        let s = summarize(&t).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].name, "n");
    }

    #[test]
    fn empty_cells_do_not_count() {
        let t = Table::from_columns(vec![Column::new("n", strings(&["1", "", "3"]))]).unwrap();
        let s = &summarize(&t).unwrap()[0];
        assert_eq!(s.count, 2);
        assert!(close(s.mean, 2.0));
    }

    #[test]
    fn std_is_nan_below_two_samples() {
        let t = Table::from_columns(vec![Column::new("n", strings(&["5", ""]))]).unwrap();
        let s = &summarize(&t).unwrap()[0];
        assert_eq!(s.count, 1);
        assert!(s.std.is_nan());
        assert!(close(s.min, 5.0));
    }

    #[test]
    fn column_order_follows_the_table() {
        let t = Table::from_columns(vec![
            Column::new("b", strings(&["1"])),
            Column::new("a", strings(&["2"])),
        ])
        .unwrap();
        let names: Vec<_> = summarize(&t).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!(close(percentile(&v, 0.0), 1.0));
        assert!(close(percentile(&v, 100.0), 4.0));
        assert!(close(percentile(&v, 50.0), 2.5));
        assert!(close(percentile(&v, 25.0), 1.75));
        assert!(close(percentile(&v, 75.0), 3.25));
        assert!(close(percentile(&[7.0], 50.0), 7.0));
    }

    #[test]
    fn render_aligns_columns() {
        let t = Table::from_columns(vec![
            Column::new("n", strings(&["1", "2", "3", "4"])),
            Column::new("m", strings(&["10", "20", "30", "40"])),
        ])
        .unwrap();
        let block = render(&summarize(&t).unwrap());
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].contains('n') && lines[0].contains('m'));
        assert!(lines[1].starts_with("count"));
        assert!(lines[2].contains("2.5"));
        // Every row has the same rendered width.
        let w = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == w));
    }

    #[test]
    fn render_without_numeric_columns() {
        assert_eq!(render(&[]), "no numeric columns");
    }

    #[test]
    fn fmt_stat_trims_trailing_zeros() {
        assert_eq!(fmt_stat(2.5), "2.5");
        assert_eq!(fmt_stat(2.0), "2");
        assert_eq!(fmt_stat(f64::NAN), "NaN");
        assert_eq!(fmt_stat(1.2345678), "1.234568");
    }
}
