use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Style, Stylize},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row,
        Table as TableWidget,
    },
};

use crate::domain::{Modus, TadConfig};
use crate::grid::{self, GridSurface};
use crate::model::Model;
use crate::plot::{ChartKind, PlotData};
use crate::table::ColumnKind;

pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;

const HISTOGRAM_BINS: usize = 10;

pub struct TableUI {
    config: TadConfig,
}

impl TableUI {
    pub fn new(config: &TadConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let area = frame.area();
        let [main_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(area);

        match model.modus() {
            Modus::PLOT => self.draw_plot(model, frame, main_area),
            _ => self.draw_table(model, frame, main_area),
        }
        if model.modus() == Modus::POPUP {
            self.draw_popup(model, frame, area);
        }
        self.draw_statusline(model, frame, status_area);
    }

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let data = model.grid();
        if data.ncols() == 0 {
            let hint = Paragraph::new("No file loaded. Press o to open, ? for help.")
                .alignment(Alignment::Center);
            frame.render_widget(hint, area);
            return;
        }

        let widths = grid::column_widths(data, self.config.max_column_width);
        let (curser_row, curser_column) = model.curser();
        let (offset_row, offset_column) = model.offsets();

        // Columns from the offset until the frame is full; always at least one.
        let mut visible = Vec::new();
        let mut used = 0;
        for (idx, w) in widths.iter().enumerate().skip(offset_column) {
            if used + w + 1 > area.width as usize && !visible.is_empty() {
                break;
            }
            visible.push(idx);
            used += w + 1;
        }

        let header = Row::new(visible.iter().map(|&c| {
            let style = if c == curser_column {
                Style::new().bold().reversed()
            } else {
                Style::new().bold()
            };
            Cell::from(truncate(data.header(c), widths[c])).style(style)
        }));

        let height = area.height.saturating_sub(TABLE_HEADER_HEIGHT as u16) as usize;
        let end = (offset_row + height).min(data.nrows());
        let rows = (offset_row..end).map(|r| {
            Row::new(visible.iter().map(|&c| {
                let numeric = model
                    .table()
                    .columns()
                    .get(c)
                    .map(|col| col.kind == ColumnKind::Numeric)
                    .unwrap_or(false);
                let text = truncate(&sanitize(data.display(r, c)), widths[c]);
                let mut line = Line::from(text);
                if numeric {
                    line = line.alignment(Alignment::Right);
                }
                let mut cell = Cell::from(line);
                if r == curser_row && c == curser_column {
                    cell = cell.style(Style::new().reversed());
                }
                cell
            }))
        });

        let constraints = visible.iter().map(|&c| Constraint::Length(widths[c] as u16));
        let table = TableWidget::new(rows, constraints)
            .header(header)
            .column_spacing(1);
        frame.render_widget(table, area);
    }

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if model.modus() == Modus::CMDINPUT
            && let Some((mode, input)) = model.cmd_state()
        {
            frame.render_widget(prompt_line(mode.title(), &input.input, input.curser_pos), area);
            return;
        }

        let table = model.table();
        let mut right = format!("{}x{}", table.nrows(), table.ncols());
        if let Some(path) = model.path() {
            right.push_str(&format!("  {}", path.display()));
        }
        if model.dirty() {
            right.push_str(" [+]");
        }
        right.push(' ');

        let [left_area, right_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(right.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(
            Paragraph::new(format!(" {}", model.status_message())),
            left_area,
        );
        frame.render_widget(Paragraph::new(right).dim(), right_area);
    }

    fn draw_popup(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(80, 80, area);
        let block = Block::bordered()
            .title(" tad ")
            .title_bottom(Line::from(" Esc to close ").centered());
        frame.render_widget(Clear, popup_area);
        frame.render_widget(Paragraph::new(model.popup_text()).block(block), popup_area);
    }

    fn draw_plot(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(plot) = model.plot() else {
            return;
        };
        match plot.kind {
            ChartKind::Histogram => self.draw_histogram(plot, frame, area),
            ChartKind::Scatter => self.draw_scatter(plot, frame, area),
        }
    }

    fn draw_histogram(&self, plot: &PlotData, frame: &mut Frame, area: Rect) {
        let bars = bin_values(&plot.xs, HISTOGRAM_BINS);
        let data: Vec<(&str, u64)> = bars.iter().map(|(l, c)| (l.as_str(), *c)).collect();
        let bar_width = ((area.width.saturating_sub(2) as usize / HISTOGRAM_BINS.max(1))
            .saturating_sub(1))
        .clamp(3, 12) as u16;
        let chart = BarChart::default()
            .block(plot_block(&format!(" histogram: {} ", plot.x_name)))
            .bar_width(bar_width)
            .bar_gap(1)
            .data(data.as_slice());
        frame.render_widget(chart, area);
    }

    fn draw_scatter(&self, plot: &PlotData, frame: &mut Frame, area: Rect) {
        let points: Vec<(f64, f64)> = plot
            .xs
            .iter()
            .zip(plot.ys.iter())
            .map(|(&x, &y)| (x, y))
            .collect();
        let (xmin, xmax) = bounds(&plot.xs);
        let (ymin, ymax) = bounds(&plot.ys);
        let y_name = plot.y_name.clone().unwrap_or_default();

        let datasets = vec![
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .style(Style::new().cyan())
                .data(&points),
        ];
        let chart = Chart::new(datasets)
            .block(plot_block(&format!(
                " scatter: {} vs {} ",
                plot.x_name, y_name
            )))
            .x_axis(
                Axis::default()
                    .title(plot.x_name.clone())
                    .bounds([xmin, xmax])
                    .labels([format!("{xmin:.2}"), format!("{xmax:.2}")]),
            )
            .y_axis(
                Axis::default()
                    .title(y_name)
                    .bounds([ymin, ymax])
                    .labels([format!("{ymin:.2}"), format!("{ymax:.2}")]),
            );
        frame.render_widget(chart, area);
    }
}

fn plot_block(title: &str) -> Block<'static> {
    Block::bordered()
        .title(title.to_string())
        .title_bottom(Line::from(" Esc to close ").centered())
}

fn prompt_line(title: &str, input: &str, curser_pos: usize) -> Paragraph<'static> {
    let chars: Vec<char> = input.chars().collect();
    let before: String = chars.iter().take(curser_pos).collect();
    let at: String = chars
        .get(curser_pos)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(curser_pos + 1).collect();
    Paragraph::new(Line::from(vec![
        Span::styled(format!(" {title}> "), Style::new().bold()),
        Span::raw(before),
        Span::styled(at, Style::new().reversed()),
        Span::raw(after),
    ]))
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, vert, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);
    let [_, horiz, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vert);
    horiz
}

/// Cell text is one line on screen.
fn sanitize(text: &str) -> String {
    text.replace("\r\n", " ↵ ").replace('\n', " ↵ ")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Group values into equal-width bins labeled by their lower edge.
fn bin_values(values: &[f64], nbins: usize) -> Vec<(String, u64)> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![(fmt_edge(min), values.len() as u64)];
    }

    let width = (max - min) / nbins as f64;
    let mut counts = vec![0u64; nbins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(nbins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (fmt_edge(min + i as f64 * width), c))
        .collect()
}

fn fmt_edge(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e9 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}
