use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use tracing::{debug, info, trace};

use crate::domain::{CMDMode, HELP_TEXT, Message, Modus, Status, TadConfig, TadError};
use crate::filter;
use crate::grid::{self, GridBuffer, GridSurface};
use crate::plot::{self, PlotData};
use crate::prompt::{Prompt, PromptResult};
use crate::summary;
use crate::table::{Delimiter, Table};
use crate::ui::{STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};

#[derive(Debug, Clone, Default)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_size(width: usize, height: usize) -> Self {
        let table_height = height.saturating_sub(TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT);
        let layout = UILayout {
            width,
            height,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: TadConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: Table,
    grid: GridBuffer,
    path: Option<PathBuf>,
    dirty: bool,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    layout: UILayout,
    popup_text: String,
    plot: Option<PlotData>,
    input: Prompt,
    cmd_mode: Option<CMDMode>,
    last_input: PromptResult,
    clipboard: Option<Clipboard>,
    status_message: String,
}

impl Model {
    pub fn init(config: &TadConfig, ui_width: usize, ui_height: usize) -> Self {
        Self {
            config: config.clone(),
            status: Status::EMPTY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            table: Table::empty(),
            grid: GridBuffer::new(),
            path: None,
            dirty: false,
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            layout: UILayout::from_size(ui_width, ui_height),
            popup_text: String::new(),
            plot: None,
            input: Prompt::default(),
            cmd_mode: None,
            last_input: PromptResult::default(),
            clipboard: Clipboard::new().ok(),
            status_message: "Started tad! Press ? for help.".to_string(),
        }
    }

    /// Make the given table the active one, rendering it into the grid.
    pub fn attach(&mut self, table: Table, path: Option<PathBuf>) {
        let nrows = table.nrows();
        let ncols = table.ncols();
        self.table = table;
        self.path = path;
        self.rebuild_grid();
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.status = Status::READY;
        self.set_status_message(format!("Loaded {nrows} rows, {ncols} columns"));
    }

    // ------------------------- UI accessors ------------------------------ //

    pub fn grid(&self) -> &GridBuffer {
        &self.grid
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn layout(&self) -> &UILayout {
        &self.layout
    }

    pub fn curser(&self) -> (usize, usize) {
        (self.curser_row, self.curser_column)
    }

    pub fn offsets(&self) -> (usize, usize) {
        (self.offset_row, self.offset_column)
    }

    pub fn max_column_width(&self) -> usize {
        self.config.max_column_width
    }

    pub fn popup_text(&self) -> &str {
        &self.popup_text
    }

    pub fn plot(&self) -> Option<&PlotData> {
        self.plot.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn cmd_state(&self) -> Option<(CMDMode, &PromptResult)> {
        self.cmd_mode.map(|m| (m, &self.last_input))
    }

    /// While the command line is active, keys bypass the keymap.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn report(&mut self, err: TadError) {
        debug!("Operation failed: {err:?}");
        self.set_status_message(format!("Error: {err}"));
    }

    // --------------------------- update loop ------------------------------ //

    pub fn update(&mut self, message: Message) -> Result<(), TadError> {
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageDown => self.move_selection_down(self.layout.table_height.max(1)),
                Message::MovePageUp => self.move_selection_up(self.layout.table_height.max(1)),
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.grid.nrows().saturating_sub(1)),
                Message::MoveToFirstColumn => self.select_column(0),
                Message::MoveToLastColumn => {
                    self.select_column(self.grid.ncols().saturating_sub(1))
                }
                Message::EditCell => self.start_edit_cell(),
                Message::OpenFile => self.enter_cmd_mode(CMDMode::OpenFile, ""),
                Message::SaveFile => self.start_save(),
                Message::Filter => self.start_filter(),
                Message::Summary => self.show_summary(),
                Message::Histogram => self.show_histogram(),
                Message::Scatter => self.start_scatter(),
                Message::SortAscending => self.sort_current_column(true),
                Message::SortDescending => self.sort_current_column(false),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_popup(HELP_TEXT.to_string()),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit => {}
                Message::RawKey(_) => {}
            },
            Modus::PLOT => match message {
                Message::Quit => self.quit(),
                Message::Exit => {
                    self.plot = None;
                    self.modus = Modus::TABLE;
                }
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Help => self.show_popup(HELP_TEXT.to_string()),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Exit => {
                    trace!("Close popup ...");
                    self.modus = self.previous_modus;
                    self.previous_modus = Modus::POPUP;
                    self.popup_text.clear();
                }
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => match message {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // ----------------------- command line flow ---------------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode, prefill: &str) {
        trace!("Entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.prefill(prefill);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        let Some(mode) = self.cmd_mode.take() else {
            return;
        };

        // A canceled prompt never acts; the cancel sentinel is a no-op.
        if self.last_input.canceled {
            trace!("Prompt canceled");
            return;
        }

        let cmd_input = self.last_input.input.clone();
        match mode {
            CMDMode::EditCell => self.apply_edit_cell(&cmd_input),
            CMDMode::OpenFile => self.open_file(&cmd_input),
            CMDMode::SaveFile => self.save_file(&cmd_input),
            CMDMode::FilterPattern => self.apply_filter(&cmd_input),
            CMDMode::ScatterColumn => self.show_scatter(&cmd_input),
        }
    }

    // --------------------------- operations ------------------------------- //

    fn has_data(&mut self) -> bool {
        if self.table.is_empty() {
            self.report(TadError::NoData);
            return false;
        }
        true
    }

    fn current_column_name(&self) -> String {
        self.table
            .columns()
            .get(self.curser_column)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn expand_path(&mut self, raw: &str) -> Option<PathBuf> {
        match shellexpand::full(raw) {
            Ok(expanded) => Some(PathBuf::from(expanded.into_owned())),
            Err(e) => {
                self.report(TadError::Parse(e.to_string()));
                None
            }
        }
    }

    fn start_edit_cell(&mut self) {
        if !self.has_data() {
            return;
        }
        let current = self.grid.display(self.curser_row, self.curser_column).to_string();
        self.enter_cmd_mode(CMDMode::EditCell, &current);
    }

    fn apply_edit_cell(&mut self, text: &str) {
        self.grid
            .set_cell(self.curser_row, self.curser_column, text);
        self.dirty = true;
        self.set_status_message("Cell updated (write file to commit)");
    }

    fn open_file(&mut self, raw: &str) {
        let Some(path) = self.expand_path(raw) else {
            return;
        };
        match Table::load(&path) {
            Ok(table) => self.attach(table, Some(path)),
            Err(e) => self.report(e),
        }
    }

    fn start_save(&mut self) {
        if self.table.ncols() == 0 {
            self.report(TadError::NoData);
            return;
        }
        let prefill = self
            .path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.enter_cmd_mode(CMDMode::SaveFile, &prefill);
    }

    /// Commit the grid into the table, then write the table out.
    fn save_file(&mut self, raw: &str) {
        let Some(path) = self.expand_path(raw) else {
            return;
        };
        if let Err(e) = grid::from_grid(&self.grid, &mut self.table) {
            self.report(e);
            return;
        }
        if let Some(delimiter) = path
            .extension()
            .and_then(|s| s.to_str())
            .and_then(Delimiter::from_extension)
        {
            self.table.set_delimiter(delimiter);
        }
        match self.table.save(&path) {
            Ok(()) => {
                let nrows = self.table.nrows();
                self.dirty = false;
                self.path = Some(path);
                self.set_status_message(format!("Wrote {nrows} rows"));
            }
            Err(e) => self.report(e),
        }
    }

    fn start_filter(&mut self) {
        if !self.has_data() {
            return;
        }
        self.enter_cmd_mode(CMDMode::FilterPattern, "");
    }

    fn apply_filter(&mut self, pattern: &str) {
        let column = self.current_column_name();
        match filter::filter(&self.table, &column, pattern) {
            Ok(filtered) => {
                let nrows = filtered.nrows();
                info!("Filter \"{pattern}\" on \"{column}\" kept {nrows} rows");
                self.table = filtered;
                self.rebuild_grid();
                self.select_row(0);
                self.set_status_message(format!("Filter \"{pattern}\" kept {nrows} rows"));
            }
            Err(e) => self.report(e),
        }
    }

    fn show_summary(&mut self) {
        match summary::summarize(&self.table) {
            Ok(summaries) => {
                let block = summary::render(&summaries);
                self.show_popup(block);
            }
            Err(e) => self.report(e),
        }
    }

    fn show_histogram(&mut self) {
        let column = self.current_column_name();
        match plot::histogram(&self.table, &column) {
            Ok(data) => {
                self.plot = Some(data);
                self.modus = Modus::PLOT;
            }
            Err(e) => self.report(e),
        }
    }

    fn start_scatter(&mut self) {
        if !self.has_data() {
            return;
        }
        self.enter_cmd_mode(CMDMode::ScatterColumn, "");
    }

    fn show_scatter(&mut self, y_column: &str) {
        let x_column = self.current_column_name();
        match plot::scatter(&self.table, &x_column, y_column) {
            Ok(data) => {
                self.plot = Some(data);
                self.modus = Modus::PLOT;
            }
            Err(e) => self.report(e),
        }
    }

    fn sort_current_column(&mut self, ascending: bool) {
        if !self.has_data() {
            return;
        }
        let column = self.current_column_name();
        self.table = self.table.sorted(self.curser_column, ascending);
        self.rebuild_grid();
        self.set_status_message(format!(
            "Sorted by \"{}\" {}",
            column,
            if ascending { "ascending" } else { "descending" }
        ));
    }

    fn copy_cell(&mut self) {
        if !self.has_data() {
            return;
        }
        let cell = self.grid.display(self.curser_row, self.curser_column).to_string();
        self.copy_to_clipboard(cell, "Copied cell");
    }

    fn copy_row(&mut self) {
        if !self.has_data() {
            return;
        }
        let delimiter = self.table.delimiter().char();
        let content = (0..self.grid.ncols())
            .map(|c| Self::wrap_cell_content(self.grid.display(self.curser_row, c), delimiter))
            .collect::<Vec<String>>()
            .join(&delimiter.to_string());
        self.copy_to_clipboard(content, "Copied row");
    }

    fn wrap_cell_content(cell: &str, delimiter: char) -> String {
        let needs_quoting = cell.chars().any(|c| c == delimiter || c == '"' || c == '\n');
        if needs_quoting {
            format!("\"{}\"", cell.replace('"', "\"\""))
        } else {
            cell.to_string()
        }
    }

    fn copy_to_clipboard(&mut self, content: String, success: &str) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message(success),
                Err(e) => self.set_status_message(format!("Clipboard error: {e:?}")),
            },
            None => self.set_status_message("Clipboard unavailable"),
        }
    }

    fn show_popup(&mut self, text: String) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_text = text;
    }

    fn rebuild_grid(&mut self) {
        grid::to_grid(&self.table, &mut self.grid);
        self.dirty = false;
        self.curser_row = self
            .curser_row
            .min(self.grid.nrows().saturating_sub(1));
        self.curser_column = self
            .curser_column
            .min(self.grid.ncols().saturating_sub(1));
        self.ensure_visible();
    }

    // --------------------------- navigation -------------------------------- //

    fn move_selection_down(&mut self, size: usize) {
        if self.grid.nrows() == 0 {
            return;
        }
        self.select_row((self.curser_row + size).min(self.grid.nrows() - 1));
    }

    fn move_selection_up(&mut self, size: usize) {
        self.select_row(self.curser_row.saturating_sub(size));
    }

    fn move_selection_left(&mut self) {
        self.select_column(self.curser_column.saturating_sub(1));
    }

    fn move_selection_right(&mut self) {
        if self.grid.ncols() == 0 {
            return;
        }
        self.select_column((self.curser_column + 1).min(self.grid.ncols() - 1));
    }

    fn select_row(&mut self, row: usize) {
        self.curser_row = row;
        self.ensure_visible();
    }

    fn select_column(&mut self, column: usize) {
        self.curser_column = column;
        self.ensure_visible();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.layout.width, width, self.layout.height, height
        );
        self.layout = UILayout::from_size(width, height);
        self.ensure_visible();
    }

    /// Shift the viewport so the selected cell is on screen.
    fn ensure_visible(&mut self) {
        let height = self.layout.table_height.max(1);
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }

        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        } else {
            let widths = grid::column_widths(&self.grid, self.config.max_column_width);
            while self.offset_column < self.curser_column
                && !Self::column_fits(
                    &widths,
                    self.offset_column,
                    self.curser_column,
                    self.layout.width,
                )
            {
                self.offset_column += 1;
            }
        }
    }

    fn column_fits(widths: &[usize], offset: usize, curser: usize, avail: usize) -> bool {
        let used: usize = widths[offset..=curser].iter().map(|w| w + 1).sum();
        used <= avail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn strings(vals: &[&str]) -> Vec<String> {
        vals.iter().map(|s| s.to_string()).collect()
    }

    fn model_with(table: Table) -> Model {
        let cfg = TadConfig::default();
        let mut m = Model::init(&cfg, 80, 24);
        m.attach(table, None);
        m
    }

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("city", strings(&["oslo", "bergen", "trondheim"])),
            Column::new("pop", strings(&["700000", "290000", "210000"])),
        ])
        .unwrap()
    }

    fn type_line(m: &mut Model, text: &str) {
        for c in text.chars() {
            m.update(Message::RawKey(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            )))
            .unwrap();
        }
        m.update(Message::RawKey(KeyEvent::new(
            KeyCode::Enter,
            KeyModifiers::NONE,
        )))
        .unwrap();
    }

    fn cancel_prompt(m: &mut Model) {
        m.update(Message::RawKey(KeyEvent::new(
            KeyCode::Esc,
            KeyModifiers::NONE,
        )))
        .unwrap();
    }

    #[test]
    fn filter_replaces_the_active_table() {
        let mut m = model_with(sample());
        m.update(Message::Filter).unwrap();
        assert!(m.raw_keyevents());
        type_line(&mut m, "berg");
        assert_eq!(m.table().nrows(), 1);
        assert_eq!(m.table().cell(0, 0), "bergen");
        // The grid was rebuilt in full.
        assert_eq!(m.grid().nrows(), 1);
    }

    #[test]
    fn canceled_prompt_is_a_no_op() {
        let mut m = model_with(sample());
        let before = m.table().clone();
        m.update(Message::Filter).unwrap();
        cancel_prompt(&mut m);
        assert_eq!(m.table(), &before);
        assert_eq!(m.modus(), Modus::TABLE);
        assert_eq!(m.grid().nrows(), 3);
    }

    #[test]
    fn failed_scatter_keeps_table_and_modus() {
        let mut m = model_with(sample());
        let before = m.table().clone();
        m.update(Message::Scatter).unwrap();
        type_line(&mut m, "city"); // text column: type error
        assert_eq!(m.table(), &before);
        assert_eq!(m.modus(), Modus::TABLE);
        assert!(m.plot().is_none());
        assert!(m.status_message().contains("not numeric"));
    }

    #[test]
    fn edits_stay_in_the_grid_until_committed() {
        let mut m = model_with(sample());
        m.update(Message::EditCell).unwrap();
        // Prompt is prefilled with the current cell: clear it first.
        for _ in 0.."oslo".len() {
            m.update(Message::RawKey(KeyEvent::new(
                KeyCode::Backspace,
                KeyModifiers::NONE,
            )))
            .unwrap();
        }
        type_line(&mut m, "drammen");
        assert_eq!(m.grid().display(0, 0), "drammen");
        assert_eq!(m.table().cell(0, 0), "oslo");
        assert!(m.dirty());
    }

    #[test]
    fn summary_on_empty_model_reports_no_data() {
        let cfg = TadConfig::default();
        let mut m = Model::init(&cfg, 80, 24);
        m.update(Message::Summary).unwrap();
        assert_eq!(m.modus(), Modus::TABLE);
        assert!(m.status_message().contains("no data"));
    }

    #[test]
    fn histogram_enters_plot_modus() {
        let mut m = model_with(sample());
        m.update(Message::MoveToLastColumn).unwrap();
        m.update(Message::Histogram).unwrap();
        assert_eq!(m.modus(), Modus::PLOT);
        assert_eq!(m.plot().unwrap().xs.len(), 3);
        m.update(Message::Exit).unwrap();
        assert_eq!(m.modus(), Modus::TABLE);
        assert!(m.plot().is_none());
    }

    #[test]
    fn histogram_on_text_column_reports_type_error() {
        let mut m = model_with(sample());
        m.update(Message::Histogram).unwrap();
        assert_eq!(m.modus(), Modus::TABLE);
        assert!(m.status_message().contains("not numeric"));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut m = model_with(sample());
        m.update(Message::MoveUp).unwrap();
        assert_eq!(m.curser(), (0, 0));
        m.update(Message::MoveEnd).unwrap();
        assert_eq!(m.curser().0, 2);
        m.update(Message::MoveDown).unwrap();
        assert_eq!(m.curser().0, 2);
        m.update(Message::MoveToLastColumn).unwrap();
        m.update(Message::MoveRight).unwrap();
        assert_eq!(m.curser().1, 1);
    }

    #[test]
    fn sort_rebuilds_grid_from_sorted_table() {
        let mut m = model_with(sample());
        m.update(Message::SortAscending).unwrap();
        assert_eq!(m.grid().display(0, 0), "bergen");
        assert_eq!(m.table().cell(0, 0), "bergen");
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model_with(sample());
        m.update(Message::Help).unwrap();
        assert_eq!(m.modus(), Modus::POPUP);
        assert!(!m.popup_text().is_empty());
        m.update(Message::Exit).unwrap();
        assert_eq!(m.modus(), Modus::TABLE);
    }
}
