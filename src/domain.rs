use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum TadError {
    IoError(Error),
    PolarsError(PolarsError),
    Parse(String),
    NoData,
    UnknownColumn(String),
    NotNumeric(String),
    Precondition(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl From<Error> for TadError {
    fn from(err: Error) -> Self {
        TadError::IoError(err)
    }
}

impl From<PolarsError> for TadError {
    fn from(err: PolarsError) -> Self {
        TadError::PolarsError(err)
    }
}

impl std::fmt::Display for TadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TadError::IoError(e) => write!(f, "io error: {e}"),
            TadError::PolarsError(e) => write!(f, "{e}"),
            TadError::Parse(msg) => write!(f, "parse error: {msg}"),
            TadError::NoData => write!(f, "no data loaded"),
            TadError::UnknownColumn(name) => write!(f, "unknown column \"{name}\""),
            TadError::NotNumeric(name) => write!(f, "column \"{name}\" is not numeric"),
            TadError::Precondition(msg) => write!(f, "{msg}"),
            TadError::FileNotFound => write!(f, "file not found"),
            TadError::PermissionDenied => write!(f, "permission denied"),
            TadError::UnknownFileType => write!(f, "unknown file type"),
        }
    }
}

impl std::error::Error for TadError {}

#[derive(Debug, Clone, Setters)]
pub struct TadConfig {
    /// Milliseconds to wait for a terminal event per loop turn.
    pub event_poll_time: u64,
    /// Widest a column is rendered before its content is cut off.
    pub max_column_width: usize,
}

impl Default for TadConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 80,
        }
    }
}

// A struct with different types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    PLOT,
    POPUP,
    CMDINPUT,
}

/// What the command line input is collecting right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    EditCell,
    OpenFile,
    SaveFile,
    FilterPattern,
    ScatterColumn,
}

impl CMDMode {
    pub fn title(&self) -> &'static str {
        match self {
            CMDMode::EditCell => "edit",
            CMDMode::OpenFile => "open",
            CMDMode::SaveFile => "save as",
            CMDMode::FilterPattern => "filter",
            CMDMode::ScatterColumn => "y column",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveToFirstColumn,
    MoveToLastColumn,
    EditCell,
    OpenFile,
    SaveFile,
    Filter,
    Summary,
    Histogram,
    Scatter,
    SortAscending,
    SortDescending,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
 tad - csv viewer, editor and analyzer

 Navigation
   h/j/k/l, arrows   move selection
   PgUp/PgDn         move a page
   Home/End          first/last row
   0/$               first/last column

 File
   o                 open file
   w                 write file (commits grid edits)

 Edit
   Enter or e        edit the selected cell
   y / Y             copy cell / copy row

 Analyze
   f                 filter rows on the selected column
   s                 summary statistics
   p                 histogram of the selected column
   P                 scatter plot (selected column vs prompted column)
   < / >             sort ascending / descending

 Other
   ?                 this help
   Esc               close popup / cancel input
   q                 quit
";
