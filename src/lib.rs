//! tad - a terminal csv viewer, editor and analyzer.
//!
//! The engines (table store, grid sync, filter, summary, plot) are plain
//! functions and values over [`table::Table`]; the terminal shell in
//! `model`/`controller`/`ui` is one caller of them.

pub mod controller;
pub mod domain;
pub mod filter;
pub mod grid;
pub mod model;
pub mod plot;
pub mod prompt;
pub mod summary;
pub mod table;
pub mod ui;
