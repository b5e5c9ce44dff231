//! Dealer lead-performance metrics.
//!
//! Lead-activity exports (delimited text or a workbook's first sheet) are
//! read with fixed template offsets, filtered to web-form leads and rolled up
//! into per-dealer metrics. Those metrics seed ROI projections and are
//! compared against named network benchmark sets kept in a small persistent
//! store.

pub mod aggregate;
pub mod benchmark;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod roi;
pub mod sanitize;
pub mod session;
pub mod types;
pub mod util;

pub use error::{LeadError, Result};
