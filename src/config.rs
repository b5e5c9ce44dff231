// Input template offsets, column alias tables and runtime settings.
//
// The lead-activity export has a fixed shape: a dealer banner near the top,
// the header row on the 10th line and data from the 12th line on. All of those
// positions live in `SheetLayout` so a template change is a one-line edit here
// (or an override in the TOML settings file).
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEALER_NAME_KEY: &str = "Dealer Name";
pub const UNKNOWN_DEALER: &str = "Unknown Dealer";
pub const ALL_DEALERS: &str = "All Dealers";
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Months assumed when no lead in a partition has a parseable date.
pub const DEFAULT_DATA_MONTHS: u32 = 6;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const SESSION_TIMEOUT_SECS: u64 = 30 * 60;

pub const DEFAULT_DEAL_VALUE: f64 = 4255.0;

/// How delimited text is split into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteMode {
    /// Split on the delimiter and strip one layer of enclosing quotes.
    /// A delimiter inside a quoted field splits that field.
    #[default]
    Naive,
    /// Full quoted-field parsing through the `csv` crate.
    Rfc4180,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub header_row: usize,
    pub data_start_row: usize,
    pub dealer_row: usize,
    pub dealer_col: usize,
    pub delimiter: char,
    pub quoting: QuoteMode,
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            header_row: 9,
            data_start_row: 11,
            dealer_row: 1,
            dealer_col: 1,
            delimiter: ',',
            quoting: QuoteMode::Naive,
        }
    }
}

/// Prioritized column-name spellings per logical field. The first alias
/// present wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub lead_type: Vec<String>,
    pub lead_date: Vec<String>,
    pub source: Vec<String>,
    pub sale_date: String,
    pub response_date: String,
    pub form_token: String,
}

impl Default for FieldAliases {
    fn default() -> Self {
        fn owned(v: &[&str]) -> Vec<String> {
            v.iter().map(|s| s.to_string()).collect()
        }
        FieldAliases {
            lead_type: owned(&["Lead Type", "LeadType", "lead type", "LEAD TYPE", "Type"]),
            lead_date: owned(&["Lead Date", "Date", "Created Date"]),
            source: owned(&["Lead Source", "Source", "Lead Source of Data"]),
            sale_date: "Sale Date".to_string(),
            response_date: "Response Date".to_string(),
            form_token: "Form".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: SheetLayout,
    pub aliases: FieldAliases,
    pub max_upload_bytes: u64,
    pub session_timeout_secs: u64,
    pub avg_deal_value: f64,
    /// Directory holding the benchmark store. `None` means the platform data dir.
    pub store_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            layout: SheetLayout::default(),
            aliases: FieldAliases::default(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            session_timeout_secs: SESSION_TIMEOUT_SECS,
            avg_deal_value: DEFAULT_DEAL_VALUE,
            store_dir: None,
        }
    }
}

impl Settings {
    /// Read settings from a TOML file. Every field is optional.
    pub fn load(path: &Path) -> Result<Settings> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Settings> {
        Ok(toml::from_str(text)?)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn resolved_store_dir(&self) -> PathBuf {
        match &self.store_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lead_intel"),
        }
    }
}
