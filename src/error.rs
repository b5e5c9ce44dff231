use thiserror::Error;

pub type Result<T> = std::result::Result<T, LeadError>;

/// Everything that can abort an upload or a benchmark store operation.
///
/// Unparseable dates and missing optional columns are not represented here:
/// the aggregator skips them per record.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("the file was read but contains no form leads")]
    NoMatchingLeads,

    #[error("benchmark set '{0}' does not exist")]
    NotFound(String),

    #[error("a benchmark set named '{0}' already exists")]
    AlreadyExists(String),

    #[error("benchmark set '{0}' is protected and cannot be deleted")]
    ProtectedResource(String),

    #[error("invalid benchmark set name: {0}")]
    InvalidName(String),

    #[error("invalid benchmark file format: {0}")]
    InvalidImport(String),

    #[error("unsupported file type '{0}' (expected .csv, .xlsx or .xls)")]
    UnsupportedFormat(String),

    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl LeadError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        LeadError::MalformedInput(msg.into())
    }
}
