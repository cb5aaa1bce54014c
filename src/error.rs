use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Missing Sheets API key: set SHEETS_API_KEY or SheetsConfig::api_key")]
    MissingApiKey,

    #[error("Missing spreadsheet id: set SHEETS_SPREADSHEET_ID or SheetsConfig::spreadsheet_id")]
    MissingSpreadsheetId,

    #[error("Unknown month '{0}': expected one of janeiro..dezembro")]
    UnknownMonth(String),

    #[error("Invalid configuration value for {key}: {details}")]
    InvalidConfig { key: String, details: String },

    #[error("Sheets API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[cfg(feature = "sheets")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed Sheets response: {0}")]
    MalformedResponse(String),

    #[error("Header row has no column for field '{field}' (expected header '{expected}')")]
    MissingHeader { field: String, expected: String },

    #[error("Column schema is inconsistent: {0}")]
    InvalidSchema(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FunnelError {
    /// Configuration problems are fatal and must never be retried automatically.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey
                | Self::MissingSpreadsheetId
                | Self::UnknownMonth(_)
                | Self::InvalidConfig { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FunnelError>;
