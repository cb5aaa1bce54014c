use crate::columns::{column_letter_to_index, SchemaMode, STANDARD_LAST_COLUMN};
use crate::error::{FunnelError, Result};
use crate::months::Month;
use crate::scanner::ScanStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const ENV_API_KEY: &str = "SHEETS_API_KEY";
pub const ENV_SPREADSHEET_ID: &str = "SHEETS_SPREADSHEET_ID";
pub const ENV_LAST_COLUMN: &str = "SHEETS_LAST_COLUMN";
pub const ENV_MAX_ROWS: &str = "SHEETS_MAX_ROWS";
pub const ENV_CACHE_DIR: &str = "FUNNEL_CACHE_DIR";
pub const ENV_CACHE_TTL_SECS: &str = "FUNNEL_CACHE_TTL_SECS";

pub const DEFAULT_MAX_ROWS: u32 = 200;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Sheets API key. Required at fetch time.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Spreadsheet holding one tab per month. Required at fetch time.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    #[serde(default = "default_last_column")]
    pub last_column: String,

    #[serde(default = "default_max_rows")]
    pub max_rows: u32,

    #[serde(default)]
    pub schema_mode: SchemaMode,

    #[serde(default)]
    pub scan_strategy: ScanStrategy,

    /// Directory for the file-backed cache. `None` keeps the cache in memory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Tab names that differ from the month's standard name (e.g. "Março 2025").
    #[serde(default)]
    pub tab_overrides: BTreeMap<Month, String>,
}

fn default_last_column() -> String {
    STANDARD_LAST_COLUMN.to_string()
}

fn default_max_rows() -> u32 {
    DEFAULT_MAX_ROWS
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            spreadsheet_id: None,
            last_column: default_last_column(),
            max_rows: DEFAULT_MAX_ROWS,
            schema_mode: SchemaMode::default(),
            scan_strategy: ScanStrategy::default(),
            cache_dir: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            tab_overrides: BTreeMap::new(),
        }
    }
}

impl SheetsConfig {
    pub fn new(api_key: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            spreadsheet_id: Some(spreadsheet_id.into()),
            ..Default::default()
        }
    }

    /// Reads the process environment. Missing credentials are not an error
    /// here; they fail the first fetch instead.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self {
            api_key: non_empty(ENV_API_KEY),
            spreadsheet_id: non_empty(ENV_SPREADSHEET_ID),
            cache_dir: non_empty(ENV_CACHE_DIR).map(PathBuf::from),
            ..Default::default()
        };

        if let Some(column) = non_empty(ENV_LAST_COLUMN) {
            config.last_column = column.trim().to_uppercase();
        }
        if let Some(raw) = non_empty(ENV_MAX_ROWS) {
            config.max_rows = parse_number(ENV_MAX_ROWS, &raw)?;
        }
        if let Some(raw) = non_empty(ENV_CACHE_TTL_SECS) {
            config.cache_ttl_secs = parse_number(ENV_CACHE_TTL_SECS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the values that have no sensible fallback.
    pub fn validate(&self) -> Result<()> {
        if column_letter_to_index(&self.last_column).is_none() {
            return Err(FunnelError::InvalidConfig {
                key: "last_column".to_string(),
                details: format!("'{}' is not a column letter", self.last_column),
            });
        }
        if self.max_rows < 2 {
            return Err(FunnelError::InvalidConfig {
                key: "max_rows".to_string(),
                details: format!("{} leaves no room below the header", self.max_rows),
            });
        }
        if ttl_from_secs(self.cache_ttl_secs).is_none() {
            return Err(FunnelError::InvalidConfig {
                key: "cache_ttl_secs".to_string(),
                details: format!("{} seconds is out of range", self.cache_ttl_secs),
            });
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FunnelError::MissingApiKey)
    }

    pub fn require_spreadsheet_id(&self) -> Result<&str> {
        self.spreadsheet_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(FunnelError::MissingSpreadsheetId)
    }

    pub fn tab_name(&self, month: Month) -> &str {
        self.tab_overrides
            .get(&month)
            .map(String::as_str)
            .unwrap_or_else(|| month.tab_name())
    }

    /// `"<tab>!A1:<last column><max rows>"`. Tab names with spaces or
    /// punctuation are quoted A1-style (`'Março 2025'!A1:U200`).
    pub fn range_for(&self, month: Month) -> String {
        format!(
            "{}!A1:{}{}",
            quote_tab_name(self.tab_name(month)),
            self.last_column,
            self.max_rows
        )
    }

    /// Saturates for values [`validate`](Self::validate) would reject.
    pub fn cache_ttl(&self) -> chrono::Duration {
        ttl_from_secs(self.cache_ttl_secs).unwrap_or(chrono::TimeDelta::MAX)
    }
}

fn ttl_from_secs(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
}

fn quote_tab_name(tab: &str) -> String {
    if tab.chars().all(|c| c.is_alphanumeric() || c == '_') {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| FunnelError::InvalidConfig {
        key: key.to_string(),
        details: format!("'{}' is not a valid number", raw),
    })
}
