use crate::config::SheetsConfig;
use crate::decoder::RawRow;
use crate::error::{FunnelError, Result};
use crate::months::Month;
use crate::schema::ProductDataset;
use log::{debug, info};
use serde_json::Value;
use std::future::Future;

/// Reads a cell range from the spreadsheet service.
///
/// Implementations return the decoded JSON body of a successful response
/// and map any non-success status to [`FunnelError::Api`].
pub trait ValuesSource {
    fn get_values(
        &self,
        spreadsheet_id: &str,
        api_key: &str,
        range: &str,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Anything that can produce the product datasets of a month.
pub trait MonthFetcher {
    fn fetch_month(
        &self,
        month_name: &str,
    ) -> impl Future<Output = Result<Vec<ProductDataset>>> + Send;
}

pub struct SheetsFetcher<S> {
    config: SheetsConfig,
    source: S,
}

impl<S: ValuesSource + Sync> SheetsFetcher<S> {
    pub fn new(config: SheetsConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Fetches one month tab and returns the raw rows, header included.
    pub async fn fetch_rows(&self, month_name: &str) -> Result<Vec<RawRow>> {
        let api_key = self.config.require_api_key()?;
        let spreadsheet_id = self.config.require_spreadsheet_id()?;
        let month = Month::from_name(month_name)?;
        let range = self.config.range_for(month);

        info!("Fetching funnel sheet range {}", range);
        let body = self
            .source
            .get_values(spreadsheet_id, api_key, &range)
            .await?;

        let rows = extract_rows(&body)?;
        debug!("Range {} returned {} rows", range, rows.len());
        Ok(rows)
    }

    /// Fetches, decodes and scans one month. No retries: the first failure
    /// is returned to the caller.
    pub async fn fetch(&self, month_name: &str) -> Result<Vec<ProductDataset>> {
        let rows = self.fetch_rows(month_name).await?;
        let datasets = self.decode(&rows)?;

        info!(
            "Decoded {} products from {} rows for {}",
            datasets.len(),
            rows.len(),
            month_name.trim()
        );
        Ok(datasets)
    }

    /// Runs the scanner over already-fetched rows using the configured
    /// schema mode and scan strategy.
    pub fn decode(&self, rows: &[RawRow]) -> Result<Vec<ProductDataset>> {
        crate::decode_sheet(rows, &self.config)
    }
}

impl<S: ValuesSource + Sync> MonthFetcher for SheetsFetcher<S> {
    async fn fetch_month(&self, month_name: &str) -> Result<Vec<ProductDataset>> {
        self.fetch(month_name).await
    }
}

#[cfg(feature = "sheets")]
impl SheetsFetcher<crate::client::HttpValuesSource> {
    /// Fetcher backed by the Sheets v4 HTTP API.
    pub fn from_config(config: SheetsConfig) -> Self {
        Self::new(config, crate::client::HttpValuesSource::new())
    }
}

/// Pulls the `values` array-of-arrays out of a response body.
///
/// Ragged rows are kept as-is. Numeric and boolean cells are rendered to
/// text so the normalizer sees them the way the sheet displays them.
pub fn extract_rows(body: &Value) -> Result<Vec<RawRow>> {
    let values = body
        .get("values")
        .ok_or_else(|| {
            FunnelError::MalformedResponse("response has no 'values' field".to_string())
        })?
        .as_array()
        .ok_or_else(|| FunnelError::MalformedResponse("'values' is not an array".to_string()))?;

    values
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let cells = row.as_array().ok_or_else(|| {
                FunnelError::MalformedResponse(format!("row {} is not an array", row_idx))
            })?;

            cells
                .iter()
                .enumerate()
                .map(|(col_idx, cell)| match cell {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(b) => Ok(b.to_string()),
                    Value::Null => Ok(String::new()),
                    _ => Err(FunnelError::MalformedResponse(format!(
                        "cell at row {}, column {} is not a scalar",
                        row_idx, col_idx
                    ))),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::SchemaMode;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubSource {
        response: Result<Value>,
        ranges: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn ok(body: Value) -> Self {
            Self {
                response: Ok(body),
                ranges: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16, message: &str) -> Self {
            Self {
                response: Err(FunnelError::Api {
                    status,
                    message: message.to_string(),
                }),
                ranges: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.ranges.lock().unwrap().len()
        }
    }

    impl ValuesSource for StubSource {
        async fn get_values(&self, _: &str, _: &str, range: &str) -> Result<Value> {
            self.ranges.lock().unwrap().push(range.to_string());
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(FunnelError::Api { status, message }) => Err(FunnelError::Api {
                    status: *status,
                    message: message.clone(),
                }),
                Err(other) => Err(FunnelError::MalformedResponse(other.to_string())),
            }
        }
    }

    fn sheet_body() -> Value {
        json!({
            "range": "Março!A1:U200",
            "majorDimension": "ROWS",
            "values": [
                ["Funil", "Período", "Investido"],
                ["ProdutoX", "Semana 1", "1.000,00"],
                ["", "Semana 2", "500"],
                ["", "Tendência", "2000"]
            ]
        })
    }

    #[tokio::test]
    async fn test_fetch_builds_range_and_scans() {
        let fetcher = SheetsFetcher::new(
            SheetsConfig::new("key", "sheet"),
            StubSource::ok(sheet_body()),
        );
        let datasets = fetcher.fetch("março").await.unwrap();

        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "ProdutoX");
        assert_eq!(datasets[0].weeks.len(), 2);
        assert_eq!(datasets[0].weeks[0].invested, 1000.0);
        assert_eq!(
            *fetcher.source.ranges.lock().unwrap(),
            vec!["Março!A1:U200".to_string()]
        );
    }

    #[tokio::test]
    async fn test_configuration_errors_skip_the_network() {
        let mut config = SheetsConfig::new("key", "sheet");
        config.api_key = None;
        let fetcher = SheetsFetcher::new(config, StubSource::ok(sheet_body()));
        assert!(matches!(fetcher.fetch("Março").await, Err(FunnelError::MissingApiKey)));

        let mut config = SheetsConfig::new("key", "sheet");
        config.spreadsheet_id = Some(String::new());
        let fetcher = SheetsFetcher::new(config, StubSource::ok(sheet_body()));
        assert!(matches!(
            fetcher.fetch("Março").await,
            Err(FunnelError::MissingSpreadsheetId)
        ));

        let fetcher = SheetsFetcher::new(
            SheetsConfig::new("key", "sheet"),
            StubSource::ok(sheet_body()),
        );
        let err = fetcher.fetch("Brumário").await.unwrap_err();
        assert!(matches!(err, FunnelError::UnknownMonth(_)));
        assert_eq!(fetcher.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_api_errors_are_propagated() {
        let fetcher = SheetsFetcher::new(
            SheetsConfig::new("key", "sheet"),
            StubSource::failing(403, "The caller does not have permission"),
        );

        let err = fetcher.fetch("Abril").await.unwrap_err();
        assert!(!err.is_config_error());
        let message = err.to_string();
        assert!(message.contains("403"));
        assert!(message.contains("does not have permission"));
    }

    #[tokio::test]
    async fn test_header_matched_mode_uses_header_row() {
        let mut config = SheetsConfig::new("key", "sheet");
        config.schema_mode = SchemaMode::HeaderMatched;
        let fetcher = SheetsFetcher::new(config, StubSource::ok(sheet_body()));

        // The stub header only names three columns.
        let err = fetcher.fetch("Março").await.unwrap_err();
        assert!(matches!(err, FunnelError::MissingHeader { .. }));
    }

    #[test]
    fn test_extract_rows_accepts_ragged_and_scalar_cells() {
        let rows = extract_rows(&json!({ "values": [["a"], ["b", 2, true, null], []] })).unwrap();
        assert_eq!(rows[0], vec!["a"]);
        assert_eq!(rows[1], vec!["b", "2", "true", ""]);
        assert!(rows[2].is_empty());
    }

    #[test]
    fn test_extract_rows_rejects_wrong_shapes() {
        assert!(matches!(
            extract_rows(&json!({ "range": "A1:U200" })),
            Err(FunnelError::MalformedResponse(_))
        ));
        assert!(extract_rows(&json!({ "values": "nope" })).is_err());
        assert!(extract_rows(&json!({ "values": ["flat", "row"] })).is_err());
        assert!(extract_rows(&json!({ "values": [[{"nested": 1}]] })).is_err());
    }
}
