use crate::error::{FunnelError, Result};
use crate::fetch::ValuesSource;
use log::debug;
use reqwest::{Client, Url};
use serde_json::Value;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// `spreadsheets.values.get` over HTTP with an API key.
#[derive(Clone)]
pub struct HttpValuesSource {
    client: Client,
    base_url: String,
}

impl HttpValuesSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    /// Points the client at another host, e.g. a local stand-in server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn values_url(&self, spreadsheet_id: &str, api_key: &str, range: &str) -> Result<Url> {
        let invalid = |details: String| FunnelError::InvalidConfig {
            key: "base_url".to_string(),
            details,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("'{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend([spreadsheet_id, "values", range]);
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }
}

impl Default for HttpValuesSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuesSource for HttpValuesSource {
    async fn get_values(&self, spreadsheet_id: &str, api_key: &str, range: &str) -> Result<Value> {
        let url = self.values_url(spreadsheet_id, api_key, range)?;
        debug!("GET values for range {}", range);

        let res = self.client.get(url).send().await?;
        let status = res.status();

        if !status.is_success() {
            let error_text = res.text().await?;
            return Err(FunnelError::Api {
                status: status.as_u16(),
                message: api_error_message(&error_text),
            });
        }

        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            FunnelError::MalformedResponse(format!("response body is not JSON: {}", e))
        })
    }
}

/// Google errors look like `{"error": {"code": 403, "message": "..."}}`;
/// anything else is passed through verbatim.
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
