use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One week of funnel performance for a single product.
///
/// Every field is finite. Missing or error-marked cells read as `0.0`.
/// Rates are stored as the sheet shows them (percent points, `12,5%` -> `12.5`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMetrics {
    #[schemars(description = "Amount invested in paid traffic")]
    pub invested: f64,
    #[schemars(description = "Revenue attributed to paid traffic")]
    pub traffic_revenue: f64,
    #[schemars(description = "Traffic ROAS as reported by the sheet (not recomputed)")]
    pub traffic_roas: f64,
    #[schemars(description = "Students / leads captured")]
    pub students: f64,
    pub forms: f64,
    pub form_fill_rate: f64,
    pub qualified: f64,
    pub scheduled_calls: f64,
    pub scheduling_rate: f64,
    pub calls_completed: f64,
    pub attendance_rate: f64,
    pub sales: f64,
    pub sales_conversion_rate: f64,
    pub ascension_rate: f64,
    pub monetization_sale: f64,
    #[schemars(description = "Deposit / entry amount")]
    pub deposit: f64,
    pub funnel_revenue: f64,
    pub funnel_profit: f64,
    #[schemars(
        description = "Funnel revenue divided by invested, or 0 when nothing was invested. Always recomputed."
    )]
    pub funnel_roas: f64,
}

impl WeeklyMetrics {
    /// Funnel ROAS as defined for every decoded record.
    pub fn derive_funnel_roas(funnel_revenue: f64, invested: f64) -> f64 {
        if invested > 0.0 {
            funnel_revenue / invested
        } else {
            0.0
        }
    }
}

/// All weekly records of one product for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductDataset {
    #[serde(rename = "produto")]
    #[schemars(description = "Trimmed product / funnel name, unique within a month")]
    pub name: String,

    #[schemars(description = "One to four weeks in chronological order")]
    pub weeks: Vec<WeeklyMetrics>,

    #[schemars(description = "Forward projection for the month; not a historical week")]
    pub tendencia: Option<WeeklyMetrics>,
}

impl ProductDataset {
    pub fn new(
        name: impl Into<String>,
        weeks: Vec<WeeklyMetrics>,
        tendencia: Option<WeeklyMetrics>,
    ) -> Self {
        Self {
            name: name.into(),
            weeks,
            tendencia,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ProductDataset)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
