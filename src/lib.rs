//! # Funnel Metrics
//!
//! A library for turning the weekly marketing-funnel spreadsheet (one tab
//! per month, one block of rows per product) into typed datasets with
//! internally consistent derived metrics.
//!
//! ## Core Concepts
//!
//! - **Normalization**: every cell becomes a finite number; locale formats
//!   (`"R$ 1.234,56"`) are understood and error cells (`#DIV/0!`) read as zero
//! - **Column Schema**: a documented field-to-column table, either fixed or
//!   matched against the header row
//! - **Blocks**: each product spans five rows (four weeks plus a trend
//!   projection), located by the product name and the period label
//! - **Derived ROAS**: funnel ROAS is always recomputed as revenue / invested
//! - **Cache**: decoded months are reused for five minutes per month
//!
//! ## Example
//!
//! ```rust,ignore
//! use funnel_metrics::*;
//!
//! let config = SheetsConfig::from_env()?;
//! let dashboard = FunnelDashboard::from_config(config);
//!
//! let march = dashboard.month("Março").await?;
//! for ranked in rank_by(&march, Metric::FunnelRevenue) {
//!     println!("{}. {} {:.2}", ranked.position, ranked.name, ranked.value);
//! }
//! ```

pub mod cache;
#[cfg(feature = "sheets")]
pub mod client;
pub mod columns;
pub mod compare;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod months;
pub mod normalize;
pub mod scanner;
pub mod schema;

pub use cache::{
    BackendKind, CacheBackend, CacheEnvelope, CacheStore, FileStore, MemoryStore, MonthCache,
};
#[cfg(feature = "sheets")]
pub use client::HttpValuesSource;
pub use columns::{ColumnSchema, Field, SchemaMode};
pub use compare::{
    compare_months, compare_products, evolution, EvolutionPoint, MetricDelta, ProductComparison,
};
pub use config::SheetsConfig;
pub use decoder::{decode_row, RawRow};
pub use error::{FunnelError, Result};
pub use fetch::{extract_rows, MonthFetcher, SheetsFetcher, ValuesSource};
pub use metrics::*;
pub use months::Month;
pub use normalize::normalize;
pub use scanner::{classify_period, BlockScanner, RowKind, ScanStrategy, ScannedBlock};
pub use schema::*;

use log::info;

/// Fetch, cache and compare months through one handle.
pub struct FunnelDashboard<S> {
    cache: MonthCache<SheetsFetcher<S>, CacheBackend>,
}

impl<S: ValuesSource + Sync> FunnelDashboard<S> {
    /// Chooses the cache backend once, from `config.cache_dir`.
    pub fn new(config: SheetsConfig, source: S) -> Self {
        let backend = CacheBackend::probe(config.cache_dir.as_deref());
        let ttl = config.cache_ttl();
        info!(
            "Funnel dashboard using {:?} cache with {}s freshness",
            backend.kind(),
            ttl.num_seconds()
        );

        Self {
            cache: MonthCache::new(SheetsFetcher::new(config, source), backend, ttl),
        }
    }

    pub fn cache_backend(&self) -> BackendKind {
        self.cache.store().kind()
    }

    pub async fn month(&self, month_name: &str) -> Result<Vec<ProductDataset>> {
        self.cache.get_or_fetch(month_name).await
    }

    /// Months in the order given, fetched concurrently.
    pub async fn months(
        &self,
        month_names: &[&str],
    ) -> Result<Vec<(Month, Vec<ProductDataset>)>> {
        let months = month_names
            .iter()
            .map(|name| Month::from_name(name))
            .collect::<Result<Vec<_>>>()?;
        let data = self.cache.get_many(month_names).await?;
        Ok(months.into_iter().zip(data).collect())
    }

    pub async fn compare(
        &self,
        previous: &str,
        current: &str,
        metrics: &[Metric],
    ) -> Result<Vec<ProductComparison>> {
        let mut data = self.cache.get_many(&[previous, current]).await?;
        let current_data = data.pop().unwrap_or_default();
        let previous_data = data.pop().unwrap_or_default();
        Ok(compare_months(&previous_data, &current_data, metrics))
    }

    pub async fn evolution(
        &self,
        month_names: &[&str],
        product: Option<&str>,
        metric: Metric,
    ) -> Result<Vec<EvolutionPoint>> {
        let months = self.months(month_names).await?;
        Ok(evolution(&months, product, metric))
    }
}

#[cfg(feature = "sheets")]
impl FunnelDashboard<HttpValuesSource> {
    pub fn from_config(config: SheetsConfig) -> Self {
        Self::new(config, HttpValuesSource::new())
    }
}

/// Decodes an already-fetched sheet with the configured schema mode and
/// scan strategy.
pub fn decode_sheet(rows: &[RawRow], config: &SheetsConfig) -> Result<Vec<ProductDataset>> {
    let schema = match config.schema_mode {
        SchemaMode::Fixed => ColumnSchema::standard(),
        SchemaMode::HeaderMatched => {
            let header = rows.first().map(Vec::as_slice).unwrap_or(&[]);
            ColumnSchema::from_header(header)?
        }
    };

    Ok(BlockScanner::new(&schema)
        .with_strategy(config.scan_strategy)
        .scan(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_row(name: &str, period: &str, invested: &str, funnel_revenue: &str) -> RawRow {
        let mut row = vec![String::new(); 21];
        row[0] = name.to_string();
        row[1] = period.to_string();
        row[2] = invested.to_string();
        row[18] = funnel_revenue.to_string();
        row
    }

    #[test]
    fn test_end_to_end_decoding() {
        let rows = vec![
            vec!["Funil".to_string(), "Período".to_string()],
            sheet_row("ProdutoX", "Semana 1", "1000", "2000"),
            sheet_row("", "Semana 2", "1.500,00", "#N/A"),
            sheet_row("", "Semana 3", "", "R$ 900,00"),
            sheet_row("", "Semana 4", "500", "1.250,50"),
            sheet_row("", "Tendência", "4000", "8000"),
        ];

        let datasets = decode_sheet(&rows, &SheetsConfig::default()).unwrap();
        assert_eq!(datasets.len(), 1);

        let product = &datasets[0];
        assert_eq!(product.name, "ProdutoX");
        assert_eq!(product.weeks.len(), 4);
        assert!(product.tendencia.is_some());
        assert_eq!(product.weeks[0].funnel_roas, 2.0);
        assert_eq!(product.weeks[1].funnel_revenue, 0.0);
        assert_eq!(product.weeks[1].funnel_roas, 0.0);
        assert_eq!(product.weeks[2].funnel_roas, 0.0);
        assert_eq!(product.weeks[3].funnel_roas, 2.501);

        for week in &product.weeks {
            let expected = if week.invested > 0.0 {
                week.funnel_revenue / week.invested
            } else {
                0.0
            };
            assert_eq!(week.funnel_roas, expected);
        }
    }

    #[test]
    fn test_decode_sheet_header_matched_requires_header() {
        let config = SheetsConfig {
            schema_mode: SchemaMode::HeaderMatched,
            ..Default::default()
        };
        assert!(matches!(
            decode_sheet(&[], &config),
            Err(FunnelError::MissingHeader { .. })
        ));
    }
}
