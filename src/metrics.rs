//! Reductions over decoded datasets: totals, means, variations and rankings.
//!
//! Inputs are assumed to be already normalized, so nothing here re-parses
//! or guards against non-finite values.

use crate::columns::Field;
use crate::schema::{ProductDataset, WeeklyMetrics};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Invested,
    TrafficRevenue,
    TrafficRoas,
    Students,
    Forms,
    FormFillRate,
    Qualified,
    ScheduledCalls,
    SchedulingRate,
    CallsCompleted,
    AttendanceRate,
    Sales,
    SalesConversionRate,
    AscensionRate,
    MonetizationSale,
    Deposit,
    FunnelRevenue,
    FunnelProfit,
    FunnelRoas,
}

/// How weekly values combine into a month figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Amounts and counts.
    Sum,
    /// Rates, averaged over weeks.
    Mean,
    /// Funnel ROAS, recomputed from the summed revenue and investment.
    Ratio,
}

impl Metric {
    pub const ALL: [Metric; 19] = [
        Metric::Invested,
        Metric::TrafficRevenue,
        Metric::TrafficRoas,
        Metric::Students,
        Metric::Forms,
        Metric::FormFillRate,
        Metric::Qualified,
        Metric::ScheduledCalls,
        Metric::SchedulingRate,
        Metric::CallsCompleted,
        Metric::AttendanceRate,
        Metric::Sales,
        Metric::SalesConversionRate,
        Metric::AscensionRate,
        Metric::MonetizationSale,
        Metric::Deposit,
        Metric::FunnelRevenue,
        Metric::FunnelProfit,
        Metric::FunnelRoas,
    ];

    pub fn field(self) -> Field {
        match self {
            Metric::Invested => Field::Invested,
            Metric::TrafficRevenue => Field::TrafficRevenue,
            Metric::TrafficRoas => Field::TrafficRoas,
            Metric::Students => Field::Students,
            Metric::Forms => Field::Forms,
            Metric::FormFillRate => Field::FormFillRate,
            Metric::Qualified => Field::Qualified,
            Metric::ScheduledCalls => Field::ScheduledCalls,
            Metric::SchedulingRate => Field::SchedulingRate,
            Metric::CallsCompleted => Field::CallsCompleted,
            Metric::AttendanceRate => Field::AttendanceRate,
            Metric::Sales => Field::Sales,
            Metric::SalesConversionRate => Field::SalesConversionRate,
            Metric::AscensionRate => Field::AscensionRate,
            Metric::MonetizationSale => Field::MonetizationSale,
            Metric::Deposit => Field::Deposit,
            Metric::FunnelRevenue => Field::FunnelRevenue,
            Metric::FunnelProfit => Field::FunnelProfit,
            Metric::FunnelRoas => Field::FunnelRoas,
        }
    }

    pub fn name(self) -> &'static str {
        self.field().name()
    }

    pub fn aggregation(self) -> Aggregation {
        match self {
            Metric::TrafficRoas
            | Metric::FormFillRate
            | Metric::SchedulingRate
            | Metric::AttendanceRate
            | Metric::SalesConversionRate
            | Metric::AscensionRate => Aggregation::Mean,
            Metric::FunnelRoas => Aggregation::Ratio,
            _ => Aggregation::Sum,
        }
    }

    pub fn read(self, week: &WeeklyMetrics) -> f64 {
        match self {
            Metric::Invested => week.invested,
            Metric::TrafficRevenue => week.traffic_revenue,
            Metric::TrafficRoas => week.traffic_roas,
            Metric::Students => week.students,
            Metric::Forms => week.forms,
            Metric::FormFillRate => week.form_fill_rate,
            Metric::Qualified => week.qualified,
            Metric::ScheduledCalls => week.scheduled_calls,
            Metric::SchedulingRate => week.scheduling_rate,
            Metric::CallsCompleted => week.calls_completed,
            Metric::AttendanceRate => week.attendance_rate,
            Metric::Sales => week.sales,
            Metric::SalesConversionRate => week.sales_conversion_rate,
            Metric::AscensionRate => week.ascension_rate,
            Metric::MonetizationSale => week.monetization_sale,
            Metric::Deposit => week.deposit,
            Metric::FunnelRevenue => week.funnel_revenue,
            Metric::FunnelProfit => week.funnel_profit,
            Metric::FunnelRoas => week.funnel_roas,
        }
    }

    fn write(self, week: &mut WeeklyMetrics, value: f64) {
        let slot = match self {
            Metric::Invested => &mut week.invested,
            Metric::TrafficRevenue => &mut week.traffic_revenue,
            Metric::TrafficRoas => &mut week.traffic_roas,
            Metric::Students => &mut week.students,
            Metric::Forms => &mut week.forms,
            Metric::FormFillRate => &mut week.form_fill_rate,
            Metric::Qualified => &mut week.qualified,
            Metric::ScheduledCalls => &mut week.scheduled_calls,
            Metric::SchedulingRate => &mut week.scheduling_rate,
            Metric::CallsCompleted => &mut week.calls_completed,
            Metric::AttendanceRate => &mut week.attendance_rate,
            Metric::Sales => &mut week.sales,
            Metric::SalesConversionRate => &mut week.sales_conversion_rate,
            Metric::AscensionRate => &mut week.ascension_rate,
            Metric::MonetizationSale => &mut week.monetization_sale,
            Metric::Deposit => &mut week.deposit,
            Metric::FunnelRevenue => &mut week.funnel_revenue,
            Metric::FunnelProfit => &mut week.funnel_profit,
            Metric::FunnelRoas => &mut week.funnel_roas,
        };
        *slot = value;
    }
}

pub fn total(weeks: &[WeeklyMetrics], metric: Metric) -> f64 {
    weeks.iter().map(|w| metric.read(w)).sum()
}

/// Mean over weeks; `0.0` for an empty slice.
pub fn mean(weeks: &[WeeklyMetrics], metric: Metric) -> f64 {
    if weeks.is_empty() {
        return 0.0;
    }
    total(weeks, metric) / weeks.len() as f64
}

/// Combines weeks according to [`Metric::aggregation`].
pub fn aggregate(weeks: &[WeeklyMetrics], metric: Metric) -> f64 {
    match metric.aggregation() {
        Aggregation::Sum => total(weeks, metric),
        Aggregation::Mean => mean(weeks, metric),
        Aggregation::Ratio => WeeklyMetrics::derive_funnel_roas(
            total(weeks, Metric::FunnelRevenue),
            total(weeks, Metric::Invested),
        ),
    }
}

/// Rolls a sequence of weeks into one record, field by field.
pub fn combine(weeks: &[WeeklyMetrics]) -> WeeklyMetrics {
    let mut combined = WeeklyMetrics::default();
    for metric in Metric::ALL {
        metric.write(&mut combined, aggregate(weeks, metric));
    }
    combined
}

/// Percentage change from `previous` to `current`.
///
/// A zero base reads as `100` when the new value is positive and `0`
/// otherwise (including a negative new value).
pub fn variation(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current - previous) / previous * 100.0
}

/// Week-over-week variation of one metric; one entry per week after the first.
pub fn weekly_trend(dataset: &ProductDataset, metric: Metric) -> Vec<f64> {
    dataset
        .weeks
        .windows(2)
        .map(|pair| variation(metric.read(&pair[0]), metric.read(&pair[1])))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub name: String,
    pub week_count: usize,
    /// Month figures: sums, means and recomputed ROAS per [`Metric::aggregation`].
    pub totals: WeeklyMetrics,
    pub tendencia: Option<WeeklyMetrics>,
}

pub fn summarize(dataset: &ProductDataset) -> ProductSummary {
    ProductSummary {
        name: dataset.name.clone(),
        week_count: dataset.weeks.len(),
        totals: combine(&dataset.weeks),
        tendencia: dataset.tendencia,
    }
}

/// All weeks of all products combined as if they were one funnel.
pub fn portfolio_summary(datasets: &[ProductDataset]) -> WeeklyMetrics {
    let weeks: Vec<WeeklyMetrics> = datasets
        .iter()
        .flat_map(|d| d.weeks.iter().copied())
        .collect();
    combine(&weeks)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    /// 1-based.
    pub position: usize,
    pub name: String,
    pub value: f64,
}

/// Products ordered by the month figure of `metric`, highest first.
/// Ties keep their input order.
pub fn rank_by(datasets: &[ProductDataset], metric: Metric) -> Vec<RankedProduct> {
    let mut scored: Vec<(&str, f64)> = datasets
        .iter()
        .map(|d| (d.name.as_str(), aggregate(&d.weeks, metric)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (name, value))| RankedProduct {
            position: idx + 1,
            name: name.to_string(),
            value,
        })
        .collect()
}
