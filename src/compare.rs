use crate::metrics::{aggregate, portfolio_summary, variation, Metric};
use crate::months::Month;
use crate::schema::ProductDataset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDelta {
    pub metric: Metric,
    pub previous: f64,
    pub current: f64,
    /// Percentage change, see [`variation`].
    pub variation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductComparison {
    pub name: String,
    pub in_previous: bool,
    pub in_current: bool,
    pub deltas: Vec<MetricDelta>,
}

/// Month figures of two datasets side by side.
pub fn compare_products(
    previous: &ProductDataset,
    current: &ProductDataset,
    metrics: &[Metric],
) -> Vec<MetricDelta> {
    deltas(Some(previous), Some(current), metrics)
}

fn deltas(
    previous: Option<&ProductDataset>,
    current: Option<&ProductDataset>,
    metrics: &[Metric],
) -> Vec<MetricDelta> {
    let value = |dataset: Option<&ProductDataset>, metric: Metric| {
        dataset.map_or(0.0, |d| aggregate(&d.weeks, metric))
    };

    metrics
        .iter()
        .map(|&metric| {
            let previous = value(previous, metric);
            let current = value(current, metric);
            MetricDelta {
                metric,
                previous,
                current,
                variation: variation(previous, current),
            }
        })
        .collect()
}

/// Pairs products by name across two months.
///
/// Products of the current month come first in their sheet order, followed
/// by products that only existed in the previous month. A missing side
/// counts as zero.
pub fn compare_months(
    previous: &[ProductDataset],
    current: &[ProductDataset],
    metrics: &[Metric],
) -> Vec<ProductComparison> {
    let mut comparisons: Vec<ProductComparison> = current
        .iter()
        .map(|cur| {
            let prev = find_by_name(previous, &cur.name);
            ProductComparison {
                name: cur.name.clone(),
                in_previous: prev.is_some(),
                in_current: true,
                deltas: deltas(prev, Some(cur), metrics),
            }
        })
        .collect();

    comparisons.extend(
        previous
            .iter()
            .filter(|prev| find_by_name(current, &prev.name).is_none())
            .map(|prev| ProductComparison {
                name: prev.name.clone(),
                in_previous: true,
                in_current: false,
                deltas: deltas(Some(prev), None, metrics),
            }),
    );

    comparisons
}

fn find_by_name<'a>(datasets: &'a [ProductDataset], name: &str) -> Option<&'a ProductDataset> {
    datasets.iter().find(|d| d.name == name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionPoint {
    pub month: Month,
    pub value: f64,
    /// `None` for the first month of the series.
    pub variation: Option<f64>,
}

/// A metric month by month, for one product (`Some(name)`) or for the whole
/// portfolio (`None`). Months where the product is absent read as zero.
pub fn evolution(
    months: &[(Month, Vec<ProductDataset>)],
    product: Option<&str>,
    metric: Metric,
) -> Vec<EvolutionPoint> {
    let mut points: Vec<EvolutionPoint> = Vec::with_capacity(months.len());

    for (month, datasets) in months {
        let value = match product {
            Some(name) => {
                find_by_name(datasets, name).map_or(0.0, |d| aggregate(&d.weeks, metric))
            }
            None => metric.read(&portfolio_summary(datasets)),
        };

        let change = points.last().map(|prev| variation(prev.value, value));
        points.push(EvolutionPoint {
            month: *month,
            value,
            variation: change,
        });
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::WeeklyMetrics;

    fn product(name: &str, invested: f64, revenue: f64) -> ProductDataset {
        ProductDataset::new(
            name,
            vec![WeeklyMetrics {
                invested,
                funnel_revenue: revenue,
                funnel_roas: WeeklyMetrics::derive_funnel_roas(revenue, invested),
                ..Default::default()
            }],
            None,
        )
    }

    #[test]
    fn test_compare_products() {
        let deltas = compare_products(
            &product("A", 100.0, 200.0),
            &product("A", 150.0, 600.0),
            &[Metric::Invested, Metric::FunnelRoas],
        );
        assert_eq!(deltas[0].variation, 50.0);
        assert_eq!(deltas[1].previous, 2.0);
        assert_eq!(deltas[1].current, 4.0);
        assert_eq!(deltas[1].variation, 100.0);
    }

    #[test]
    fn test_compare_months_pairs_by_name() {
        let previous = vec![product("A", 100.0, 0.0), product("Old", 50.0, 0.0)];
        let current = vec![product("New", 10.0, 0.0), product("A", 200.0, 0.0)];

        let result = compare_months(&previous, &current, &[Metric::Invested]);
        let names: Vec<&str> = result.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["New", "A", "Old"]);

        assert!(!result[0].in_previous);
        assert_eq!(result[0].deltas[0].variation, 100.0);
        assert_eq!(result[1].deltas[0].variation, 100.0);
        assert!(!result[2].in_current);
        assert_eq!(result[2].deltas[0].current, 0.0);
        assert_eq!(result[2].deltas[0].variation, -100.0);
    }

    #[test]
    fn test_evolution_for_product_and_portfolio() {
        let months = vec![
            (Month::Janeiro, vec![product("A", 100.0, 0.0), product("B", 100.0, 0.0)]),
            (Month::Fevereiro, vec![product("B", 300.0, 0.0)]),
            (Month::Marco, vec![product("A", 50.0, 0.0)]),
        ];

        let a = evolution(&months, Some("A"), Metric::Invested);
        assert_eq!(a.iter().map(|p| p.value).collect::<Vec<_>>(), vec![100.0, 0.0, 50.0]);
        assert_eq!(a[0].variation, None);
        assert_eq!(a[1].variation, Some(-100.0));
        assert_eq!(a[2].variation, Some(100.0));

        let all = evolution(&months, None, Metric::Invested);
        assert_eq!(all.iter().map(|p| p.value).collect::<Vec<_>>(), vec![200.0, 300.0, 50.0]);
        assert_eq!(all[1].variation, Some(50.0));
        assert_eq!(all[2].month, Month::Marco);
    }
}
