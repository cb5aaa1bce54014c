use dotenv::dotenv;
use funnel_metrics::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let month = std::env::args().nth(1).unwrap_or_else(|| "Março".to_string());
    let previous = std::env::args().nth(2);

    let config = SheetsConfig::from_env()?;
    println!(
        "📊 Fetching {} ({})",
        month,
        config.range_for(Month::from_name(&month)?)
    );

    let dashboard = FunnelDashboard::from_config(config);
    let datasets = dashboard.month(&month).await?;

    println!("\n{} products decoded\n", datasets.len());
    for dataset in &datasets {
        let summary = summarize(dataset);
        println!(
            "  {:<24} weeks: {}  invested: {:>12.2}  revenue: {:>12.2}  ROAS: {:.2}{}",
            summary.name,
            summary.week_count,
            summary.totals.invested,
            summary.totals.funnel_revenue,
            summary.totals.funnel_roas,
            if summary.tendencia.is_some() {
                ""
            } else {
                "  (no trend row)"
            }
        );
    }

    let portfolio = portfolio_summary(&datasets);
    println!(
        "\nPortfolio: invested {:.2}, revenue {:.2}, profit {:.2}, ROAS {:.2}",
        portfolio.invested, portfolio.funnel_revenue, portfolio.funnel_profit, portfolio.funnel_roas
    );

    println!("\n🏆 Ranking by funnel revenue");
    for ranked in rank_by(&datasets, Metric::FunnelRevenue) {
        println!("  {}. {} {:.2}", ranked.position, ranked.name, ranked.value);
    }

    if let Some(previous) = previous {
        println!("\n📈 {} vs {}", previous, month);
        let metrics = [Metric::Invested, Metric::FunnelRevenue, Metric::FunnelRoas];
        for comparison in dashboard.compare(&previous, &month, &metrics).await? {
            let changes: Vec<String> = comparison
                .deltas
                .iter()
                .map(|d| format!("{} {:+.1}%", d.metric.name(), d.variation))
                .collect();
            println!("  {:<24} {}", comparison.name, changes.join("  "));
        }
    }

    println!("\nSchema for the exported data:\n{}", ProductDataset::schema_as_json()?);

    Ok(())
}
