//! Analysis of a sales dataset fetched from object storage.

use crate::charts;
use crate::dataset::SalesDataset;
use crate::format::{currency, percent, thousands};
use crate::intent::quarter_of;
use crate::result::{AdvancedAnalytics, Analysis, DataSource};
use crate::stats::{self, mean, std_dev};
use analytics_agent_common::{AnalyticsError, Intent, Result};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use tracing::{debug, warn};

/// Forecast horizon on the real-data path
pub const REAL_DATA_FORECAST_PERIODS: usize = 5;

fn growth_ratio(by_month: &[(String, f64)]) -> Option<f64> {
    match (by_month.first(), by_month.last()) {
        (Some((_, first)), Some((_, last))) if by_month.len() > 1 && *first != 0.0 => {
            Some((last - first) / first)
        }
        _ => None,
    }
}

/// Rule-based observations about revenue, regions, margins and seasonality
pub fn generate_insights(dataset: &SalesDataset) -> Vec<String> {
    let mut insights = Vec::new();
    if dataset.is_empty() {
        return vec!["No significant patterns detected in the current dataset".to_string()];
    }

    let revenues = dataset.revenues();
    let avg_revenue = mean(&revenues);
    if avg_revenue != 0.0 {
        let cv = std_dev(&revenues) / avg_revenue;
        if cv > 0.5 {
            insights.push(format!(
                "Revenue shows high variability (CV: {}), indicating inconsistent performance",
                percent(cv)
            ));
        }
    }

    if let Some(growth) = growth_ratio(&dataset.revenue_by_month()) {
        if growth > 0.1 {
            insights.push(format!("Strong revenue growth of {} over the period", percent(growth)));
        } else if growth < -0.1 {
            insights.push(format!(
                "Revenue decline of {} requires immediate attention",
                percent(growth.abs())
            ));
        }
    }

    let regions = dataset.revenue_by_region();
    if let (Some(top), Some(bottom)) = (regions.first(), regions.last()) {
        let region_mean = mean(&regions.iter().map(|(_, v)| *v).collect::<Vec<_>>());
        if region_mean != 0.0 && (top.1 - bottom.1) / region_mean > 0.5 {
            insights.push(format!(
                "Significant performance gap between {} and {} regions",
                top.0, bottom.0
            ));
        }
    }

    let avg_margin = mean(&dataset.profit_margins());
    if avg_margin < 0.2 {
        insights.push("Profit margins below 20% indicate potential pricing or cost issues".to_string());
    } else if avg_margin > 0.3 {
        insights.push("Strong profit margins above 30% indicate healthy pricing strategy".to_string());
    }

    let distinct_months: HashSet<&str> = dataset.records().iter().map(|r| r.month_name()).collect();
    if distinct_months.len() > 3 {
        let monthly = dataset.mean_revenue_by_month();
        let peak = monthly.iter().max_by(|a, b| a.1.total_cmp(&b.1));
        let low = monthly.iter().min_by(|a, b| a.1.total_cmp(&b.1));
        if let (Some(peak), Some(low)) = (peak, low) {
            insights.push(format!(
                "Seasonal pattern detected: Peak in {}, lowest in {}",
                peak.0, low.0
            ));
        }
    }

    if insights.is_empty() {
        insights.push("No significant patterns detected in the current dataset".to_string());
    }
    insights
}

/// Descriptive statistics and pairwise correlations of the numeric columns
fn statistical_analysis(
    dataset: &SalesDataset,
) -> (
    BTreeMap<String, stats::ColumnStats>,
    BTreeMap<String, BTreeMap<String, f64>>,
) {
    let columns = [
        ("revenue", dataset.revenues()),
        ("sales_count", dataset.sales_counts()),
        ("profit_margin", dataset.profit_margins()),
    ];

    let described = columns
        .iter()
        .map(|(name, values)| (name.to_string(), stats::describe(values)))
        .collect();

    let mut correlations: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for (a, xs) in &columns {
        let row = correlations.entry(a.to_string()).or_default();
        for (b, ys) in &columns {
            if let Some(r) = stats::pearson(xs, ys) {
                row.insert(b.to_string(), r);
            }
        }
    }
    (described, correlations)
}

pub fn analyze_real_sales(dataset: &SalesDataset, intent: &Intent) -> Result<Analysis> {
    let dataset = dataset.for_quarter(quarter_of(intent.time_period.as_deref()));
    let (start, end) = dataset
        .date_range()
        .ok_or_else(|| AnalyticsError::Analytics("Dataset has no rows for the period".to_string()))?;
    let date_range = format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));

    let total_revenue = dataset.total_revenue();
    let total_sales = dataset.total_sales();
    let avg_margin = mean(&dataset.profit_margins());
    let regions = dataset.revenue_by_region();
    let products = dataset.revenue_by_product();
    let monthly = dataset.revenue_by_month();
    // date_range succeeded, so there is at least one record
    let top_region = regions[0].0.clone();
    let top_product = products[0].0.clone();

    let mut text = format!(
        "## Real Sales Data Analysis - {}\n*Based on actual data from S3*\n\n### Key Findings:\n- **Total Revenue**: {}\n- **Total Sales**: {} transactions\n- **Average Profit Margin**: {}\n- **Data Period**: {}\n\n### Top Performing Regions:\n",
        intent.time_period.as_deref().unwrap_or("Full Period"),
        currency(total_revenue),
        thousands(total_sales),
        percent(avg_margin),
        date_range,
    );
    for (i, (region, revenue)) in regions.iter().take(3).enumerate() {
        let _ = writeln!(text, "{}. **{}**: {}", i + 1, region, currency(*revenue));
    }

    text.push_str("\n### Product Performance:\n");
    for (product, revenue) in &products {
        let _ = writeln!(text, "- **{}**: {}", product, currency(*revenue));
    }

    text.push_str("\n### Monthly Revenue Trends:\n");
    for (month, revenue) in &monthly {
        let _ = writeln!(text, "- **{}**: {}", month, currency(*revenue));
    }

    let growth = growth_ratio(&monthly);
    if let Some(growth) = growth {
        let best = monthly.iter().max_by(|a, b| a.1.total_cmp(&b.1));
        let worst = monthly.iter().min_by(|a, b| a.1.total_cmp(&b.1));
        if let (Some(best), Some(worst)) = (best, worst) {
            let _ = write!(
                text,
                "\n### Growth Analysis:\n- **Revenue Trend**: {} ({:+.1}%)\n- **Best Month**: {} ({})\n- **Lowest Month**: {} ({})\n",
                if growth > 0.0 { "Increasing" } else { "Decreasing" },
                growth * 100.0,
                best.0,
                currency(best.1),
                worst.0,
                currency(worst.1),
            );
        }
    }

    let insights = generate_insights(&dataset);
    text.push_str("\n### Automated Insights:\n");
    for insight in &insights {
        let _ = writeln!(text, "- {}", insight);
    }

    let momentum = match growth {
        Some(g) if g > 0.0 => "Continue growth momentum",
        Some(_) => "Address declining trend",
        None => "Collect more monthly data to establish a trend",
    };
    let _ = write!(
        text,
        "\n### Recommendations:\n- Focus marketing efforts on {} region\n- {} is the top-performing product\n- {}\n- Optimize profit margins across all regions",
        top_region, top_product, momentum,
    );

    let mut visualizations = vec![charts::revenue_chart(&regions)];
    if monthly.len() > 1 {
        visualizations.push(charts::trend_chart(&monthly));
    }
    visualizations.push(charts::profit_margin_chart(&dataset.margin_by_region()));

    let (statistical_analysis, correlations) = statistical_analysis(&dataset);
    let mut advanced = AdvancedAnalytics {
        statistical_analysis,
        correlations,
        automated_insights: insights,
        ..Default::default()
    };

    match stats::forecast(&dataset.daily_revenue(), REAL_DATA_FORECAST_PERIODS) {
        Ok(forecast) => {
            visualizations.push(charts::forecast_chart(&forecast));
            advanced.time_series_forecast = Some(forecast);
        }
        Err(e) => {
            debug!("Forecast skipped: {}", e);
            advanced.forecast_error = Some(e.to_string());
        }
    }

    match stats::detect_anomalies("revenue", &dataset.revenues()) {
        Ok(report) => advanced.anomaly_detection = Some(report),
        Err(e) => warn!("Anomaly detection failed: {}", e),
    }

    let mut analysis = Analysis::new(text);
    analysis.data_source = DataSource::RealS3Data;
    analysis.visualizations = visualizations;
    analysis.data_summary.push("total_revenue", currency(total_revenue));
    analysis.data_summary.push("total_sales", thousands(total_sales));
    analysis.data_summary.push("avg_profit_margin", percent(avg_margin));
    analysis.data_summary.push("top_region", &top_region);
    analysis.data_summary.push("top_product", &top_product);
    analysis.data_summary.push("data_rows", dataset.len());
    analysis.data_summary.push("date_range", date_range);
    analysis.recommendations = vec![
        format!("Increase investment in {} region", top_region),
        format!("Leverage success of {}", top_product),
        "Implement profit margin optimization strategy".to_string(),
        "Monitor monthly performance trends".to_string(),
    ];
    analysis.advanced = Some(advanced);
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::parse_intent;

    const CSV: &str = "date,region,product,revenue,sales_count,profit_margin
2024-01-10,North,Widget,1000.0,10,0.10
2024-02-10,South,Gadget,1500.0,12,0.12
2024-03-10,North,Gadget,2000.0,20,0.14
2024-04-10,East,Widget,4000.0,35,0.16
2024-05-10,North,Widget,4500.0,40,0.18
";

    #[test]
    fn test_insights_flag_growth_margins_and_seasonality() {
        let ds = SalesDataset::from_csv(CSV).unwrap();
        let insights = generate_insights(&ds);

        assert!(insights.iter().any(|i| i.starts_with("Strong revenue growth of 350.0%")));
        assert!(insights
            .iter()
            .any(|i| i == "Profit margins below 20% indicate potential pricing or cost issues"));
        assert!(insights
            .iter()
            .any(|i| i == "Seasonal pattern detected: Peak in May, lowest in January"));
    }

    #[test]
    fn test_quiet_dataset_has_default_insight() {
        let csv = "date,region,product,revenue,sales_count,profit_margin
2024-01-10,North,Widget,1000.0,10,0.25
2024-01-11,South,Widget,1000.0,10,0.25
";
        let insights = generate_insights(&SalesDataset::from_csv(csv).unwrap());
        assert_eq!(
            insights,
            vec!["No significant patterns detected in the current dataset".to_string()]
        );
    }

    #[test]
    fn test_real_sales_document() {
        let ds = SalesDataset::from_csv(CSV).unwrap();
        let analysis = analyze_real_sales(&ds, &parse_intent("sales by region")).unwrap();

        assert_eq!(analysis.data_source, DataSource::RealS3Data);
        assert!(analysis.analysis.starts_with(
            "## Real Sales Data Analysis - Full Period\n*Based on actual data from S3*"
        ));
        assert!(analysis.analysis.contains("- **Data Period**: 2024-01-10 to 2024-05-10"));
        assert!(analysis.analysis.contains("1. **North**: $7,500.00"));
        assert!(analysis.analysis.contains("- **Revenue Trend**: Increasing (+350.0%)"));
        assert!(analysis.analysis.contains("- Continue growth momentum"));
        assert_eq!(analysis.data_summary.get("top_product"), Some("Widget"));
        assert_eq!(analysis.data_summary.get("data_rows"), Some("5"));

        // revenue, trend, margin, forecast
        assert_eq!(analysis.visualizations.len(), 4);
        let advanced = analysis.advanced.unwrap();
        assert_eq!(
            advanced.time_series_forecast.unwrap().forecast.values.len(),
            REAL_DATA_FORECAST_PERIODS
        );
        assert!(advanced.statistical_analysis.contains_key("sales_count"));
        assert!(advanced.anomaly_detection.is_some());
    }

    #[test]
    fn test_quarter_without_rows_reports_full_period() {
        let ds = SalesDataset::from_csv(CSV).unwrap();
        let analysis = analyze_real_sales(&ds, &parse_intent("sales in Q4")).unwrap();

        assert!(analysis.analysis.starts_with("## Real Sales Data Analysis - Q4"));
        assert!(analysis.analysis.contains("- **Data Period**: 2024-01-10 to 2024-05-10"));
    }
}
