//! Generated sample analyses used when no real dataset is reachable.

use crate::charts;
use crate::dataset::{SalesDataset, SalesRecord, MONTH_NAMES};
use crate::format::{currency, percent, thousands};
use crate::intent::quarter_of;
use crate::result::Analysis;
use crate::stats::mean;
use analytics_agent_common::{AnalyticsError, Intent, IntentType, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Normal, Poisson, StandardNormal};
use std::fmt::Write;

pub const SAMPLE_REGIONS: [&str; 5] = [
    "North America",
    "Europe",
    "Asia Pacific",
    "Latin America",
    "Middle East",
];

const PERFORMANCE_METRICS: [(&str, f64); 5] = [
    ("Customer Satisfaction", 87.5),
    ("Sales Growth", 12.3),
    ("Market Share", 23.8),
    ("Operational Efficiency", 91.2),
    ("Employee Productivity", 78.9),
];

const RANKED_ITEMS: [&str; 5] = ["Product A", "Product B", "Product C", "Product D", "Product E"];

const COMPARISON_METRICS: [&str; 4] = ["Revenue", "Growth Rate", "Market Share", "Customer Satisfaction"];

fn distribution_error(e: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::Analytics(format!("Invalid sampling distribution: {}", e))
}

/// Dispatch on the intent type
pub fn generate(query: &str, intent: &Intent, rng: &mut StdRng) -> Result<Analysis> {
    match intent.intent_type {
        IntentType::SalesAnalysis => sales_analysis(intent, rng),
        IntentType::PerformanceAnalysis => Ok(performance_analysis()),
        IntentType::TrendAnalysis => Ok(trend_analysis(intent, rng)),
        IntentType::RankingAnalysis => Ok(ranking_analysis(rng)),
        IntentType::ComparisonAnalysis => Ok(comparison_analysis(rng)),
        IntentType::General => Ok(general_analysis(query)),
    }
}

/// Five regions over January to June 2024, one record per region and month
pub fn sample_sales_dataset(rng: &mut StdRng) -> Result<SalesDataset> {
    let revenue: Normal<f64> = Normal::new(100_000.0, 20_000.0).map_err(distribution_error)?;
    let sales = Poisson::new(150.0).map_err(distribution_error)?;
    let margin = Uniform::new(0.15, 0.35);

    let mut records = Vec::with_capacity(SAMPLE_REGIONS.len() * 6);
    for region in SAMPLE_REGIONS {
        for month in 1..=6 {
            let date = NaiveDate::from_ymd_opt(2024, month, 1)
                .ok_or_else(|| AnalyticsError::Analytics(format!("invalid month {}", month)))?;
            let sales_count: f64 = rng.sample(sales);
            records.push(SalesRecord {
                date,
                region: region.to_string(),
                product: "All Products".to_string(),
                revenue: rng.sample(revenue).max(50_000.0),
                sales_count: sales_count as u64,
                profit_margin: rng.sample(margin),
            });
        }
    }
    Ok(SalesDataset::new(records))
}

fn revenue_trend_sentence(by_month: &[(String, f64)]) -> String {
    match (by_month.first(), by_month.last()) {
        (Some((_, first)), Some((_, last))) if by_month.len() > 1 => {
            let article = if last > first { "an increasing" } else { "a decreasing" };
            format!("Revenue shows {} trend over the analyzed period.", article)
        }
        _ => "Trend analysis requires time-series data.".to_string(),
    }
}

pub fn sales_analysis(intent: &Intent, rng: &mut StdRng) -> Result<Analysis> {
    let dataset = sample_sales_dataset(rng)?.for_quarter(quarter_of(intent.time_period.as_deref()));
    if dataset.is_empty() {
        return Err(AnalyticsError::Analytics(format!(
            "No sample data for period {}",
            intent.time_period.as_deref().unwrap_or_default()
        )));
    }

    let by_region = dataset.revenue_by_region();
    let by_month = dataset.revenue_by_month();
    let top: Vec<&(String, f64)> = by_region.iter().take(3).collect();
    let avg_margin = mean(&dataset.profit_margins());
    let period = intent.time_period.as_deref().unwrap_or("Full Period");

    let mut text = format!(
        "## Sales Performance Analysis - {}\n\n### Key Findings:\n- **Total Revenue**: {}\n- **Total Sales**: {} transactions\n- **Average Profit Margin**: {}\n\n### Top 3 Performing Regions:\n",
        period,
        currency(dataset.total_revenue()),
        thousands(dataset.total_sales()),
        percent(avg_margin),
    );
    for (i, (region, revenue)) in top.iter().enumerate() {
        let _ = writeln!(text, "{}. **{}**: {}", i + 1, region, currency(*revenue));
    }
    let top_region = top[0].0.clone();
    let last_region = top[top.len() - 1].0.clone();
    let _ = write!(
        text,
        "\n### Revenue Trends:\n{}\n\n### Recommendations:\n- Focus marketing efforts on {} region\n- Investigate growth opportunities in {} region\n- Optimize profit margins across all regions",
        revenue_trend_sentence(&by_month),
        top_region,
        last_region,
    );

    let mut analysis = Analysis::new(text);
    analysis.visualizations = vec![
        charts::revenue_chart(&by_region),
        charts::trend_chart(&by_month),
        charts::profit_margin_chart(&dataset.margin_by_region()),
    ];
    analysis.data_summary.push("total_revenue", currency(dataset.total_revenue()));
    analysis.data_summary.push("total_sales", thousands(dataset.total_sales()));
    analysis.data_summary.push("avg_profit_margin", percent(avg_margin));
    analysis.data_summary.push("top_region", &top_region);
    analysis.recommendations = vec![
        format!("Increase investment in {} region", top_region),
        "Implement profit margin optimization strategy".to_string(),
        "Develop growth plan for underperforming regions".to_string(),
    ];
    Ok(analysis)
}

fn performance_status(value: f64) -> &'static str {
    if value > 85.0 {
        "🟢 Excellent"
    } else if value > 70.0 {
        "🟡 Good"
    } else {
        "🔴 Needs Improvement"
    }
}

pub fn performance_analysis() -> Analysis {
    let metrics = PERFORMANCE_METRICS;
    let values: Vec<f64> = metrics.iter().map(|(_, v)| *v).collect();
    // first occurrence wins on ties
    let strongest = metrics
        .iter()
        .fold(metrics[0], |best, m| if m.1 > best.1 { *m } else { best });
    let weakest = metrics
        .iter()
        .fold(metrics[0], |worst, m| if m.1 < worst.1 { *m } else { worst });

    let mut text = String::from("## Performance Analysis Dashboard\n\n### Key Performance Indicators:\n");
    for (metric, value) in metrics {
        let _ = writeln!(text, "- **{}**: {}% {}", metric, value, performance_status(value));
    }
    let _ = write!(
        text,
        "\n### Performance Summary:\n- **Overall Score**: {:.1}/100\n- **Strongest Area**: {} ({:.1}%)\n- **Improvement Area**: {} ({:.1}%)\n\n### Insights:\n- Performance is strong across most metrics\n- Focus needed on {}\n- Maintain excellence in {}",
        mean(&values),
        strongest.0,
        strongest.1,
        weakest.0,
        weakest.1,
        weakest.0.to_lowercase(),
        strongest.0.to_lowercase(),
    );

    let mut analysis = Analysis::new(text);
    analysis.visualizations = vec![charts::performance_radar_chart(&metrics)];
    for (metric, value) in metrics {
        analysis.data_summary.push(metric, value);
    }
    analysis.recommendations = vec![
        format!("Prioritize improvement in {}", weakest.0),
        format!("Leverage strengths in {}", strongest.0),
        "Implement regular performance monitoring".to_string(),
    ];
    analysis
}

/// Random walk over every day of the first half of 2024
fn daily_random_walk(rng: &mut StdRng) -> Vec<(NaiveDate, f64)> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or_default();
    let days = (end - start).num_days() + 1;

    let mut level = 0.0;
    (0..days)
        .map(|offset| {
            let step: f64 = rng.sample(StandardNormal);
            level += step;
            (start + Duration::days(offset), level + 100.0)
        })
        .collect()
}

pub fn trend_analysis(intent: &Intent, rng: &mut StdRng) -> Analysis {
    let series = daily_random_walk(rng);
    let first = series.first().map(|(_, v)| *v).unwrap_or_default();
    let last = series.last().map(|(_, v)| *v).unwrap_or_default();

    let mut months: Vec<Vec<f64>> = vec![Vec::new(); 12];
    for (date, value) in &series {
        months[date.month0() as usize].push(*value);
    }
    let monthly: Vec<(String, f64)> = months
        .iter()
        .enumerate()
        .filter(|(_, values)| !values.is_empty())
        .map(|(i, values)| (MONTH_NAMES[i].to_string(), mean(values)))
        .collect();

    let upward = last > first;
    let strength = (last - first).abs() / first * 100.0;
    let peak = monthly
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(m, _)| m.clone())
        .unwrap_or_default();
    let low = monthly
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(m, _)| m.clone())
        .unwrap_or_default();

    let mut text = format!(
        "## Trend Analysis - {}\n\n### Trend Overview:\n- **Direction**: {} trend\n- **Strength**: {:.1}% change over period\n- **Current Value**: {:.2}\n- **Starting Value**: {:.2}\n\n### Monthly Averages:\n",
        intent.time_period.as_deref().unwrap_or("2024"),
        if upward { "Upward" } else { "Downward" },
        strength,
        last,
        first,
    );
    for (month, avg) in &monthly {
        let _ = writeln!(text, "- **{}**: {:.2}", month, avg);
    }
    let _ = write!(
        text,
        "\n### Key Insights:\n- {}\n- Peak performance in {}\n- Lowest performance in {}",
        if upward {
            "Strong positive momentum"
        } else {
            "Declining trend requires attention"
        },
        peak,
        low,
    );

    let mut analysis = Analysis::new(text);
    analysis.visualizations = vec![charts::monthly_average_chart(&monthly)];
    analysis
        .data_summary
        .push("trend_direction", if upward { "upward" } else { "downward" });
    analysis.data_summary.push("trend_strength", format!("{:.1}%", strength));
    analysis.data_summary.push("current_value", format!("{:.2}", last));
    analysis.data_summary.push("peak_month", peak);
    analysis
}

pub fn ranking_analysis(rng: &mut StdRng) -> Analysis {
    let score = Uniform::new(60.0, 95.0);
    let mut scores: Vec<f64> = RANKED_ITEMS.iter().map(|_| rng.sample(score)).collect();
    scores.sort_by(|a, b| b.total_cmp(a));
    let ranking: Vec<(String, f64)> = RANKED_ITEMS
        .iter()
        .map(|item| item.to_string())
        .zip(scores.iter().copied())
        .collect();

    let mut text = String::from("## Top Performers Ranking\n\n### Rankings:\n");
    for (i, (item, score)) in ranking.iter().enumerate() {
        let medal = match i {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            _ => format!("{}.", i + 1),
        };
        let _ = writeln!(text, "{} **{}**: {:.1} points", medal, item, score);
    }

    let (top_item, top_score) = ranking[0].clone();
    let gap = top_score - ranking[ranking.len() - 1].1;
    let average = mean(&scores);
    let _ = write!(
        text,
        "\n### Analysis:\n- **Top Performer**: {} with {:.1} points\n- **Performance Gap**: {:.1} points between top and bottom\n- **Average Score**: {:.1} points\n\n### Recommendations:\n- Replicate success factors from {}\n- Provide additional support to lower-ranked items\n- Set performance improvement targets",
        top_item, top_score, gap, average, top_item,
    );

    let mut analysis = Analysis::new(text);
    analysis.visualizations = vec![charts::ranking_chart(&ranking)];
    analysis.data_summary.push("top_performer", &top_item);
    analysis.data_summary.push("top_score", format!("{:.1}", top_score));
    analysis.data_summary.push("average_score", format!("{:.1}", average));
    analysis.data_summary.push("performance_gap", format!("{:.1}", gap));
    analysis
}

pub fn comparison_analysis(rng: &mut StdRng) -> Analysis {
    let score = Uniform::new(50.0, 100.0);
    let category_a: Vec<f64> = COMPARISON_METRICS.iter().map(|_| rng.sample(score)).collect();
    let category_b: Vec<f64> = COMPARISON_METRICS.iter().map(|_| rng.sample(score)).collect();

    let mut text = String::from("## Comparison Analysis\n\n### Side-by-Side Comparison:\n");
    let mut chart_points = Vec::with_capacity(COMPARISON_METRICS.len() * 2);
    for (i, metric) in COMPARISON_METRICS.iter().enumerate() {
        let (a, b) = (category_a[i], category_b[i]);
        let winner = if a > b { "Category A" } else { "Category B" };
        let _ = write!(
            text,
            "\n**{}:**\n- Category A: {:.1}\n- Category B: {:.1}\n- Winner: {} 🏆\n",
            metric, a, b, winner
        );
        chart_points.push((format!("{} (A)", metric), a));
        chart_points.push((format!("{} (B)", metric), b));
    }

    let a_total: f64 = category_a.iter().sum();
    let b_total: f64 = category_b.iter().sum();
    let overall = if a_total > b_total { "Category A" } else { "Category B" };
    let _ = write!(
        text,
        "\n### Overall Performance:\n- **Category A Total**: {:.1} points\n- **Category B Total**: {:.1} points\n- **Overall Winner**: {} 🏆\n\n### Key Insights:\n- {} shows superior overall performance\n- Both categories have strengths in different areas\n- Consider best practices sharing between categories",
        a_total, b_total, overall, overall,
    );

    let mut analysis = Analysis::new(text);
    analysis.visualizations = vec![charts::comparison_chart(&chart_points)];
    analysis.data_summary.push("category_a_total", format!("{:.1}", a_total));
    analysis.data_summary.push("category_b_total", format!("{:.1}", b_total));
    analysis.data_summary.push("overall_winner", overall);
    analysis
}

pub fn general_analysis(query: &str) -> Analysis {
    let text = format!(
        r#"## Analytics Response

I've analyzed your query: "{}"

### Available Analytics Capabilities:
- **Sales Analysis**: Revenue trends, regional performance, profit margins
- **Performance Analysis**: KPI tracking, efficiency metrics, growth rates
- **Trend Analysis**: Time-series analysis, forecasting, pattern detection
- **Ranking Analysis**: Top performers, comparative rankings, benchmarking
- **Comparison Analysis**: Side-by-side comparisons, competitive analysis

### Sample Data Sources I Can Analyze:
- CSV files from S3 buckets
- JSON data exports

### To Get Started:
1. Upload your data to the configured S3 bucket
2. Ask specific questions like:
   - "Show me sales trends for Q2 2024"
   - "Which regions are performing best?"
   - "Compare product performance across categories"
   - "What are the key performance indicators?"

### Next Steps:
Please provide more specific details about what you'd like to analyze, or upload data files for me to process."#,
        query
    );

    let mut analysis = Analysis::new(text);
    analysis.data_summary.push("query_type", "general_inquiry");
    analysis.data_summary.push("capabilities_shown", true);
    analysis.recommendations = vec![
        "Specify the type of analysis you need".to_string(),
        "Upload data files to S3 for processing".to_string(),
        "Ask more targeted questions about your data".to_string(),
    ];
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::parse_intent;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_sales_sample_shape() {
        let intent = parse_intent("Show me sales for Q2");
        let analysis = sales_analysis(&intent, &mut rng()).unwrap();

        assert!(analysis.analysis.starts_with("## Sales Performance Analysis - Q2"));
        assert!(analysis.analysis.contains("### Top 3 Performing Regions:\n1. **"));
        assert_eq!(analysis.visualizations.len(), 3);
        // Q2 keeps three months of five regions
        assert_eq!(analysis.visualizations[0].data.len(), 5);
        assert_eq!(analysis.visualizations[1].data.len(), 3);
        assert!(analysis.data_summary.get("total_revenue").unwrap().starts_with('$'));
        assert_eq!(analysis.recommendations.len(), 3);
    }

    #[test]
    fn test_sales_outside_sample_months_uses_full_period() {
        for query in ["Show sales for Q3", "Show sales for Q4"] {
            let intent = parse_intent(query);
            let analysis = sales_analysis(&intent, &mut rng()).unwrap();
            let period = intent.time_period.as_deref().unwrap();
            assert!(analysis
                .analysis
                .starts_with(&format!("## Sales Performance Analysis - {}", period)));
            assert_eq!(analysis.visualizations[1].data.len(), 6);
        }
    }

    #[test]
    fn test_sales_revenue_floor() {
        let dataset = sample_sales_dataset(&mut rng()).unwrap();
        assert_eq!(dataset.len(), 30);
        assert!(dataset.revenues().iter().all(|r| *r >= 50_000.0));
        assert!(dataset
            .profit_margins()
            .iter()
            .all(|m| (0.15..0.35).contains(m)));
    }

    #[test]
    fn test_performance_is_deterministic() {
        let analysis = performance_analysis();
        assert!(analysis
            .analysis
            .contains("- **Customer Satisfaction**: 87.5% 🟢 Excellent"));
        assert!(analysis.analysis.contains("- **Sales Growth**: 12.3% 🔴 Needs Improvement"));
        assert!(analysis.analysis.contains("- **Overall Score**: 58.7/100"));
        assert!(analysis.analysis.contains("- Focus needed on sales growth"));
        assert_eq!(
            analysis.recommendations[1],
            "Leverage strengths in Operational Efficiency"
        );
    }

    #[test]
    fn test_trend_covers_six_months() {
        let intent = parse_intent("monthly trend");
        let analysis = trend_analysis(&intent, &mut rng());
        assert!(analysis.analysis.starts_with("## Trend Analysis - 2024"));
        assert_eq!(analysis.visualizations[0].data.len(), 6);
        assert_eq!(analysis.visualizations[0].data[0].label, "January");
    }

    #[test]
    fn test_ranking_medals_and_order() {
        let analysis = ranking_analysis(&mut rng());
        assert!(analysis.analysis.contains("🥇 **Product A**"));
        assert!(analysis.analysis.contains("4. **Product D**"));
        let data = &analysis.visualizations[0].data;
        assert!(data.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn test_general_echoes_query() {
        let analysis = general_analysis("Hello World");
        assert!(analysis.analysis.contains("I've analyzed your query: \"Hello World\""));
        assert_eq!(analysis.data_summary.get("capabilities_shown"), Some("true"));
    }
}
