//! Chart descriptors. Images are rendered client-side from the data points.

use crate::stats::Forecast;
use analytics_agent_common::{ChartType, DataPoint, Visualization};

fn points(pairs: &[(String, f64)]) -> Vec<DataPoint> {
    pairs.iter().map(|(l, v)| DataPoint::new(l.clone(), *v)).collect()
}

pub fn revenue_chart(by_region: &[(String, f64)]) -> Visualization {
    Visualization::new(
        ChartType::BarChart,
        "Revenue by Region",
        "Bar chart showing total revenue by region",
        points(by_region),
    )
}

pub fn trend_chart(by_month: &[(String, f64)]) -> Visualization {
    Visualization::new(
        ChartType::LineChart,
        "Revenue Trend Over Time",
        "Line chart showing revenue trends by month",
        points(by_month),
    )
}

/// Margins are plotted as percentages with one decimal
pub fn profit_margin_chart(margin_by_region: &[(String, f64)]) -> Visualization {
    let data = margin_by_region
        .iter()
        .map(|(region, ratio)| DataPoint::new(region.clone(), (ratio * 1000.0).round() / 10.0))
        .collect();
    Visualization::new(
        ChartType::HorizontalBarChart,
        "Profit Margin by Region",
        "Horizontal bar chart showing profit margins by region",
        data,
    )
}

pub fn performance_radar_chart(metrics: &[(&str, f64)]) -> Visualization {
    Visualization::new(
        ChartType::RadarChart,
        "Performance Metrics Radar Chart",
        "Radar chart showing performance across multiple metrics",
        metrics.iter().map(|(m, v)| DataPoint::new(*m, *v)).collect(),
    )
}

pub fn monthly_average_chart(by_month: &[(String, f64)]) -> Visualization {
    Visualization::new(
        ChartType::LineChart,
        "Monthly Average Trend",
        "Line chart showing the monthly average of the tracked value",
        points(by_month),
    )
}

pub fn ranking_chart(ranking: &[(String, f64)]) -> Visualization {
    Visualization::new(
        ChartType::BarChart,
        "Performance Ranking",
        "Bar chart ranking items by score",
        points(ranking),
    )
}

pub fn comparison_chart(pairs: &[(String, f64)]) -> Visualization {
    Visualization::new(
        ChartType::ComparisonChart,
        "Category Comparison",
        "Side-by-side comparison of both categories per metric",
        points(pairs),
    )
}

/// Historical values followed by the forecast horizon
pub fn forecast_chart(forecast: &Forecast) -> Visualization {
    let history = &forecast.historical_data;
    let ahead = &forecast.forecast;
    let data = history
        .dates
        .iter()
        .zip(&history.values)
        .chain(ahead.dates.iter().zip(&ahead.values))
        .map(|(date, value)| DataPoint::new(date.clone(), *value))
        .collect();
    Visualization::new(
        ChartType::ForecastChart,
        "Time Series Forecast",
        "Time series forecast with confidence intervals",
        data,
    )
}
