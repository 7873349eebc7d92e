//! Descriptive statistics, IQR anomalies and exponential-smoothing forecasts.

use analytics_agent_common::{AnalyticsError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const SMOOTHING_ALPHA: f64 = 0.3;
pub const DEFAULT_FORECAST_PERIODS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

fn central_moment(values: &[f64], k: i32) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(k)).sum::<f64>() / values.len() as f64
}

/// Biased sample skewness
pub fn skewness(values: &[f64]) -> f64 {
    let m2 = central_moment(values, 2);
    if values.is_empty() || m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, 3) / m2.powf(1.5)
}

/// Biased excess (Fisher) kurtosis
pub fn kurtosis(values: &[f64]) -> f64 {
    let m2 = central_moment(values, 2);
    if values.is_empty() || m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, 4) / (m2 * m2) - 3.0
}

pub fn describe(values: &[f64]) -> ColumnStats {
    let sorted = sorted(values);
    ColumnStats {
        mean: mean(values),
        median: median(values),
        std: std_dev(values),
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        skewness: skewness(values),
        kurtosis: kurtosis(values),
    }
}

/// Pearson correlation; `None` when either side has no variance
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));
    let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let vx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    let vy: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    #[serde(rename = "Q1")]
    pub q1: f64,
    #[serde(rename = "Q2")]
    pub q2: f64,
    #[serde(rename = "Q3")]
    pub q3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub column: String,
    pub total_points: usize,
    pub outliers_count: usize,
    pub outlier_percentage: f64,
    pub outlier_values: Vec<f64>,
    pub bounds: Bounds,
    pub quartiles: Quartiles,
}

/// Values outside 1.5 IQR of the quartiles
pub fn detect_anomalies(column: &str, values: &[f64]) -> Result<AnomalyReport> {
    if values.is_empty() {
        return Err(AnalyticsError::Analytics(format!(
            "No values in column {} for anomaly detection",
            column
        )));
    }

    let q1 = quantile(values, 0.25);
    let q3 = quantile(values, 0.75);
    let iqr = q3 - q1;
    let bounds = Bounds {
        lower: q1 - 1.5 * iqr,
        upper: q3 + 1.5 * iqr,
    };
    let outlier_values: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v < bounds.lower || *v > bounds.upper)
        .collect();

    Ok(AnomalyReport {
        column: column.to_string(),
        total_points: values.len(),
        outliers_count: outlier_values.len(),
        outlier_percentage: outlier_values.len() as f64 / values.len() as f64 * 100.0,
        outlier_values,
        bounds,
        quartiles: Quartiles {
            q1,
            q2: median(values),
            q3,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
    pub smoothed_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub alpha: f64,
    pub trend: f64,
    pub last_value: f64,
    pub forecast_period: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub historical_data: HistoricalSeries,
    pub forecast: ForecastSeries,
    pub metrics: ForecastMetrics,
}

/// Simple exponential smoothing with a two-step trend, `periods` days ahead.
///
/// `series` must be sorted by date with one value per date.
pub fn forecast(series: &[(NaiveDate, f64)], periods: usize) -> Result<Forecast> {
    if series.len() < 3 {
        return Err(AnalyticsError::Analytics(
            "Insufficient data points for forecasting".to_string(),
        ));
    }

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let mut smoothed = Vec::with_capacity(values.len());
    smoothed.push(values[0]);
    for value in &values[1..] {
        let previous = smoothed[smoothed.len() - 1];
        smoothed.push(SMOOTHING_ALPHA * value + (1.0 - SMOOTHING_ALPHA) * previous);
    }

    let n = values.len();
    let last_smoothed = smoothed[n - 1];
    let trend = (values[n - 1] - values[n - 3]) / 2.0;
    let forecast_values: Vec<f64> = (1..=periods)
        .map(|step| (last_smoothed + trend * step as f64).max(0.0))
        .collect();

    let last_date = series[n - 1].0;
    let forecast_dates = (1..=periods)
        .map(|step| (last_date + Duration::days(step as i64)).format("%Y-%m-%d").to_string())
        .collect();

    Ok(Forecast {
        historical_data: HistoricalSeries {
            dates: series
                .iter()
                .map(|(d, _)| d.format("%Y-%m-%d").to_string())
                .collect(),
            values: values.clone(),
            smoothed_values: smoothed,
        },
        forecast: ForecastSeries {
            dates: forecast_dates,
            confidence_interval: ConfidenceInterval {
                lower: forecast_values.iter().map(|v| v * 0.8).collect(),
                upper: forecast_values.iter().map(|v| v * 1.2).collect(),
            },
            values: forecast_values,
        },
        metrics: ForecastMetrics {
            alpha: SMOOTHING_ALPHA,
            trend,
            last_value: values[n - 1],
            forecast_period: periods,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_describe_basic_series() {
        let stats = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!(close(stats.mean, 5.0));
        assert!(close(stats.median, 4.5));
        assert!(close(stats.std, (32.0f64 / 7.0).sqrt()));
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_symmetric_series_has_no_skew() {
        assert!(close(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0));
        assert!(close(kurtosis(&[1.0, 2.0, 3.0, 4.0, 5.0]), -1.3));
        assert_eq!(skewness(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!(close(quantile(&values, 0.25), 1.75));
        assert!(close(quantile(&values, 0.75), 3.25));
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!(close(pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0));
        assert!(close(pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0));
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_iqr_anomalies() {
        let values = [10.0, 12.0, 11.0, 13.0, 12.0, 11.0, 95.0];
        let report = detect_anomalies("revenue", &values).unwrap();
        assert_eq!(report.outliers_count, 1);
        assert_eq!(report.outlier_values, vec![95.0]);
        assert!(report.bounds.upper < 95.0);
        assert!(detect_anomalies("revenue", &[]).is_err());
    }

    #[test]
    fn test_forecast_smoothing_and_trend() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series: Vec<_> = [100.0, 110.0, 120.0]
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect();

        let result = forecast(&series, 3).unwrap();
        // 100, 0.3*110 + 0.7*100 = 103, 0.3*120 + 0.7*103 = 108.1
        assert!(close(result.historical_data.smoothed_values[2], 108.1));
        assert!(close(result.metrics.trend, 10.0));
        assert!(close(result.forecast.values[0], 118.1));
        assert!(close(result.forecast.confidence_interval.upper[0], 118.1 * 1.2));
        assert_eq!(result.forecast.dates, vec!["2024-01-04", "2024-01-05", "2024-01-06"]);
    }

    #[test]
    fn test_forecast_never_negative_and_needs_three_points() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series: Vec<_> = [100.0, 50.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect();
        let result = forecast(&series, 5).unwrap();
        assert!(result.forecast.values.iter().all(|v| *v >= 0.0));
        assert_eq!(result.forecast.values[4], 0.0);

        assert!(forecast(&series[..2], 3).is_err());
    }
}
