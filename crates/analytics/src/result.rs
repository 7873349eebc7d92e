use crate::stats::{AnomalyReport, ColumnStats, Forecast};
use analytics_agent_common::{DataSummary, Intent, Visualization};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

/// Where the numbers in an analysis came from
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataSource {
    Sample,
    #[serde(rename = "real_s3_data")]
    #[strum(serialize = "real_s3_data")]
    RealS3Data,
    RealDataAvailable,
}

/// Extra analytics computed on the real-data path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalytics {
    pub statistical_analysis: BTreeMap<String, ColumnStats>,
    pub correlations: BTreeMap<String, BTreeMap<String, f64>>,
    pub anomaly_detection: Option<AnomalyReport>,
    pub time_series_forecast: Option<Forecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_error: Option<String>,
    pub automated_insights: Vec<String>,
}

/// Output of one generator before it is wrapped with the query and intent
#[derive(Debug, Clone)]
pub struct Analysis {
    pub analysis: String,
    pub visualizations: Vec<Visualization>,
    pub data_summary: DataSummary,
    pub recommendations: Vec<String>,
    pub data_source: DataSource,
    pub advanced: Option<AdvancedAnalytics>,
}

impl Analysis {
    pub fn new(analysis: String) -> Self {
        Self {
            analysis,
            visualizations: Vec::new(),
            data_summary: DataSummary::new(),
            recommendations: Vec::new(),
            data_source: DataSource::Sample,
            advanced: None,
        }
    }
}

/// Outcome of one analytics request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub query: String,
    pub intent: Intent,
    pub analysis: String,
    pub visualizations: Vec<Visualization>,
    pub data_summary: DataSummary,
    pub recommendations: Vec<String>,
    pub data_source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedAnalytics>,
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn from_analysis(query: &str, intent: Intent, analysis: Analysis) -> Self {
        Self {
            success: true,
            query: query.to_string(),
            intent,
            analysis: analysis.analysis,
            visualizations: analysis.visualizations,
            data_summary: analysis.data_summary,
            recommendations: analysis.recommendations,
            data_source: analysis.data_source,
            advanced: analysis.advanced,
            error: None,
        }
    }

    pub fn failure(query: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            intent: Intent::default(),
            analysis: String::new(),
            visualizations: Vec::new(),
            data_summary: DataSummary::new(),
            recommendations: Vec::new(),
            data_source: DataSource::Sample,
            advanced: None,
            error: Some(error.into()),
        }
    }

    pub fn has_forecast(&self) -> bool {
        self.advanced
            .as_ref()
            .is_some_and(|a| a.time_series_forecast.is_some())
    }

    pub fn has_anomaly_detection(&self) -> bool {
        self.advanced
            .as_ref()
            .is_some_and(|a| a.anomaly_detection.is_some())
    }
}
