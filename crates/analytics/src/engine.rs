use crate::dataset::SalesDataset;
use crate::intent::parse_intent;
use crate::real_data::analyze_real_sales;
use crate::result::{Analysis, AnalysisResult, DataSource};
use crate::sample;
use analytics_agent_common::{AnalyticsError, GatewayConfig, Intent, IntentType, Result};
use analytics_agent_gateway::AgentCoreGateway;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// Something that can hand back the raw text of a stored dataset
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> anyhow::Result<String>;
}

#[async_trait]
impl DatasetSource for AgentCoreGateway {
    async fn fetch(&self, bucket: &str, key: &str) -> anyhow::Result<String> {
        let response = self.access_s3_data(bucket, "GET", key, None).await;
        if !response.success {
            anyhow::bail!(
                "Failed to read s3://{}/{}: {}",
                bucket,
                key,
                response.error.as_deref().unwrap_or("unknown error")
            );
        }
        response
            .data_text()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Object s3://{}/{} is not text", bucket, key))
    }
}

pub struct AnalyticsEngine {
    source: Option<Arc<dyn DatasetSource>>,
    bucket: String,
    key: String,
    rng: Mutex<StdRng>,
}

impl AnalyticsEngine {
    /// Engine that reads `gateway.data_bucket`/`gateway.data_key` through `source`
    pub fn new(source: Option<Arc<dyn DatasetSource>>, config: &GatewayConfig) -> Self {
        Self {
            source,
            bucket: config.data_bucket.clone(),
            key: config.data_key.clone(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Engine with no dataset source; every analysis uses sample data
    pub fn sample_only() -> Self {
        Self::new(None, &GatewayConfig::default())
    }

    /// Fix the sample generator seed
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn data_location(&self) -> (&str, &str) {
        (&self.bucket, &self.key)
    }

    #[instrument(skip(self))]
    pub async fn analyze_query(&self, query: &str) -> AnalysisResult {
        let intent = parse_intent(query);
        info!(intent = %intent.intent_type, period = ?intent.time_period, "Detected intent");

        match self.analyze_with_data(query, &intent).await {
            Ok(analysis) => AnalysisResult::from_analysis(query, intent, analysis),
            Err(e) => {
                warn!("Analysis failed: {}", e);
                AnalysisResult::failure(query, e.to_string())
            }
        }
    }

    /// Real data when it loads, sample data otherwise
    async fn analyze_with_data(&self, query: &str, intent: &Intent) -> Result<Analysis> {
        let dataset = match self.load_dataset().await {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("Could not load real data, using sample data: {}", e);
                return self.sample(query, intent);
            }
        };
        info!(rows = dataset.len(), "Loaded real data");

        if intent.intent_type == IntentType::SalesAnalysis {
            return match analyze_real_sales(&dataset, intent) {
                Ok(analysis) => Ok(analysis),
                Err(e) => {
                    warn!("Real data analysis failed, using sample data: {}", e);
                    self.sample(query, intent)
                }
            };
        }

        let mut analysis = self.sample(query, intent)?;
        analysis.data_source = DataSource::RealDataAvailable;
        analysis.analysis = format!(
            "**Note: Real sales data detected in S3**\n\n{}",
            analysis.analysis
        );
        Ok(analysis)
    }

    async fn load_dataset(&self) -> Result<SalesDataset> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| AnalyticsError::Analytics("No dataset source configured".to_string()))?;
        let content = source.fetch(&self.bucket, &self.key).await?;
        SalesDataset::from_object(&self.key, &content)
    }

    fn sample(&self, query: &str, intent: &Intent) -> Result<Analysis> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AnalyticsError::Analytics("sample generator lock poisoned".to_string()))?;
        sample::generate(query, intent, &mut rng)
    }
}
