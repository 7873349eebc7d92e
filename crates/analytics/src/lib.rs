//! Intent parsing, sample and real-data sales analytics, and response formatting

pub mod charts;
pub mod dataset;
pub mod engine;
pub mod format;
pub mod intent;
pub mod real_data;
pub mod result;
pub mod sample;
pub mod stats;

pub use dataset::{SalesDataset, SalesRecord};
pub use engine::{AnalyticsEngine, DatasetSource};
pub use format::format_analytics_response;
pub use intent::parse_intent;
pub use result::{AdvancedAnalytics, Analysis, AnalysisResult, DataSource};
