use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Unique identifier for a conversation session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound query as accepted by the HTTP and Lambda surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    SalesAnalysis,
    PerformanceAnalysis,
    TrendAnalysis,
    RankingAnalysis,
    ComparisonAnalysis,
    General,
}

/// Parsed analytical intent of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    pub time_period: Option<String>,
    pub grouping: Vec<String>,
    pub visualization: String,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            intent_type: IntentType::General,
            time_period: None,
            grouping: Vec::new(),
            visualization: "auto".to_string(),
        }
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    BarChart,
    LineChart,
    HorizontalBarChart,
    RadarChart,
    ComparisonChart,
    Histogram,
    ForecastChart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

impl DataPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Chart descriptor. Rendering is left to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visualization {
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    pub data: Vec<DataPoint>,
    pub chart_image: Option<String>,
}

impl Visualization {
    pub fn new(chart_type: ChartType, title: &str, description: &str, data: Vec<DataPoint>) -> Self {
        Self {
            chart_type,
            title: title.to_string(),
            description: description.to_string(),
            data,
            chart_image: None,
        }
    }
}

/// Ordered key/value summary; keys keep insertion order when serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSummary(Vec<(String, String)>);

impl DataSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.0.push((key.to_string(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for DataSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct DataSummaryVisitor;

impl<'de> Visitor<'de> for DataSummaryVisitor {
    type Value = DataSummary;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of summary fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            entries.push((key, value));
        }
        Ok(DataSummary(entries))
    }
}

/// Keeps entries in document order
impl<'de> Deserialize<'de> for DataSummary {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(DataSummaryVisitor)
    }
}

/// One stored exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub session_id: String,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub expires_at: DateTime<Utc>,
}

/// Per-user preference document with optimistic version counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub preferences: serde_json::Map<String, serde_json::Value>,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_intent_type_names() {
        assert_eq!(IntentType::SalesAnalysis.to_string(), "sales_analysis");
        assert_eq!(IntentType::from_str("ranking_analysis").unwrap(), IntentType::RankingAnalysis);
        assert_eq!(
            serde_json::to_value(IntentType::General).unwrap(),
            serde_json::json!("general")
        );
    }

    #[test]
    fn test_data_summary_keeps_insertion_order() {
        let mut summary = DataSummary::new();
        summary.push("total_revenue", "$10.00");
        summary.push("avg_profit_margin", "20.0%");
        summary.push("top_region", "North");

        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"total_revenue":"$10.00","avg_profit_margin":"20.0%","top_region":"North"}"#
        );
        assert_eq!(summary.get("top_region"), Some("North"));

        let parsed: DataSummary = serde_json::from_str(r#"{"zeta":"1","alpha":2,"mid":"x"}"#).unwrap();
        let keys: Vec<&str> = parsed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(parsed.get("alpha"), Some("2"));
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
