use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Analytics error: {0}")]
    Analytics(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Convert anyhow errors to AnalyticsError
impl From<anyhow::Error> for AnalyticsError {
    fn from(err: anyhow::Error) -> Self {
        AnalyticsError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_conversion_keeps_message() {
        let err: AnalyticsError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.to_string(), "Unknown error: connection refused");
    }

    #[test]
    fn test_serde_error_is_wrapped() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: AnalyticsError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
