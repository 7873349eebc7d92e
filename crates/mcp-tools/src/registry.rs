//! Tool servers behind a common executor trait.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// Record of one tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool: String,
    pub function: String,
    pub parameters: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ToolExecution {
    pub fn new(tool: &str, function: &str, parameters: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            function: function.to_string(),
            parameters: parameters.clone(),
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_result(mut self, outcome: &Result<Value>) -> Self {
        match outcome {
            Ok(result) => self.result = Some(result.clone()),
            Err(err) => self.error = Some(err.to_string()),
        }
        self.timestamp = Utc::now();
        self
    }
}

/// One MCP tool server and the functions it exposes
#[async_trait]
pub trait ToolExecutor: Send + Sync + Debug {
    /// Server name used for lookup
    fn name(&self) -> &str;

    fn description(&self) -> String;

    fn functions(&self) -> Vec<String>;

    /// Invoke `function` with untyped JSON parameters
    async fn call(&self, function: &str, parameters: Value) -> Result<Value>;
}

/// Heterogeneous tool servers keyed by name
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn ToolExecutor>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn ToolExecutor>) {
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
        tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered server names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Look up `name` and call `function` without holding the lock
    pub async fn execute(&self, name: &str, function: &str, parameters: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| anyhow!("Tool '{}' not found", name))?;
        tool.call(function, parameters).await
    }
}
