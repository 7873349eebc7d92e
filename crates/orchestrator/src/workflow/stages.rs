//! The eight workflow stages and the `AnalyticsWorkflow` that runs them

use crate::context::{ComplexityLevel, ContextAnalysis, ContextEngineering, ExpertiseLevel};
use crate::context::analysis::complexity_rank;
use crate::response::render_response;
use crate::services::AgentServices;
use crate::workflow::{
    analytics_workflow, ConversationPatterns, QuerySnapshot, Stage, StageHandler, SynthesisMetadata, Task,
    WorkflowContext, WorkflowExecutor, WorkflowIntent, WorkflowResponse, WorkflowState,
};
use analytics_agent_analytics::{parse_intent, AnalysisResult, AnalyticsEngine};
use analytics_agent_common::Result;
use analytics_agent_history::{AgentCoreMemory, ConversationEntry};
use analytics_agent_mcp_tools::McpAnalyticsTools;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const ANALYSIS_HISTORY_LIMIT: usize = 5;
const CONTEXT_HISTORY_LIMIT: usize = 10;
const MAX_RECOMMENDATIONS: usize = 7;
const MAX_INSIGHTS: usize = 3;
const DECOMPOSITION_THRESHOLD: f64 = 0.6;
const SUMMARY_TERMS: [&str; 7] = ["sales", "revenue", "customer", "product", "performance", "trend", "analysis"];

pub struct AnalyticsWorkflow {
    engine: Arc<AnalyticsEngine>,
    memory: Arc<AgentCoreMemory>,
    mcp: Arc<McpAnalyticsTools>,
    context: Arc<ContextEngineering>,
    executor: WorkflowExecutor,
}

impl AnalyticsWorkflow {
    pub fn new(
        engine: Arc<AnalyticsEngine>,
        memory: Arc<AgentCoreMemory>,
        mcp: Arc<McpAnalyticsTools>,
        context: Arc<ContextEngineering>,
    ) -> Result<Self> {
        let (graph, entry) = analytics_workflow()?;
        info!("Analytics workflow initialized");
        Ok(Self {
            engine,
            memory,
            mcp,
            context,
            executor: WorkflowExecutor::new(graph, entry)?,
        })
    }

    pub fn from_services(services: &AgentServices) -> Result<Self> {
        Self::new(
            services.engine.clone(),
            services.memory.clone(),
            services.mcp.clone(),
            services.context.clone(),
        )
    }

    pub fn context_engine(&self) -> &Arc<ContextEngineering> {
        &self.context
    }

    #[instrument(skip(self))]
    pub async fn process_query(
        &self,
        query: &str,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> WorkflowResponse {
        info!("Starting analytics workflow");
        let mut state = WorkflowState::new(query, session_id, user_id);
        let stages = self.executor.execute(self, &mut state).await;
        WorkflowResponse::from_state(state, stages)
    }

    /// Oldest first, as the context engine expects
    async fn history(&self, session_id: &str, limit: usize) -> Vec<ConversationEntry> {
        let mut history = self.memory.get_conversation_history(session_id, limit).await;
        history.reverse();
        history
    }

    async fn analyze_query(&self, state: &mut WorkflowState) {
        let earlier: Vec<String> = match state.session_id.as_deref() {
            Some(session_id) => self
                .history(session_id, ANALYSIS_HISTORY_LIMIT)
                .await
                .into_iter()
                .map(|entry| entry.query)
                .collect(),
            None => Vec::new(),
        };

        let analysis = self.context.analyze_query_context(
            &state.query,
            state.session_id.as_deref(),
            state.user_id.as_deref(),
            &earlier,
        );
        let intent = workflow_intent(&state.query, &analysis);
        info!(
            intent = %intent.primary_intent,
            complexity = %intent.complexity_level,
            "Query analysis completed"
        );

        state.intent = Some(intent);
        state.context = Some(WorkflowContext::new(analysis));
    }

    async fn retrieve_context(&self, state: &mut WorkflowState) {
        let mut context = state
            .context
            .take()
            .unwrap_or_else(|| WorkflowContext::new(ContextAnalysis::fallback()));

        if let Some(session_id) = state.session_id.as_deref() {
            let history = self.history(session_id, CONTEXT_HISTORY_LIMIT).await;
            if !history.is_empty() {
                context.conversation_summary = Some(enhanced_context_summary(&history));
                context.related_queries = history[history.len().saturating_sub(5)..]
                    .iter()
                    .map(|entry| entry.query.clone())
                    .collect();
                context.conversation_patterns = Some(conversation_patterns(&history));
                context.conversation_history = history;
            }
        }

        if let Some(user_id) = state.user_id.as_deref() {
            context.user_preferences = self.memory.get_user_preferences(user_id).await;
            context.user_profile = self.context.user_context(user_id);
        }

        context.contextual_insights = contextual_insights(&context);
        state.context = Some(context);
    }

    async fn decompose_tasks(&self, state: &mut WorkflowState) {
        let intent = state
            .intent
            .get_or_insert_with(|| workflow_intent(&state.query, &ContextAnalysis::fallback()));
        state.tasks = decompose(&state.query, intent);
        state.completed_tasks.clear();
        info!("Query decomposed into {} tasks", state.tasks.len());
    }

    async fn enhance_with_mcp(&self, state: &mut WorkflowState) {
        if self.mcp.get_relevant_tools_for_query(&state.query).is_empty() {
            info!("No relevant MCP enhancements found for this query");
            return;
        }

        let (bucket, key) = self.engine.data_location();
        let data_context = json!({ "dataset": format!("s3://{}/{}", bucket, key) });
        let outcome = self
            .mcp
            .execute_analytics_workflow(&state.query, Some(&data_context))
            .await;

        if !outcome.success {
            warn!(errors = ?outcome.errors, "Some MCP tool calls failed");
        }
        info!("Added {} MCP tool results", outcome.results.len());
        state.recommendations.extend(outcome.recommendations.iter().cloned());
        state.mcp = Some(outcome);
    }

    async fn process_data(&self, state: &mut WorkflowState) {
        let result = self.engine.analyze_query(&state.query).await;

        if !result.success {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "Data processing failed".to_string());
            error!("Analytics engine error: {}", message);
            state.error = Some(message);
            return;
        }

        let mut completed = Vec::new();
        if !result.analysis.is_empty() {
            completed.push("primary_analysis".to_string());
        }
        if !result.visualizations.is_empty() {
            completed.push("visualization".to_string());
        }
        if result.has_forecast() {
            completed.push("forecasting".to_string());
        }
        if result.has_anomaly_detection() {
            completed.push("anomaly_detection".to_string());
        }
        info!(tasks = ?completed, "Data processing completed");

        state.completed_tasks = completed;
        state.results = Some(result);
    }

    async fn handle_error(&self, state: &mut WorkflowState) {
        let message = state.error.clone().unwrap_or_else(|| "Unknown error".to_string());
        error!("Handling workflow error: {}", message);

        let mut results = AnalysisResult::failure(&state.query, message.clone());
        results.analysis = format!(
            "I encountered an issue processing your query: {}. Please try rephrasing your question or contact support if the issue persists.",
            message
        );
        state.results = Some(results);
        state.recommendations = vec![
            "Try rephrasing your question with more specific terms".to_string(),
            "Check if your data source is accessible".to_string(),
            "Contact support if the issue continues".to_string(),
        ];
    }

    async fn synthesize_results(&self, state: &mut WorkflowState) {
        let (recommendations, metadata) = synthesize(state);
        info!(
            "Generated {} context-aware recommendations from {} context sources",
            recommendations.len(),
            metadata.context_sources_used
        );
        state.recommendations = recommendations;
        state.synthesis = Some(metadata);
    }

    async fn update_memory(&self, state: &mut WorkflowState) {
        let Some(session_id) = state.session_id.as_deref() else {
            return;
        };
        let Some(results) = state.results.as_ref() else {
            return;
        };

        let response = render_response(results, &state.recommendations);
        let metadata = json!({
            "intent": state.intent,
            "recommendations": state.recommendations,
            "completed_tasks": state.completed_tasks,
            "synthesis": state.synthesis,
        });
        let stored = self
            .memory
            .store_conversation(session_id, state.user_id.as_deref(), &state.query, &response, metadata)
            .await;
        if !stored.success {
            warn!("Conversation was not stored: {}", stored.message);
        }

        if let (Some(user_id), Some(intent)) = (state.user_id.as_deref(), state.intent.as_ref()) {
            let stored = self
                .memory
                .store_user_preferences(user_id, interaction_preferences(intent))
                .await;
            if !stored.success {
                warn!("User preferences were not stored: {}", stored.message);
            }
        }

        if results.success {
            let response_type = results.intent.intent_type.to_string();
            self.context
                .learn_from_interaction(&state.query, &response_type, &state.recommendations, None);
        }
    }
}

#[async_trait]
impl StageHandler for AnalyticsWorkflow {
    async fn run_stage(&self, stage: Stage, state: &mut WorkflowState) {
        match stage {
            Stage::QueryAnalyzer => self.analyze_query(state).await,
            Stage::ContextRetriever => self.retrieve_context(state).await,
            Stage::TaskDecomposer => self.decompose_tasks(state).await,
            Stage::McpEnhancer => self.enhance_with_mcp(state).await,
            Stage::DataProcessor => self.process_data(state).await,
            Stage::ErrorHandler => self.handle_error(state).await,
            Stage::ResultSynthesizer => self.synthesize_results(state).await,
            Stage::MemoryUpdater => self.update_memory(state).await,
        }
    }
}

fn workflow_intent(query: &str, analysis: &ContextAnalysis) -> WorkflowIntent {
    let complexity = &analysis.complexity_analysis;
    WorkflowIntent {
        query: parse_intent(query),
        primary_intent: analysis.query_intent.primary_intent.clone(),
        confidence: analysis.query_intent.confidence,
        primary_domain: analysis.domain_context.primary_domain.clone(),
        complexity_level: complexity.complexity_level,
        overall_complexity: complexity.overall_complexity,
        semantic_richness: analysis.semantic_context.richness_score,
        requires_time_series: analysis.temporal_context.requires_time_series,
        requires_decomposition: complexity.overall_complexity > DECOMPOSITION_THRESHOLD,
    }
}

fn task(id: &str, task_type: &str, description: String, priority: u8, depends_on_primary: bool) -> Task {
    Task {
        id: id.to_string(),
        task_type: task_type.to_string(),
        description,
        priority,
        dependencies: if depends_on_primary {
            vec!["primary_analysis".to_string()]
        } else {
            Vec::new()
        },
    }
}

/// Primary analysis always; filtering, grouping, charts, forecasts and anomaly checks
/// only for queries complex enough to decompose. Sorted by priority.
pub fn decompose(query: &str, intent: &WorkflowIntent) -> Vec<Task> {
    let kind = intent.query.intent_type.to_string();
    let mut tasks = vec![task("primary_analysis", &kind, format!("Perform {} on the data", kind), 1, false)];

    if intent.requires_decomposition {
        let q = query.to_lowercase();

        if let Some(period) = &intent.query.time_period {
            tasks.push(task("time_filtering", "data_filtering", format!("Filter data for {}", period), 0, false));
        }
        for group in &intent.query.grouping {
            tasks.push(task(
                &format!("group_by_{}", group),
                "grouping_analysis",
                format!("Group analysis by {}", group),
                2,
                true,
            ));
        }
        if intent.query.visualization != "auto" {
            tasks.push(task(
                "visualization",
                "chart_generation",
                format!("Generate {}", intent.query.visualization),
                3,
                true,
            ));
        }
        if ["forecast", "predict", "trend"].iter().any(|w| q.contains(w)) {
            tasks.push(task(
                "forecasting",
                "time_series_forecast",
                "Generate forecasts and predictions".to_string(),
                3,
                true,
            ));
        }
        if ["anomaly", "outlier", "unusual"].iter().any(|w| q.contains(w)) {
            tasks.push(task(
                "anomaly_detection",
                "anomaly_analysis",
                "Detect anomalies and outliers".to_string(),
                2,
                true,
            ));
        }
    }

    tasks.sort_by_key(|t| t.priority);
    tasks
}

fn truncate_query(query: &str, max: usize) -> String {
    if query.chars().count() > max {
        format!("{}...", query.chars().take(max).collect::<String>())
    } else {
        query.to_string()
    }
}

/// One-paragraph description of the conversation so far; `history` is oldest first
pub fn enhanced_context_summary(history: &[ConversationEntry]) -> String {
    if history.is_empty() {
        return "No previous conversation context.".to_string();
    }

    let all_text = history
        .iter()
        .map(|entry| entry.query.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let terms: Vec<&str> = SUMMARY_TERMS
        .iter()
        .copied()
        .filter(|term| all_text.contains(term))
        .take(3)
        .collect();
    let intents: Vec<String> = history
        .iter()
        .map(|entry| parse_intent(&entry.query).intent_type.to_string())
        .collect();

    let mut parts = Vec::new();
    if history.len() > 1 {
        parts.push(format!("Conversation includes {} interactions", history.len()));
    }
    if !terms.is_empty() {
        parts.push(format!("focusing on {}", terms.join(", ")));
    }
    if let Some((dominant, _)) = crate::context::most_common(intents.iter().map(String::as_str), 1).pop() {
        parts.push(format!("with primary focus on {}", dominant));
    }
    if let Some(latest) = history.last().filter(|entry| !entry.query.is_empty()) {
        parts.push(format!("Most recent: '{}'", truncate_query(&latest.query, 50)));
    }

    if parts.is_empty() {
        "Previous conversation available.".to_string()
    } else {
        parts.join(". ")
    }
}

pub fn conversation_patterns(history: &[ConversationEntry]) -> ConversationPatterns {
    let query_evolution = if history.len() > 1 {
        history[history.len().saturating_sub(3)..]
            .iter()
            .map(|entry| QuerySnapshot {
                query: truncate_query(&entry.query, 50),
                timestamp: entry.timestamp,
            })
            .collect()
    } else {
        Vec::new()
    };

    let ranks: Vec<u32> = history.iter().map(|entry| complexity_rank(&entry.query)).collect();
    let complexity_trend = match (ranks.first(), ranks.last()) {
        (Some(first), Some(last)) if ranks.len() > 1 && last > first => "increasing",
        (Some(first), Some(last)) if ranks.len() > 1 && last < first => "decreasing",
        _ => "stable",
    };

    let intents: Vec<String> = history
        .iter()
        .map(|entry| parse_intent(&entry.query).intent_type.to_string())
        .collect();
    let distinct: HashSet<&String> = intents.iter().collect();

    ConversationPatterns {
        query_evolution,
        complexity_trend: complexity_trend.to_string(),
        domain_consistency: distinct.len() <= 2,
        intent_progression: intents[intents.len().saturating_sub(3)..].to_vec(),
    }
}

pub fn contextual_insights(context: &WorkflowContext) -> Vec<String> {
    let mut insights = Vec::new();

    match context.user_profile.as_ref().map(|p| p.expertise_level) {
        Some(ExpertiseLevel::Advanced) => {
            insights.push("User shows advanced analytics expertise - can handle complex queries")
        }
        Some(ExpertiseLevel::Beginner) => {
            insights.push("User appears to be new to analytics - provide clear explanations")
        }
        _ => {}
    }

    if let Some(patterns) = &context.conversation_patterns {
        if patterns.complexity_trend == "increasing" {
            insights.push("Query complexity is increasing - user is diving deeper");
        } else if patterns.domain_consistency {
            insights.push("User is focused on a specific domain - maintain context continuity");
        }
    }

    if context.analysis.temporal_context.time_sensitivity > 0 {
        insights.push("Query has time-sensitive elements - prioritize recent data");
    }
    if context.analysis.domain_context.is_cross_domain {
        insights.push("Query spans multiple business domains - provide comprehensive analysis");
    }

    insights.into_iter().take(MAX_INSIGHTS).map(str::to_string).collect()
}

/// Merge engine, context, tool and profile recommendations into one ranked list
fn synthesize(state: &WorkflowState) -> (Vec<String>, SynthesisMetadata) {
    let fallback_context;
    let context = match &state.context {
        Some(context) => context,
        None => {
            fallback_context = WorkflowContext::new(ContextAnalysis::fallback());
            &fallback_context
        }
    };
    let mut recs: Vec<String> = Vec::new();

    if let Some(results) = &state.results {
        recs.extend(results.recommendations.iter().cloned());
    }
    recs.extend(context.analysis.contextual_recommendations.iter().cloned());
    recs.extend(state.recommendations.iter().cloned());

    if context
        .conversation_summary
        .as_deref()
        .is_some_and(|s| s.contains("focusing on"))
    {
        recs.push("Building on your ongoing analysis, consider exploring related dimensions or time periods".to_string());
    }

    let expertise = context
        .user_profile
        .as_ref()
        .map(|p| p.expertise_level)
        .unwrap_or(ExpertiseLevel::Intermediate);
    match expertise {
        ExpertiseLevel::Beginner => recs.extend([
            "Start with summary statistics to understand your data better".to_string(),
            "Consider visualizing key metrics before diving into complex analysis".to_string(),
        ]),
        ExpertiseLevel::Advanced => recs.extend([
            "Consider advanced statistical methods or machine learning approaches".to_string(),
            "Explore multivariate analysis for deeper insights".to_string(),
        ]),
        ExpertiseLevel::Intermediate => {}
    }

    let primary_domain = state
        .intent
        .as_ref()
        .map(|i| i.primary_domain.clone())
        .unwrap_or_else(|| "general".to_string());
    let domain_recs: &[&str] = match primary_domain.as_str() {
        "sales" => &[
            "Analyze customer lifetime value and retention patterns",
            "Segment customers by behavior for targeted strategies",
            "Compare performance across different sales channels",
        ],
        "marketing" => &[
            "Evaluate campaign ROI and attribution models",
            "Analyze customer acquisition cost trends",
            "Study conversion funnel optimization opportunities",
        ],
        "finance" => &[
            "Include variance analysis and budget comparisons",
            "Analyze cash flow patterns and seasonality",
            "Consider risk assessment and scenario planning",
        ],
        _ => &[],
    };
    recs.extend(domain_recs.iter().map(|r| r.to_string()));

    let complexity_level = state
        .intent
        .as_ref()
        .map(|i| i.complexity_level)
        .unwrap_or(ComplexityLevel::Moderate);
    match complexity_level {
        ComplexityLevel::VeryComplex => recs.push(
            "Consider breaking this complex analysis into focused sub-analyses for clearer insights".to_string(),
        ),
        ComplexityLevel::Simple => recs.push(
            "You might want to explore additional dimensions or drill deeper into specific areas".to_string(),
        ),
        _ => {}
    }

    for pattern in context.analysis.pattern_matches.iter().filter(|p| p.similarity > 0.8) {
        recs.extend(pattern.recommendations.iter().take(2).cloned());
    }

    if state.intent.as_ref().is_some_and(|i| i.requires_time_series) {
        recs.extend([
            "Consider seasonal decomposition to understand underlying patterns".to_string(),
            "Add confidence intervals to your forecasts for better decision making".to_string(),
        ]);
    }

    for insight in &context.contextual_insights {
        if insight.contains("prioritize") || insight.contains("focus") {
            recs.push(format!("Insight: {}", insight));
        }
    }

    let mut seen = HashSet::new();
    let unique: Vec<String> = recs
        .into_iter()
        .filter(|r| r.len() > 10 && seen.insert(r.clone()))
        .take(MAX_RECOMMENDATIONS)
        .collect();

    let mut sources = vec!["analytics_engine", "context_engineering", "domain_knowledge", "user_profile"];
    if state.mcp.is_some() {
        sources.push("mcp_tools");
    }
    let metadata = SynthesisMetadata {
        context_sources_used: context.sources_used(),
        recommendation_sources: sources,
        complexity_level,
        expertise_level: expertise.to_string(),
        primary_domain,
    };
    (unique, metadata)
}

fn interaction_preferences(intent: &WorkflowIntent) -> Map<String, Value> {
    let mut prefs = Map::new();
    prefs.insert("query_type".into(), json!(intent.primary_intent));
    prefs.insert("complexity".into(), json!(intent.overall_complexity));
    prefs.insert("complexity_level".into(), json!(intent.complexity_level));
    prefs.insert("domain".into(), json!(intent.primary_domain));
    prefs.insert("semantic_richness".into(), json!(intent.semantic_richness));
    prefs.insert("timestamp".into(), json!(Utc::now().timestamp()));
    prefs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn entry(query: &str, minutes_ago: i64) -> ConversationEntry {
        ConversationEntry {
            query: query.to_string(),
            response: String::new(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            user_id: None,
        }
    }

    fn intent_for(query: &str, overall_complexity: f64) -> WorkflowIntent {
        let mut intent = workflow_intent(query, &ContextAnalysis::fallback());
        intent.overall_complexity = overall_complexity;
        intent.requires_decomposition = overall_complexity > DECOMPOSITION_THRESHOLD;
        intent
    }

    #[test]
    fn test_simple_query_has_one_task() {
        let query = "sales by region in Q1";
        let tasks = decompose(query, &intent_for(query, 0.2));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "primary_analysis");
        assert_eq!(tasks[0].description, "Perform sales_analysis on the data");
    }

    #[test]
    fn test_complex_query_is_decomposed_by_priority() {
        let query = "sales trend by region in Q1 with any anomaly";
        let tasks = decompose(query, &intent_for(query, 0.9));
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["time_filtering", "primary_analysis", "group_by_region", "anomaly_detection", "forecasting"]
        );
        assert_eq!(tasks[0].description, "Filter data for Q1");
        assert_eq!(tasks[2].dependencies, vec!["primary_analysis"]);
    }

    #[test]
    fn test_context_summary() {
        assert_eq!(enhanced_context_summary(&[]), "No previous conversation context.");

        let history = vec![
            entry("show revenue by region", 10),
            entry("sales performance ranking for every product in the catalogue this year", 5),
        ];
        assert_eq!(
            enhanced_context_summary(&history),
            "Conversation includes 2 interactions. focusing on sales, revenue, product. \
             with primary focus on sales_analysis. \
             Most recent: 'sales performance ranking for every product in the...'"
        );
    }

    #[test]
    fn test_conversation_patterns() {
        let history = vec![entry("hello", 3), entry("sales by region", 2), entry("sales by region for Q1", 1)];
        let patterns = conversation_patterns(&history);
        assert_eq!(patterns.complexity_trend, "increasing");
        assert_eq!(patterns.query_evolution.len(), 3);
        assert_eq!(patterns.intent_progression, vec!["general", "sales_analysis", "sales_analysis"]);
        assert!(patterns.domain_consistency);
    }

    #[test]
    fn test_insights_from_patterns_and_time() {
        let engine = ContextEngineering::new();
        let analysis = engine.analyze_query_context("latest sales numbers", None, None, &[]);
        let mut context = WorkflowContext::new(analysis);
        context.conversation_patterns = Some(conversation_patterns(&[entry("sales", 2), entry("sales", 1)]));

        assert_eq!(
            contextual_insights(&context),
            vec![
                "User is focused on a specific domain - maintain context continuity",
                "Query has time-sensitive elements - prioritize recent data",
            ]
        );
    }
}
