use analytics_agent_analytics::{format_analytics_response, AnalysisResult};

/// Markdown for a finished run. Synthesized recommendations replace the engine's own list.
pub fn render_response(results: &AnalysisResult, recommendations: &[String]) -> String {
    if !results.success {
        let mut text = if results.analysis.is_empty() {
            format_analytics_response(results)
        } else {
            results.analysis.clone()
        };
        if !recommendations.is_empty() {
            text.push_str("\n\n## Recommendations");
            for (i, rec) in recommendations.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", i + 1, rec));
            }
        }
        return text;
    }

    if recommendations.is_empty() {
        return format_analytics_response(results);
    }
    let mut merged = results.clone();
    merged.recommendations = recommendations.to_vec();
    format_analytics_response(&merged)
}
