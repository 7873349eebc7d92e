use analytics_agent_common::{Intent, IntentType};

fn mentions(query: &str, words: &[&str]) -> bool {
    words.iter().any(|w| query.contains(w))
}

/// Keyword classification of a query. The first matching category wins.
pub fn parse_intent(query: &str) -> Intent {
    let q = query.to_lowercase();
    let mut intent = Intent::default();

    if mentions(&q, &["sales", "revenue", "profit", "income"]) {
        intent.intent_type = IntentType::SalesAnalysis;
    } else if mentions(&q, &["performance", "kpi", "metrics"]) {
        intent.intent_type = IntentType::PerformanceAnalysis;
    } else if mentions(&q, &["trend", "time", "over time", "monthly", "quarterly"]) {
        intent.intent_type = IntentType::TrendAnalysis;
        intent.visualization = "line_chart".to_string();
    } else if mentions(&q, &["top", "best", "highest", "ranking"]) {
        intent.intent_type = IntentType::RankingAnalysis;
        intent.visualization = "bar_chart".to_string();
    } else if mentions(&q, &["compare", "comparison", "vs", "versus"]) {
        intent.intent_type = IntentType::ComparisonAnalysis;
        intent.visualization = "comparison_chart".to_string();
    }

    let periods = [
        (&["q1", "quarter 1"][..], "Q1"),
        (&["q2", "quarter 2"][..], "Q2"),
        (&["q3", "quarter 3"][..], "Q3"),
        (&["q4", "quarter 4"][..], "Q4"),
        (&["2024"][..], "2024"),
        (&["2023"][..], "2023"),
    ];
    intent.time_period = periods
        .iter()
        .find(|(words, _)| mentions(&q, words))
        .map(|(_, period)| period.to_string());

    for group in ["region", "product", "category", "month"] {
        if q.contains(group) {
            intent.grouping.push(group.to_string());
        }
    }

    intent
}

/// Quarter number of a `Q1`..`Q4` time period
pub fn quarter_of(time_period: Option<&str>) -> Option<u32> {
    match time_period? {
        "Q1" => Some(1),
        "Q2" => Some(2),
        "Q3" => Some(3),
        "Q4" => Some(4),
        _ => None,
    }
}
