//! Stateless scoring of a single query: intent, entities, time, domain, complexity.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

struct IntentRule {
    name: &'static str,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
    confidence_base: f64,
}

static INTENT_RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        IntentRule {
            name: "sales_analysis",
            keywords: &["sales", "revenue", "selling", "sold", "purchase"],
            patterns: vec![re(r"sales?\s+by\s+\w+"), re(r"revenue\s+analysis"), re(r"top\s+selling")],
            confidence_base: 0.8,
        },
        IntentRule {
            name: "performance_analysis",
            keywords: &["performance", "kpi", "metric", "benchmark"],
            patterns: vec![re(r"performance\s+of"), re(r"how\s+well"), re(r"compare\s+performance")],
            confidence_base: 0.8,
        },
        IntentRule {
            name: "trend_analysis",
            keywords: &["trend", "pattern", "over time", "growth", "decline"],
            patterns: vec![re(r"trend\s+in"), re(r"over\s+time"), re(r"growth\s+rate")],
            confidence_base: 0.8,
        },
        IntentRule {
            name: "forecasting",
            keywords: &["forecast", "predict", "future", "projection", "estimate"],
            patterns: vec![re(r"forecast\s+for"), re(r"predict\s+\w+"), re(r"next\s+quarter")],
            confidence_base: 0.9,
        },
        IntentRule {
            name: "anomaly_detection",
            keywords: &["anomaly", "outlier", "unusual", "abnormal", "strange"],
            patterns: vec![re(r"detect\s+anomal"), re(r"find\s+outlier"), re(r"unusual\s+pattern")],
            confidence_base: 0.9,
        },
        IntentRule {
            name: "comparison_analysis",
            keywords: &["compare", "versus", "vs", "difference", "between"],
            patterns: vec![
                re(r"compare\s+\w+\s+to"),
                re(r"\w+\s+vs\s+\w+"),
                re(r"difference\s+between"),
            ],
            confidence_base: 0.8,
        },
        IntentRule {
            name: "segmentation",
            keywords: &["segment", "group", "category", "cluster", "classify"],
            patterns: vec![re(r"segment\s+by"), re(r"group\s+customers"), re(r"categorize\s+\w+")],
            confidence_base: 0.8,
        },
    ]
});

static TIME_PERIODS: Lazy<Regex> = Lazy::new(|| re(r"\b(?:q[1-4]|quarter|month|year|week|day)\b"));
static METRICS: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:sales|revenue|profit|cost|price|volume|count)\b"));
static DIMENSIONS: Lazy<Regex> = Lazy::new(|| re(r"\b(?:region|product|customer|category|channel)\b"));
static OPERATIONS: Lazy<Regex> = Lazy::new(|| re(r"\b(?:sum|average|count|max|min|total)\b"));
static COMPARISONS: Lazy<Regex> = Lazy::new(|| re(r"\b(?:compare|versus|vs|against|between)\b"));

static SPECIFIC_PERIODS: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(?:q[1-4]\s+20\d{2}|january|february|march|april|may|june|july|august|september|october|november|december)\b")
});
static RELATIVE_PERIODS: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:last|this|next|current|previous)\s+(?:quarter|month|year|week)\b"));
static TIME_RANGES: Lazy<Regex> = Lazy::new(|| re(r"\b(?:from|between)\s+\w+\s+(?:to|and)\s+\w+\b"));
static TEMPORAL_MODIFIERS: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:daily|weekly|monthly|quarterly|yearly|annual)\b"));

static QUESTION_WORDS: Lazy<Regex> = Lazy::new(|| re(r"\b(?:what|how|when|where|why|which|who)\b"));
static CONJUNCTIONS: Lazy<Regex> = Lazy::new(|| re(r"\b(?:and|or|but|however|also|additionally)\b"));

const DOMAIN_INDICATORS: [(&str, &[&str]); 8] = [
    ("sales", &["sales", "revenue", "selling", "purchase", "order", "transaction"]),
    ("marketing", &["marketing", "campaign", "lead", "conversion", "acquisition", "retention"]),
    ("finance", &["profit", "cost", "expense", "budget", "roi", "margin"]),
    ("operations", &["inventory", "supply", "logistics", "fulfillment", "shipping"]),
    ("customer", &["customer", "client", "user", "satisfaction", "churn", "loyalty"]),
    ("product", &["product", "feature", "catalog", "category", "brand"]),
    ("hr", &["employee", "staff", "team", "performance", "productivity"]),
    ("technology", &["system", "application", "database", "api", "performance"]),
];

const TIME_SENSITIVE_TERMS: [&str; 6] = ["real-time", "current", "latest", "recent", "now", "today"];
const TIME_SERIES_TERMS: [&str; 4] = ["trend", "over time", "growth", "forecast"];
const ANALYTICAL_TERMS: [&str; 7] = [
    "analyze", "compare", "correlate", "forecast", "predict", "segment", "cluster",
];

fn find_all(regex: &Regex, text: &str) -> Vec<String> {
    regex.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntentScore {
    pub primary_intent: String,
    pub confidence: f64,
    pub all_intents: BTreeMap<String, f64>,
    pub is_multi_intent: bool,
}

impl Default for QueryIntentScore {
    fn default() -> Self {
        Self {
            primary_intent: "general_analysis".to_string(),
            confidence: 0.5,
            all_intents: BTreeMap::new(),
            is_multi_intent: false,
        }
    }
}

/// Keyword share scaled by the rule's base confidence, plus 0.2 per matching pattern
pub fn score_intent(query: &str) -> QueryIntentScore {
    let q = query.to_lowercase();
    let mut scores = BTreeMap::new();
    let mut best: Option<(&str, f64)> = None;

    for rule in INTENT_RULES.iter() {
        let mut score = 0.0;
        let keyword_hits = rule.keywords.iter().filter(|k| q.contains(*k)).count();
        if keyword_hits > 0 {
            score += rule.confidence_base * keyword_hits as f64 / rule.keywords.len() as f64;
        }
        let pattern_hits = rule.patterns.iter().filter(|p| p.is_match(&q)).count();
        score += 0.2 * pattern_hits as f64;

        if score > 0.0 {
            let score = score.min(1.0);
            scores.insert(rule.name.to_string(), score);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((rule.name, score));
            }
        }
    }

    match best {
        Some((name, confidence)) => QueryIntentScore {
            primary_intent: name.to_string(),
            confidence,
            is_multi_intent: scores.values().filter(|s| **s > 0.6).count() > 1,
            all_intents: scores,
        },
        None => QueryIntentScore::default(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub time_periods: Vec<String>,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub operations: Vec<String>,
    pub comparisons: Vec<String>,
}

impl Entities {
    fn total(&self) -> usize {
        self.time_periods.len()
            + self.metrics.len()
            + self.dimensions.len()
            + self.operations.len()
            + self.comparisons.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticContext {
    pub entities: Entities,
    /// `{metric}_by_{dimension}` for every metric/dimension pair
    pub relationships: Vec<String>,
    pub richness_score: f64,
    pub semantic_complexity: usize,
}

impl Default for SemanticContext {
    fn default() -> Self {
        Self {
            entities: Entities::default(),
            relationships: Vec::new(),
            richness_score: 0.1,
            semantic_complexity: 0,
        }
    }
}

pub fn extract_semantic_context(query: &str) -> SemanticContext {
    let q = query.to_lowercase();
    let entities = Entities {
        time_periods: find_all(&TIME_PERIODS, &q),
        metrics: find_all(&METRICS, &q),
        dimensions: find_all(&DIMENSIONS, &q),
        operations: find_all(&OPERATIONS, &q),
        comparisons: find_all(&COMPARISONS, &q),
    };

    let relationships: Vec<String> = entities
        .metrics
        .iter()
        .flat_map(|m| entities.dimensions.iter().map(move |d| format!("{}_by_{}", m, d)))
        .collect();

    SemanticContext {
        richness_score: (entities.total() as f64 / 10.0).min(1.0),
        semantic_complexity: relationships.len(),
        relationships,
        entities,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimePatterns {
    pub specific_periods: Vec<String>,
    pub relative_periods: Vec<String>,
    pub time_ranges: Vec<String>,
    pub temporal_modifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub time_patterns: TimePatterns,
    pub temporal_complexity: usize,
    pub time_sensitivity: usize,
    pub requires_time_series: bool,
}

pub fn analyze_temporal_context(query: &str) -> TemporalContext {
    let q = query.to_lowercase();
    let time_patterns = TimePatterns {
        specific_periods: find_all(&SPECIFIC_PERIODS, &q),
        relative_periods: find_all(&RELATIVE_PERIODS, &q),
        time_ranges: find_all(&TIME_RANGES, &q),
        temporal_modifiers: find_all(&TEMPORAL_MODIFIERS, &q),
    };
    let temporal_complexity = time_patterns.specific_periods.len()
        + time_patterns.relative_periods.len()
        + time_patterns.time_ranges.len()
        + time_patterns.temporal_modifiers.len();

    TemporalContext {
        time_patterns,
        temporal_complexity,
        time_sensitivity: TIME_SENSITIVE_TERMS.iter().filter(|t| q.contains(*t)).count(),
        requires_time_series: TIME_SERIES_TERMS.iter().any(|t| q.contains(t)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    pub primary_domain: String,
    pub domain_confidence: f64,
    pub all_domains: BTreeMap<String, f64>,
    pub is_cross_domain: bool,
}

impl Default for DomainContext {
    fn default() -> Self {
        Self {
            primary_domain: "general".to_string(),
            domain_confidence: 0.1,
            all_domains: BTreeMap::new(),
            is_cross_domain: false,
        }
    }
}

pub fn identify_domain(query: &str) -> DomainContext {
    let q = query.to_lowercase();
    let mut scores = BTreeMap::new();
    let mut best: Option<(&str, f64)> = None;

    for (domain, indicators) in DOMAIN_INDICATORS.iter() {
        let hits = indicators.iter().filter(|i| q.contains(*i)).count();
        if hits > 0 {
            let score = hits as f64 / indicators.len() as f64;
            scores.insert(domain.to_string(), score);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((domain, score));
            }
        }
    }

    match best {
        Some((domain, confidence)) => DomainContext {
            primary_domain: domain.to_string(),
            domain_confidence: confidence,
            is_cross_domain: scores.values().filter(|s| **s > 0.3).count() > 1,
            all_domains: scores,
        },
        None => DomainContext::default(),
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl ComplexityLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            ComplexityLevel::Simple
        } else if score < 0.6 {
            ComplexityLevel::Moderate
        } else if score < 0.8 {
            ComplexityLevel::Complex
        } else {
            ComplexityLevel::VeryComplex
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    pub question_words: usize,
    pub conjunctions: usize,
    pub analytical_complexity: usize,
    pub overall_complexity: f64,
    pub complexity_level: ComplexityLevel,
}

impl Default for ComplexityAnalysis {
    fn default() -> Self {
        Self {
            word_count: 0,
            sentence_count: 1,
            avg_sentence_length: 0.0,
            question_words: 0,
            conjunctions: 0,
            analytical_complexity: 0,
            overall_complexity: 0.5,
            complexity_level: ComplexityLevel::Moderate,
        }
    }
}

/// Weighted blend of length, question words, conjunctions and analytical verbs
pub fn analyze_complexity(query: &str) -> ComplexityAnalysis {
    let q = query.to_lowercase();
    let word_count = query.split_whitespace().count();
    let sentence_count = query.matches(['.', '?', '!']).count() + 1;
    let question_words = QUESTION_WORDS.find_iter(&q).count();
    let conjunctions = CONJUNCTIONS.find_iter(&q).count();
    let analytical_complexity = ANALYTICAL_TERMS.iter().filter(|t| q.contains(*t)).count();

    let overall_complexity = (word_count as f64 / 20.0).min(1.0) * 0.3
        + (question_words as f64 / 3.0).min(1.0) * 0.2
        + (conjunctions as f64 / 2.0).min(1.0) * 0.2
        + (analytical_complexity as f64 / 3.0).min(1.0) * 0.3;

    ComplexityAnalysis {
        word_count,
        sentence_count,
        avg_sentence_length: word_count as f64 / sentence_count as f64,
        question_words,
        conjunctions,
        analytical_complexity,
        overall_complexity,
        complexity_level: ComplexityLevel::from_score(overall_complexity),
    }
}

/// Coarse 1..=5 rank used when comparing queries across a conversation
pub fn complexity_rank(query: &str) -> u32 {
    let q = query.to_lowercase();
    let mut rank = 1;

    rank += ["sales", "performance", "trend", "ranking", "comparison"]
        .iter()
        .filter(|t| q.contains(*t))
        .count() as u32;
    if ["q1", "q2", "q3", "q4", "quarter", "month", "year"]
        .iter()
        .any(|p| q.contains(p))
    {
        rank += 1;
    }
    if ["by region", "by product", "by category"].iter().any(|g| q.contains(g)) {
        rank += 1;
    }
    if ["forecast", "predict", "anomaly", "cluster"].iter().any(|a| q.contains(a)) {
        rank += 1;
    }
    let questions = query.matches('?').count() as u32;
    if questions > 1 {
        rank += questions - 1;
    }
    rank += query.matches(" and ").count() as u32;

    rank.min(5)
}
