//! Weighted analytics-term vectors for cheap query similarity.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Vocabulary in alphabetical order with per-term weights
const ANALYTICS_TERMS: [(&str, f64); 16] = [
    ("analysis", 1.8),
    ("anomaly", 2.0),
    ("correlation", 2.0),
    ("customer", 1.8),
    ("dashboard", 1.5),
    ("forecast", 2.0),
    ("growth", 1.8),
    ("performance", 1.8),
    ("product", 1.8),
    ("profit", 2.0),
    ("region", 1.5),
    ("revenue", 2.0),
    ("sales", 2.0),
    ("segment", 1.5),
    ("time", 1.5),
    ("trend", 2.0),
];

pub(crate) fn words(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextVector {
    weights: [f64; ANALYTICS_TERMS.len()],
}

impl ContextVector {
    pub fn new(text: &str) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in words(text) {
            *counts.entry(word).or_default() += 1;
        }

        let mut weights = [0.0; ANALYTICS_TERMS.len()];
        for (slot, (term, weight)) in weights.iter_mut().zip(ANALYTICS_TERMS.iter()) {
            *slot = counts.get(*term).copied().unwrap_or(0) as f64 * weight;
        }

        let magnitude = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        if magnitude > 0.0 {
            for w in weights.iter_mut() {
                *w /= magnitude;
            }
        }
        Self { weights }
    }

    /// Cosine similarity clamped to [0, 1]; zero when either text has no analytics terms
    pub fn similarity(&self, other: &ContextVector) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(other.weights.iter())
            .map(|(a, b)| a * b)
            .sum();
        dot.clamp(0.0, 1.0)
    }
}
