//! Number formatting and the markdown response document.

use crate::result::AnalysisResult;

/// Group the integer part of `digits` in thousands
fn group_thousands(digits: &str) -> String {
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let (sign, int_part) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// `$1,234.56`
pub fn currency(value: f64) -> String {
    format!("${}", group_thousands(&format!("{:.2}", value)))
}

/// `1,234`
pub fn thousands(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Ratio as a percentage with one decimal: `0.234` becomes `23.4%`
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// `snake_case` key as a title: `total_revenue` becomes `Total Revenue`
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut previous_alpha = false;
    for ch in key.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if previous_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(ch);
            previous_alpha = false;
        }
    }
    out
}

/// Render an analysis as the markdown document returned to clients
pub fn format_analytics_response(result: &AnalysisResult) -> String {
    if !result.success {
        return format!(
            "Error analyzing query: {}",
            result.error.as_deref().unwrap_or("Unknown error")
        );
    }

    let mut parts = vec!["# Analytics Results\n".to_string(), result.analysis.clone()];

    if !result.data_summary.is_empty() {
        parts.push("\n## Data Summary".to_string());
        for (key, value) in result.data_summary.iter() {
            parts.push(format!("- {}: {}", title_case(key), value));
        }
    }

    if !result.recommendations.is_empty() {
        parts.push("\n## Recommendations".to_string());
        for (i, rec) in result.recommendations.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, rec));
        }
    }

    if !result.visualizations.is_empty() {
        parts.push("\n## Visualizations Generated".to_string());
        for (i, viz) in result.visualizations.iter().enumerate() {
            parts.push(format!("{}. **{}**: {}", i + 1, viz.title, viz.description));
            if viz.chart_image.is_some() {
                parts.push("   📊 Chart image generated successfully".to_string());
            }
            if !viz.data.is_empty() {
                parts.push(format!("   📈 Data points: {}", viz.data.len()));
            }
        }
    }

    parts.join("\n")
}
