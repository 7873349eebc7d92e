//! Keyword-driven natural language to SQL translation over the analytics schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:from|join)\s+([a-zA-Z_][a-zA-Z0-9_.]*)").expect("valid regex"));

static LIMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"limit\s+(\d+)").expect("valid regex"));

const SALES_BY_REGION: &str = "SELECT
    region,
    SUM(total_amount) as total_sales,
    COUNT(*) as transaction_count,
    AVG(total_amount) as avg_transaction_value
FROM sales.transactions
WHERE transaction_date >= CURRENT_DATE - INTERVAL '90 days'
GROUP BY region
ORDER BY total_sales DESC;";

const MONTHLY_SALES: &str = "SELECT
    DATE_TRUNC('month', transaction_date) as month,
    SUM(total_amount) as monthly_sales,
    COUNT(*) as transaction_count
FROM sales.transactions
WHERE transaction_date >= CURRENT_DATE - INTERVAL '12 months'
GROUP BY DATE_TRUNC('month', transaction_date)
ORDER BY month;";

const TOP_PRODUCTS: &str = "SELECT
    p.product_name,
    p.category,
    SUM(t.quantity) as total_quantity_sold,
    SUM(t.total_amount) as total_revenue
FROM sales.transactions t
JOIN public.products p ON t.product_id = p.product_id
WHERE t.transaction_date >= CURRENT_DATE - INTERVAL '90 days'
GROUP BY p.product_id, p.product_name, p.category
ORDER BY total_revenue DESC
LIMIT 10;";

const SALES_OVERVIEW: &str = "SELECT
    COUNT(*) as total_transactions,
    SUM(total_amount) as total_sales,
    AVG(total_amount) as avg_transaction_value,
    MIN(transaction_date) as earliest_transaction,
    MAX(transaction_date) as latest_transaction
FROM sales.transactions;";

const CUSTOMER_SEGMENTS: &str = "SELECT
    customer_segment,
    COUNT(*) as customer_count,
    AVG(total_spent.amount) as avg_spending
FROM public.customers c
LEFT JOIN (
    SELECT customer_id, SUM(total_amount) as amount
    FROM sales.transactions
    GROUP BY customer_id
) total_spent ON c.customer_id = total_spent.customer_id
GROUP BY customer_segment
ORDER BY customer_count DESC;";

const CUSTOMER_OVERVIEW: &str = "SELECT
    COUNT(*) as total_customers,
    COUNT(CASE WHEN registration_date >= CURRENT_DATE - INTERVAL '30 days' THEN 1 END) as new_customers_30d,
    customer_segment,
    COUNT(*) as segment_count
FROM public.customers
GROUP BY customer_segment
ORDER BY segment_count DESC;";

const PRODUCT_CATEGORIES: &str = "SELECT
    category,
    COUNT(*) as product_count,
    AVG(price) as avg_price,
    MIN(price) as min_price,
    MAX(price) as max_price
FROM public.products
GROUP BY category
ORDER BY product_count DESC;";

const DATA_OVERVIEW: &str = "SELECT
    'sales' as data_type,
    COUNT(*) as record_count
FROM sales.transactions
UNION ALL
SELECT
    'customers' as data_type,
    COUNT(*) as record_count
FROM public.customers
UNION ALL
SELECT
    'products' as data_type,
    COUNT(*) as record_count
FROM public.products;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub success: bool,
    pub sql_query: String,
    pub explanation: String,
    pub estimated_rows: u64,
    pub complexity: QueryComplexity,
    pub tables_used: Vec<String>,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Pick the query template and explanation matching `query`.
fn select_template(query: &str) -> (&'static str, &'static str) {
    let q = query.to_lowercase();

    if contains_any(&q, &["sales", "revenue", "transaction"]) {
        if q.contains("region") {
            (SALES_BY_REGION, "Analyzing sales performance by region for the last 90 days")
        } else if q.contains("month") {
            (MONTHLY_SALES, "Analyzing monthly sales trends for the last 12 months")
        } else if contains_any(&q, &["top products", "best selling"]) {
            (TOP_PRODUCTS, "Finding top 10 best-selling products by revenue in the last 90 days")
        } else {
            (SALES_OVERVIEW, "General sales overview and summary statistics")
        }
    } else if contains_any(&q, &["customer", "client"]) {
        if q.contains("segment") {
            (CUSTOMER_SEGMENTS, "Analyzing customer segments and their spending patterns")
        } else {
            (CUSTOMER_OVERVIEW, "Customer overview including new customer acquisition")
        }
    } else if contains_any(&q, &["product", "inventory"]) {
        (PRODUCT_CATEGORIES, "Product analysis by category with pricing information")
    } else {
        (DATA_OVERVIEW, "General data overview showing record counts for main tables")
    }
}

pub fn natural_language_to_sql(query: &str) -> GeneratedSql {
    let (sql, explanation) = select_template(query);
    GeneratedSql {
        success: true,
        sql_query: sql.to_string(),
        explanation: explanation.to_string(),
        estimated_rows: estimate_rows(sql),
        complexity: assess_complexity(sql),
        tables_used: extract_tables(sql),
    }
}

/// Rough result-size guess used for display only.
pub fn estimate_rows(sql: &str) -> u64 {
    let q = sql.to_lowercase();

    if q.contains("group by") {
        return if q.contains("region") {
            4
        } else if q.contains("month") {
            12
        } else if q.contains("category") {
            5
        } else {
            10
        };
    }
    if let Some(limit) = LIMIT_PATTERN
        .captures(&q)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
    {
        return limit;
    }

    if q.contains("transactions") {
        1000
    } else if q.contains("customers") {
        100
    } else if q.contains("products") {
        50
    } else {
        100
    }
}

pub fn assess_complexity(sql: &str) -> QueryComplexity {
    let q = sql.to_lowercase();
    let mut score = 0;

    if q.contains("join") {
        score += 2;
    }
    if q.contains("group by") {
        score += 1;
    }
    if q.contains("having") {
        score += 1;
    }
    if q.contains("subquery") || q.contains('(') {
        score += 2;
    }
    if q.contains("union") {
        score += 1;
    }
    if q.contains("window") || q.contains("over(") {
        score += 3;
    }

    match score {
        0 => QueryComplexity::Simple,
        1..=2 => QueryComplexity::Moderate,
        3..=4 => QueryComplexity::Complex,
        _ => QueryComplexity::VeryComplex,
    }
}

/// Table names after `FROM`/`JOIN`, lowercased, first occurrence order, no duplicates.
pub fn extract_tables(sql: &str) -> Vec<String> {
    let lowered = sql.to_lowercase();
    let mut tables: Vec<String> = Vec::new();
    for caps in TABLE_PATTERN.captures_iter(&lowered) {
        let table = caps[1].trim().to_string();
        if !table.is_empty() && !tables.contains(&table) {
            tables.push(table);
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_query_selects_regional_template() {
        let generated = natural_language_to_sql("Show me sales by region");
        assert!(generated.sql_query.contains("GROUP BY region"));
        assert_eq!(
            generated.explanation,
            "Analyzing sales performance by region for the last 90 days"
        );
        assert_eq!(generated.estimated_rows, 4);
        assert_eq!(generated.tables_used, vec!["sales.transactions"]);
    }

    #[test]
    fn test_customer_segment_query() {
        let generated = natural_language_to_sql("Which customer segment spends most?");
        assert!(generated.sql_query.contains("customer_segment"));
        assert_eq!(
            generated.tables_used,
            vec!["public.customers", "sales.transactions"]
        );
        // join + group by + parentheses
        assert_eq!(generated.complexity, QueryComplexity::VeryComplex);
    }

    #[test]
    fn test_unmatched_query_uses_overview() {
        let generated = natural_language_to_sql("hello there");
        assert!(generated.sql_query.contains("UNION ALL"));
        assert_eq!(
            generated.tables_used,
            vec!["sales.transactions", "public.customers", "public.products"]
        );
    }

    #[test]
    fn test_estimate_rows_reads_limit() {
        assert_eq!(estimate_rows("SELECT * FROM public.products LIMIT 25"), 25);
        assert_eq!(estimate_rows("SELECT * FROM public.customers"), 100);
        assert_eq!(estimate_rows("SELECT 1"), 100);
    }

    #[test]
    fn test_complexity_levels() {
        assert_eq!(assess_complexity("SELECT a FROM t"), QueryComplexity::Simple);
        assert_eq!(
            assess_complexity("SELECT a FROM t GROUP BY a"),
            QueryComplexity::Moderate
        );
        assert_eq!(
            assess_complexity("SELECT a FROM t JOIN u ON t.id = u.id GROUP BY a"),
            QueryComplexity::Complex
        );
    }
}
