//! Sales dataset loaded from CSV or JSON records.

use analytics_agent_common::{AnalyticsError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub region: String,
    pub product: String,
    pub revenue: f64,
    pub sales_count: u64,
    pub profit_margin: f64,
}

impl SalesRecord {
    pub fn quarter(&self) -> u32 {
        (self.date.month() - 1) / 3 + 1
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[self.date.month0() as usize]
    }
}

#[derive(Debug, Clone, Default)]
pub struct SalesDataset {
    records: Vec<SalesRecord>,
}

/// Sum `value` per key, keeping the order keys first appear in
fn sum_by<'a, K, F>(records: &'a [SalesRecord], key: K, value: F) -> Vec<(String, f64)>
where
    K: Fn(&'a SalesRecord) -> &'a str,
    F: Fn(&SalesRecord) -> f64,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sums: Vec<(String, f64)> = Vec::new();
    for record in records {
        let k = key(record);
        match index.get(k) {
            Some(&i) => sums[i].1 += value(record),
            None => {
                index.insert(k, sums.len());
                sums.push((k.to_string(), value(record)));
            }
        }
    }
    sums
}

fn sort_desc(mut pairs: Vec<(String, f64)>) -> Vec<(String, f64)> {
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

impl SalesDataset {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        Self { records }
    }

    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<SalesRecord>, _>>()
            .map_err(|e| AnalyticsError::Analytics(format!("Failed to parse CSV: {}", e)))?;
        Ok(Self { records })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let records: Vec<SalesRecord> = serde_json::from_str(content)?;
        Ok(Self { records })
    }

    /// Parse by the extension of `key`
    pub fn from_object(key: &str, content: &str) -> Result<Self> {
        let ext = key.rsplit('.').next().unwrap_or_default().to_lowercase();
        match ext.as_str() {
            "csv" => Self::from_csv(content),
            "json" => Self::from_json(content),
            other => Err(AnalyticsError::Analytics(format!(
                "Unsupported file format: {}",
                other
            ))),
        }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter_quarter(&self, quarter: u32) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.quarter() == quarter)
                .cloned()
                .collect(),
        }
    }

    /// Narrow to a quarter when it has rows; otherwise keep the full period
    pub fn for_quarter(&self, quarter: Option<u32>) -> Self {
        match quarter.map(|q| self.filter_quarter(q)) {
            Some(narrowed) if !narrowed.is_empty() => narrowed,
            _ => self.clone(),
        }
    }

    pub fn total_revenue(&self) -> f64 {
        self.records.iter().map(|r| r.revenue).sum()
    }

    pub fn total_sales(&self) -> u64 {
        self.records.iter().map(|r| r.sales_count).sum()
    }

    pub fn revenues(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.revenue).collect()
    }

    pub fn sales_counts(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.sales_count as f64).collect()
    }

    pub fn profit_margins(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.profit_margin).collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Revenue per region, highest first
    pub fn revenue_by_region(&self) -> Vec<(String, f64)> {
        sort_desc(sum_by(&self.records, |r| r.region.as_str(), |r| r.revenue))
    }

    /// Revenue per product, highest first
    pub fn revenue_by_product(&self) -> Vec<(String, f64)> {
        sort_desc(sum_by(&self.records, |r| r.product.as_str(), |r| r.revenue))
    }

    /// Revenue per month name in calendar order
    pub fn revenue_by_month(&self) -> Vec<(String, f64)> {
        self.by_month(|values| values.iter().sum())
    }

    /// Mean revenue per month name in calendar order
    pub fn mean_revenue_by_month(&self) -> Vec<(String, f64)> {
        self.by_month(|values| values.iter().sum::<f64>() / values.len() as f64)
    }

    fn by_month<F: Fn(&[f64]) -> f64>(&self, reduce: F) -> Vec<(String, f64)> {
        let mut months: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for record in &self.records {
            months.entry(record.date.month0()).or_default().push(record.revenue);
        }
        months
            .into_iter()
            .map(|(month0, values)| (MONTH_NAMES[month0 as usize].to_string(), reduce(&values)))
            .collect()
    }

    /// Mean profit margin per region, lowest first
    pub fn margin_by_region(&self) -> Vec<(String, f64)> {
        let sums = sum_by(&self.records, |r| r.region.as_str(), |r| r.profit_margin);
        let counts = sum_by(&self.records, |r| r.region.as_str(), |_| 1.0);
        let mut means: Vec<(String, f64)> = sums
            .into_iter()
            .zip(counts)
            .map(|((region, total), (_, count))| (region, total / count))
            .collect();
        means.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        means
    }

    /// Revenue summed per date, sorted by date
    pub fn daily_revenue(&self) -> Vec<(NaiveDate, f64)> {
        let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in &self.records {
            *days.entry(record.date).or_insert(0.0) += record.revenue;
        }
        days.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "date,region,product,revenue,sales_count,profit_margin
2024-01-15,North,Widget,1000.0,10,0.25
2024-02-15,South,Gadget,3000.0,30,0.15
2024-04-10,North,Gadget,2000.0,20,0.35
2024-05-20,East,Widget,500.0,5,0.20
";

    #[test]
    fn test_parse_csv_and_group() {
        let ds = SalesDataset::from_csv(CSV).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.total_revenue(), 6500.0);
        assert_eq!(ds.total_sales(), 65);

        let regions = ds.revenue_by_region();
        assert_eq!(regions[0], ("North".to_string(), 3000.0));
        assert_eq!(regions[0].0, "North");
        assert_eq!(regions[2], ("East".to_string(), 500.0));

        let months: Vec<_> = ds.revenue_by_month().into_iter().map(|(m, _)| m).collect();
        assert_eq!(months, vec!["January", "February", "April", "May"]);
    }

    #[test]
    fn test_ties_break_alphabetically() {
        let ds = SalesDataset::from_csv(CSV).unwrap();
        let products = ds.revenue_by_product();
        // Gadget 5000, Widget 1500
        assert_eq!(products[0].0, "Gadget");
    }

    #[test]
    fn test_quarter_filter_and_margins() {
        let ds = SalesDataset::from_csv(CSV).unwrap().filter_quarter(2);
        assert_eq!(ds.len(), 2);

        let margins = ds.margin_by_region();
        assert_eq!(margins[0].0, "East");
        assert!((margins[1].1 - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_quarter_without_rows_keeps_full_period() {
        let ds = SalesDataset::from_csv(CSV).unwrap();
        assert_eq!(ds.for_quarter(Some(2)).len(), 2);
        assert_eq!(ds.for_quarter(Some(4)).len(), ds.len());
        assert_eq!(ds.for_quarter(None).len(), ds.len());
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(SalesDataset::from_object("data/sales.parquet", "").is_err());
        assert!(SalesDataset::from_object("data/sales.json", "[]").unwrap().is_empty());
    }
}
