//! Canonical advertising-performance model.
//!
//! Every normalized row, whatever export it came from, is a [`CanonicalRecord`]
//! carrying the fixed [`CanonicalField`] set plus the derived CPC/CTR/CVR
//! ratios. [`CanonicalTable`] owns the rows together with the unmapped source
//! columns that were preserved verbatim.

use std::{collections::BTreeSet, fmt, io::Write};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metrics::safe_ratio;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    Date,
    Spend,
    Clicks,
    Impressions,
    Reach,
    Conversions,
    Campaign,
    AdName,
    Platform,
    Country,
    Age,
    Gender,
    Device,
    Placement,
    Sentiment,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 15] = [
        CanonicalField::Date,
        CanonicalField::Spend,
        CanonicalField::Clicks,
        CanonicalField::Impressions,
        CanonicalField::Reach,
        CanonicalField::Conversions,
        CanonicalField::Campaign,
        CanonicalField::AdName,
        CanonicalField::Platform,
        CanonicalField::Country,
        CanonicalField::Age,
        CanonicalField::Gender,
        CanonicalField::Device,
        CanonicalField::Placement,
        CanonicalField::Sentiment,
    ];

    pub const METRICS: [CanonicalField; 5] = [
        CanonicalField::Spend,
        CanonicalField::Clicks,
        CanonicalField::Impressions,
        CanonicalField::Reach,
        CanonicalField::Conversions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "Date",
            CanonicalField::Spend => "Spend",
            CanonicalField::Clicks => "Clicks",
            CanonicalField::Impressions => "Impressions",
            CanonicalField::Reach => "Reach",
            CanonicalField::Conversions => "Conversions",
            CanonicalField::Campaign => "Campaign",
            CanonicalField::AdName => "AdName",
            CanonicalField::Platform => "Platform",
            CanonicalField::Country => "Country",
            CanonicalField::Age => "Age",
            CanonicalField::Gender => "Gender",
            CanonicalField::Device => "Device",
            CanonicalField::Placement => "Placement",
            CanonicalField::Sentiment => "Sentiment",
        }
    }

    pub fn is_metric(&self) -> bool {
        Self::METRICS.contains(self)
    }

    /// Text dimensions that fall back to [`UNKNOWN`] when blank.
    pub fn is_text_dimension(&self) -> bool {
        !self.is_metric() && !matches!(self, CanonicalField::Date | CanonicalField::Sentiment)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub source: String,
    pub date: NaiveDate,
    pub spend: f64,
    pub clicks: f64,
    pub impressions: f64,
    pub reach: f64,
    pub conversions: f64,
    pub campaign: String,
    pub ad_name: String,
    pub platform: String,
    pub country: String,
    pub age: String,
    pub gender: String,
    pub device: String,
    pub placement: String,
    pub sentiment: Option<f64>,
    pub cpc: Option<f64>,
    pub ctr: Option<f64>,
    pub cvr: Option<f64>,
    pub extras: Vec<Option<String>>,
}

impl CanonicalRecord {
    /// A record dated `date` with zeroed metrics and every text dimension unknown.
    pub fn blank(source: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            source: source.into(),
            date,
            spend: 0.0,
            clicks: 0.0,
            impressions: 0.0,
            reach: 0.0,
            conversions: 0.0,
            campaign: UNKNOWN.to_string(),
            ad_name: UNKNOWN.to_string(),
            platform: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            age: UNKNOWN.to_string(),
            gender: UNKNOWN.to_string(),
            device: UNKNOWN.to_string(),
            placement: UNKNOWN.to_string(),
            sentiment: None,
            cpc: None,
            ctr: None,
            cvr: None,
            extras: Vec::new(),
        }
    }

    /// Recomputes CPC, CTR and CVR. Each is `None` when its denominator is zero.
    pub fn refresh_derived(&mut self) {
        self.cpc = safe_ratio(self.spend, self.clicks);
        self.ctr = safe_ratio(self.clicks, self.impressions);
        self.cvr = safe_ratio(self.conversions, self.clicks);
    }

    pub fn metric(&self, field: CanonicalField) -> Option<f64> {
        match field {
            CanonicalField::Spend => Some(self.spend),
            CanonicalField::Clicks => Some(self.clicks),
            CanonicalField::Impressions => Some(self.impressions),
            CanonicalField::Reach => Some(self.reach),
            CanonicalField::Conversions => Some(self.conversions),
            CanonicalField::Sentiment => self.sentiment,
            _ => None,
        }
    }

    pub fn set_metric(&mut self, field: CanonicalField, value: f64) {
        match field {
            CanonicalField::Spend => self.spend = value,
            CanonicalField::Clicks => self.clicks = value,
            CanonicalField::Impressions => self.impressions = value,
            CanonicalField::Reach => self.reach = value,
            CanonicalField::Conversions => self.conversions = value,
            _ => {}
        }
    }

    pub fn dimension(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::Campaign => Some(&self.campaign),
            CanonicalField::AdName => Some(&self.ad_name),
            CanonicalField::Platform => Some(&self.platform),
            CanonicalField::Country => Some(&self.country),
            CanonicalField::Age => Some(&self.age),
            CanonicalField::Gender => Some(&self.gender),
            CanonicalField::Device => Some(&self.device),
            CanonicalField::Placement => Some(&self.placement),
            _ => None,
        }
    }

    pub fn set_dimension(&mut self, field: CanonicalField, value: String) {
        match field {
            CanonicalField::Campaign => self.campaign = value,
            CanonicalField::AdName => self.ad_name = value,
            CanonicalField::Platform => self.platform = value,
            CanonicalField::Country => self.country = value,
            CanonicalField::Age => self.age = value,
            CanonicalField::Gender => self.gender = value,
            CanonicalField::Device => self.device = value,
            CanonicalField::Placement => self.placement = value,
            _ => {}
        }
    }

    /// Renders the canonical column `field` the way it is written to CSV.
    pub fn render_field(&self, field: CanonicalField) -> String {
        match field {
            CanonicalField::Date => self.date.format("%Y-%m-%d").to_string(),
            CanonicalField::Sentiment => self.sentiment.map(format_number).unwrap_or_default(),
            other if other.is_metric() => self.metric(other).map(format_number).unwrap_or_default(),
            other => self.dimension(other).unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    pub records: Vec<CanonicalRecord>,
    /// Source columns that matched no canonical field, preserved in source order.
    pub extra_columns: Vec<String>,
    /// Canonical fields backed by a real source column rather than synthesized.
    pub sourced_fields: BTreeSet<CanonicalField>,
    /// Rows removed because their date was missing or unparseable.
    pub dropped_rows: usize,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Canonical columns in fixed order, then derived ratios, then preserved extras.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = CanonicalField::ALL
            .iter()
            .map(|field| field.as_str().to_string())
            .collect::<Vec<_>>();
        columns.extend(["CPC", "CTR", "CVR"].iter().map(|s| s.to_string()));
        columns.extend(self.extra_columns.iter().cloned());
        columns
    }

    pub fn is_sourced(&self, field: CanonicalField) -> bool {
        self.sourced_fields.contains(&field)
    }

    /// True when at least one row carries a real value for the text dimension.
    pub fn has_dimension(&self, field: CanonicalField) -> bool {
        self.records
            .iter()
            .any(|record| record.dimension(field).is_some_and(|value| value != UNKNOWN))
    }

    pub fn render_rows(&self, limit: Option<usize>) -> Vec<Vec<String>> {
        self.records
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|record| {
                let mut row = CanonicalField::ALL
                    .iter()
                    .map(|field| record.render_field(*field))
                    .collect::<Vec<_>>();
                for ratio in [record.cpc, record.ctr, record.cvr] {
                    row.push(ratio.map(format_number).unwrap_or_default());
                }
                for idx in 0..self.extra_columns.len() {
                    row.push(
                        record
                            .extras
                            .get(idx)
                            .cloned()
                            .flatten()
                            .unwrap_or_default(),
                    );
                }
                row
            })
            .collect()
    }

    pub fn write_csv<W: Write>(
        &self,
        writer: &mut csv::Writer<W>,
        limit: Option<usize>,
    ) -> Result<usize> {
        writer
            .write_record(self.columns())
            .context("Writing canonical headers")?;
        let rows = self.render_rows(limit);
        for (idx, row) in rows.iter().enumerate() {
            writer
                .write_record(row)
                .with_context(|| format!("Writing canonical row {}", idx + 1))?;
        }
        writer.flush().context("Flushing canonical output")?;
        Ok(rows.len())
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    #[test]
    fn derived_ratios_are_none_on_zero_denominators() {
        let mut record = CanonicalRecord::blank("a.csv", date());
        record.spend = 12.0;
        record.refresh_derived();
        assert_eq!(record.cpc, None);
        assert_eq!(record.ctr, None);
        assert_eq!(record.cvr, None);

        record.clicks = 4.0;
        record.impressions = 100.0;
        record.conversions = 1.0;
        record.refresh_derived();
        assert_eq!(record.cpc, Some(3.0));
        assert_eq!(record.ctr, Some(0.04));
        assert_eq!(record.cvr, Some(0.25));
    }

    #[test]
    fn columns_list_every_canonical_field_before_extras() {
        let table = CanonicalTable {
            extra_columns: vec!["Objective".to_string()],
            ..CanonicalTable::default()
        };
        let columns = table.columns();
        assert_eq!(columns.len(), CanonicalField::ALL.len() + 4);
        assert_eq!(columns[0], "Date");
        assert_eq!(columns.last().map(String::as_str), Some("Objective"));
    }
}
