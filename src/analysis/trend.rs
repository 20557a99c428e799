use chrono::NaiveDate;
use serde::Serialize;

use super::Analyzer;
use crate::canonical::CanonicalField;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub date: NaiveDate,
    pub platform: Option<String>,
    pub spend: f64,
    pub clicks: f64,
    pub impressions: f64,
    pub conversions: f64,
    pub cpc: Option<f64>,
    pub ctr: Option<f64>,
    pub cvr: Option<f64>,
}

impl Analyzer {
    /// Per-day totals, split by platform when the table carries one.
    pub fn daily_trend(&self) -> Vec<TrendRow> {
        let split_platform = self.table.has_dimension(CanonicalField::Platform);
        self.totals_by(|record| {
            (
                record.date,
                split_platform.then(|| record.platform.clone()),
            )
        })
        .into_iter()
        .map(|((date, platform), totals)| TrendRow {
            date,
            platform,
            spend: totals.spend,
            clicks: totals.clicks,
            impressions: totals.impressions,
            conversions: totals.conversions,
            cpc: totals.cpc(),
            ctr: totals.ctr_percent(),
            cvr: totals.cvr_percent(),
        })
        .collect()
    }
}
