//! Read-only analytical views over a canonical table.
//!
//! [`Analyzer`] keeps a private copy of the table (derived ratios refreshed
//! once at construction) and exposes each view as a method returning plain
//! rows. Views are independent of one another and never mutate the copy.
//!
//! | View | Method |
//! |---|---|
//! | Summary KPIs | [`Analyzer::summary_kpis`] |
//! | Daily trend | [`Analyzer::daily_trend`] |
//! | Platform efficiency | [`Analyzer::platform_efficiency`] |
//! | Geo performance | [`Analyzer::geo_performance`] |
//! | Device/placement breakdown | [`Analyzer::placement_breakdown`] |
//! | Audience conversion | [`Analyzer::audience_conversion`] |
//! | CPC anomalies | [`Analyzer::cpc_anomalies`] |
//! | A/B significance | [`Analyzer::ab_test`] |
//! | Spend forecast | [`Analyzer::spend_forecast`] |
//! | Attribution flow | [`Analyzer::attribution_flow`] |
//! | Keyword frequency | [`Analyzer::keyword_frequency`] |
//! | Funnel | [`Analyzer::funnel`] |
//! | Campaign cohorts | [`Analyzer::campaign_cohorts`] |

pub mod anomaly;
pub mod attribution;
pub mod audience;
pub mod breakdown;
pub mod cohort;
pub mod forecast;
pub mod funnel;
pub mod keywords;
pub mod kpi;
pub mod trend;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;

use crate::{
    canonical::{CanonicalRecord, CanonicalTable},
    config::AnalysisOptions,
    error::PipelineError,
    metrics::Totals,
};

pub use ab_test::{AbTestDetails, AbTestResult, AbTestStatus};
pub use anomaly::AnomalyRow;
pub use attribution::AttributionFlow;
pub use audience::AudienceRow;
pub use breakdown::{GeoRow, PlacementRow, PlatformRow};
pub use cohort::{CohortRow, CohortTable};
pub use forecast::{ForecastHistory, ForecastPoint, SpendForecast};
pub use funnel::FunnelStage;
pub use keywords::KeywordRow;
pub use kpi::SummaryKpis;
pub use trend::TrendRow;

pub struct Analyzer {
    table: CanonicalTable,
    options: AnalysisOptions,
}

impl Analyzer {
    pub fn new(table: &CanonicalTable, options: &AnalysisOptions) -> Result<Self, PipelineError> {
        if table.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let mut table = table.clone();
        for record in &mut table.records {
            record.refresh_derived();
        }
        debug!("Analyzer prepared over {} row(s)", table.len());
        Ok(Self {
            table,
            options: options.clone(),
        })
    }

    pub fn table(&self) -> &CanonicalTable {
        &self.table
    }

    fn records(&self) -> &[CanonicalRecord] {
        &self.table.records
    }

    /// Sums records per key in key order.
    fn totals_by<K, F>(&self, key: F) -> BTreeMap<K, Totals>
    where
        K: Ord,
        F: Fn(&CanonicalRecord) -> K,
    {
        let mut groups: BTreeMap<K, Totals> = BTreeMap::new();
        for record in self.records() {
            groups.entry(key(record)).or_default().add(record);
        }
        groups
    }

    /// Platform-collapsed totals per calendar day, ascending.
    fn daily_totals(&self) -> BTreeMap<NaiveDate, Totals> {
        self.totals_by(|record| record.date)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::canonical::{CanonicalRecord, CanonicalTable};

    pub fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date") + chrono::Duration::days(offset)
    }

    pub fn record(offset: i64, spend: f64, clicks: f64, conversions: f64) -> CanonicalRecord {
        let mut record = CanonicalRecord::blank("facebook.csv", day(offset));
        record.spend = spend;
        record.clicks = clicks;
        record.impressions = clicks * 20.0;
        record.conversions = conversions;
        record.refresh_derived();
        record
    }

    pub fn table(records: Vec<CanonicalRecord>) -> CanonicalTable {
        CanonicalTable {
            records,
            ..CanonicalTable::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::{record, table};

    #[test]
    fn empty_table_is_rejected() {
        let result = Analyzer::new(&CanonicalTable::default(), &AnalysisOptions::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn construction_does_not_touch_caller_table() {
        let mut source = table(vec![record(0, 10.0, 5.0, 1.0)]);
        source.records[0].cpc = None;
        let snapshot = source.clone();
        let analyzer = Analyzer::new(&source, &AnalysisOptions::default()).expect("analyzer");
        assert_eq!(source, snapshot);
        assert_eq!(analyzer.table().records[0].cpc, Some(2.0));
    }
}
