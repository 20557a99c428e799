use std::collections::BTreeMap;

use serde::Serialize;

use super::Analyzer;
use crate::{metrics::Totals, stats};

/// Whole-table aggregates handed to report assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryKpis {
    pub total_spend: f64,
    pub total_clicks: f64,
    pub total_impressions: f64,
    pub total_conversions: f64,
    pub total_reach: f64,
    pub avg_cpc: Option<f64>,
    /// Percentage.
    pub avg_ctr: Option<f64>,
    pub avg_cpm: Option<f64>,
    pub avg_frequency: Option<f64>,
    pub avg_sentiment: Option<f64>,
}

impl SummaryKpis {
    /// The KPI mapping keyed by stable names.
    pub fn as_mapping(&self) -> BTreeMap<&'static str, Option<f64>> {
        BTreeMap::from([
            ("total_spend", Some(self.total_spend)),
            ("total_clicks", Some(self.total_clicks)),
            ("total_impressions", Some(self.total_impressions)),
            ("total_conversions", Some(self.total_conversions)),
            ("total_reach", Some(self.total_reach)),
            ("avg_cpc", self.avg_cpc),
            ("avg_ctr", self.avg_ctr),
            ("avg_cpm", self.avg_cpm),
            ("avg_frequency", self.avg_frequency),
            ("avg_sentiment", self.avg_sentiment),
        ])
    }
}

impl Analyzer {
    pub fn summary_kpis(&self) -> SummaryKpis {
        let totals = Totals::from_records(self.records());
        let sentiments = self
            .records()
            .iter()
            .filter_map(|record| record.sentiment)
            .collect::<Vec<_>>();
        SummaryKpis {
            total_spend: totals.spend,
            total_clicks: totals.clicks,
            total_impressions: totals.impressions,
            total_conversions: totals.conversions,
            total_reach: totals.reach,
            avg_cpc: totals.cpc(),
            avg_ctr: totals.ctr_percent(),
            avg_cpm: totals.cpm(),
            avg_frequency: totals.frequency(),
            avg_sentiment: stats::mean(&sentiments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::test_support::{record, table},
        config::AnalysisOptions,
    };

    #[test]
    fn kpis_aggregate_before_dividing() {
        let mut first = record(0, 30.0, 10.0, 2.0);
        first.sentiment = Some(0.5);
        let second = record(1, 10.0, 10.0, 0.0);
        let analyzer = Analyzer::new(&table(vec![first, second]), &AnalysisOptions::default())
            .expect("analyzer");
        let kpis = analyzer.summary_kpis();
        assert_eq!(kpis.total_spend, 40.0);
        assert_eq!(kpis.avg_cpc, Some(2.0));
        assert_eq!(kpis.avg_ctr, Some(5.0));
        assert_eq!(kpis.avg_cpm, Some(100.0));
        assert_eq!(kpis.avg_frequency, None);
        assert_eq!(kpis.avg_sentiment, Some(0.5));
        assert_eq!(kpis.as_mapping()["avg_ctr"], Some(5.0));
    }

    #[test]
    fn zero_clicks_leave_ratios_undefined() {
        let analyzer = Analyzer::new(
            &table(vec![record(0, 30.0, 0.0, 0.0)]),
            &AnalysisOptions::default(),
        )
        .expect("analyzer");
        let kpis = analyzer.summary_kpis();
        assert_eq!(kpis.avg_cpc, None);
        assert_eq!(kpis.avg_ctr, None);
        assert_eq!(kpis.avg_cpm, None);
        assert_eq!(kpis.avg_sentiment, None);
    }
}
