use chrono::NaiveDate;
use serde::Serialize;

use super::Analyzer;
use crate::stats::{self, Band};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    pub date: NaiveDate,
    pub spend: f64,
    pub clicks: f64,
    pub cpc: Option<f64>,
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
    pub is_anomaly: bool,
}

impl Analyzer {
    /// Flags days whose CPC exceeds the trailing mean + kσ band.
    ///
    /// The band for a day is built from the `anomaly_window` preceding days
    /// that have a defined CPC; with less history the band is undefined and
    /// the day is never flagged.
    pub fn cpc_anomalies(&self) -> Vec<AnomalyRow> {
        let daily = self.daily_totals();
        let defined = daily
            .values()
            .filter_map(|totals| totals.cpc())
            .collect::<Vec<_>>();
        let bands = stats::trailing_bounds(
            &defined,
            self.options.anomaly_window,
            self.options.anomaly_sigmas,
        );

        let mut next_band = bands.into_iter();
        daily
            .into_iter()
            .map(|(date, totals)| {
                let cpc = totals.cpc();
                let band: Option<Band> = match cpc {
                    Some(_) => next_band.next().flatten(),
                    None => None,
                };
                let is_anomaly = matches!((cpc, band), (Some(value), Some(band)) if value > band.upper);
                AnomalyRow {
                    date,
                    spend: totals.spend,
                    clicks: totals.clicks,
                    cpc,
                    rolling_mean: band.map(|b| b.mean),
                    rolling_std: band.map(|b| b.std_dev),
                    upper_bound: band.map(|b| b.upper),
                    lower_bound: band.map(|b| b.lower),
                    is_anomaly,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::test_support::{record, table},
        config::AnalysisOptions,
    };

    fn options(window: usize) -> AnalysisOptions {
        AnalysisOptions {
            anomaly_window: window,
            ..AnalysisOptions::default()
        }
    }

    #[test]
    fn spike_after_stable_history_is_flagged() {
        let mut records = (0..7)
            .map(|day| record(day, 10.0 + (day % 2) as f64, 10.0, 0.0))
            .collect::<Vec<_>>();
        records.push(record(7, 50.0, 10.0, 0.0));
        let analyzer = Analyzer::new(&table(records), &options(7)).expect("analyzer");
        let rows = analyzer.cpc_anomalies();
        assert_eq!(rows.len(), 8);
        assert!(rows[..7].iter().all(|row| row.upper_bound.is_none() && !row.is_anomaly));
        let spike = &rows[7];
        assert_eq!(spike.cpc, Some(5.0));
        assert!(spike.upper_bound.expect("upper") < 5.0);
        assert!(spike.is_anomaly);
    }

    #[test]
    fn zero_click_days_are_reported_but_skipped_as_history() {
        let records = vec![
            record(0, 10.0, 10.0, 0.0),
            record(1, 10.0, 0.0, 0.0),
            record(2, 10.0, 10.0, 0.0),
            record(3, 30.0, 10.0, 0.0),
        ];
        let analyzer = Analyzer::new(&table(records), &options(2)).expect("analyzer");
        let rows = analyzer.cpc_anomalies();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].cpc, None);
        assert_eq!(rows[1].upper_bound, None);
        assert!(!rows[1].is_anomaly);
        assert_eq!(rows[2].upper_bound, None);
        assert_eq!(rows[3].rolling_mean, Some(1.0));
        assert_eq!(rows[3].rolling_std, Some(0.0));
        assert!(rows[3].is_anomaly);
    }
}
