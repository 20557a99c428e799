//! Campaign retention by launch week.
//!
//! A campaign belongs to the cohort of the ISO week (Monday start) in which
//! it first appears. For every later week the cohort reports the share of its
//! campaigns that still spent, together with the cohort's spend that week.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::Analyzer;
use crate::canonical::UNKNOWN;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    pub cohort_week: NaiveDate,
    pub campaigns: usize,
    /// Percent of the cohort's campaigns with spend, per elapsed week.
    /// `None` past the last observed week.
    pub retention: Vec<Option<f64>>,
    pub spend: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortTable {
    pub weeks_observed: usize,
    pub rows: Vec<CohortRow>,
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn weeks_between(from: NaiveDate, to: NaiveDate) -> usize {
    ((to - from).num_days() / 7).max(0) as usize
}

impl Analyzer {
    pub fn campaign_cohorts(&self) -> CohortTable {
        let mut first_seen: BTreeMap<&str, NaiveDate> = BTreeMap::new();
        let mut weekly_spend: BTreeMap<(&str, NaiveDate), f64> = BTreeMap::new();
        for record in self.records() {
            if record.campaign == UNKNOWN {
                continue;
            }
            let week = week_start(record.date);
            let first = first_seen.entry(record.campaign.as_str()).or_insert(week);
            if week < *first {
                *first = week;
            }
            *weekly_spend
                .entry((record.campaign.as_str(), week))
                .or_default() += record.spend;
        }
        let Some(last_week) = weekly_spend.keys().map(|(_, week)| *week).max() else {
            return CohortTable::default();
        };

        let mut cohorts: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
        for (campaign, week) in &first_seen {
            cohorts.entry(*week).or_default().insert(*campaign);
        }
        let skip = cohorts.len().saturating_sub(self.options.cohort_limit);
        let kept = cohorts.into_iter().skip(skip).collect::<Vec<_>>();
        let Some(earliest) = kept.first().map(|(week, _)| *week) else {
            return CohortTable::default();
        };
        let width = weeks_between(earliest, last_week) + 1;

        let rows = kept
            .into_iter()
            .map(|(cohort_week, members)| {
                let available = weeks_between(cohort_week, last_week) + 1;
                let mut retention = vec![None; width];
                let mut spend = vec![None; width];
                for offset in 0..available.min(width) {
                    let week = cohort_week + Duration::weeks(offset as i64);
                    let mut active = 0usize;
                    let mut total = 0.0;
                    for campaign in &members {
                        let value = weekly_spend.get(&(*campaign, week)).copied().unwrap_or(0.0);
                        if value > 0.0 {
                            active += 1;
                        }
                        total += value;
                    }
                    retention[offset] = Some(active as f64 / members.len() as f64 * 100.0);
                    spend[offset] = Some(total);
                }
                CohortRow {
                    cohort_week,
                    campaigns: members.len(),
                    retention,
                    spend,
                }
            })
            .collect();

        CohortTable {
            weeks_observed: width,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::test_support::{day, record, table},
        canonical::CanonicalRecord,
        config::AnalysisOptions,
    };

    fn campaign_day(name: &str, offset: i64, spend: f64) -> CanonicalRecord {
        let mut record = record(offset, spend, 1.0, 0.0);
        record.campaign = name.to_string();
        record
    }

    #[test]
    fn week_start_is_monday() {
        // 2024-01-01 is a Monday.
        assert_eq!(week_start(day(0)), day(0));
        assert_eq!(week_start(day(6)), day(0));
        assert_eq!(week_start(day(7)), day(7));
    }

    #[test]
    fn retention_tracks_real_activity() {
        let analyzer = Analyzer::new(
            &table(vec![
                campaign_day("A", 0, 10.0),
                campaign_day("B", 1, 5.0),
                campaign_day("A", 8, 4.0),
                campaign_day("B", 9, 0.0),
                campaign_day("C", 10, 7.0),
            ]),
            &AnalysisOptions::default(),
        )
        .expect("analyzer");
        let cohorts = analyzer.campaign_cohorts();
        assert_eq!(cohorts.weeks_observed, 2);
        assert_eq!(cohorts.rows.len(), 2);

        let first = &cohorts.rows[0];
        assert_eq!(first.cohort_week, day(0));
        assert_eq!(first.campaigns, 2);
        assert_eq!(first.retention, vec![Some(100.0), Some(50.0)]);
        assert_eq!(first.spend, vec![Some(15.0), Some(4.0)]);

        let second = &cohorts.rows[1];
        assert_eq!(second.campaigns, 1);
        assert_eq!(second.retention, vec![Some(100.0), None]);
    }

    #[test]
    fn is_deterministic() {
        let records = vec![campaign_day("A", 0, 1.0), campaign_day("B", 14, 2.0)];
        let analyzer =
            Analyzer::new(&table(records), &AnalysisOptions::default()).expect("analyzer");
        assert_eq!(analyzer.campaign_cohorts(), analyzer.campaign_cohorts());
    }
}
