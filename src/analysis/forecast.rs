use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::Analyzer;
use crate::stats::LinearFit;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastHistory {
    pub date: NaiveDate,
    pub day_index: i64,
    pub spend: f64,
    pub cumulative_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub day_index: i64,
    pub cumulative_spend: f64,
}

/// Cumulative spend history and its linear extrapolation. Empty when there
/// were too few distinct days to fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpendForecast {
    pub history: Vec<ForecastHistory>,
    pub projection: Vec<ForecastPoint>,
    pub fit: Option<LinearFit>,
}

impl SpendForecast {
    pub fn is_empty(&self) -> bool {
        self.projection.is_empty()
    }
}

impl Analyzer {
    pub fn spend_forecast(&self) -> SpendForecast {
        let daily = self.daily_totals();
        if daily.len() < self.options.forecast_min_days {
            return SpendForecast::default();
        }
        let Some(first_date) = daily.keys().next().copied() else {
            return SpendForecast::default();
        };

        let mut cumulative = 0.0;
        let history = daily
            .into_iter()
            .map(|(date, totals)| {
                cumulative += totals.spend;
                ForecastHistory {
                    date,
                    day_index: (date - first_date).num_days(),
                    spend: totals.spend,
                    cumulative_spend: cumulative,
                }
            })
            .collect::<Vec<_>>();

        let points = history
            .iter()
            .map(|row| (row.day_index as f64, row.cumulative_spend))
            .collect::<Vec<_>>();
        let Some(fit) = LinearFit::fit(&points) else {
            return SpendForecast::default();
        };
        let last_index = history.last().map(|row| row.day_index).unwrap_or_default();
        let projection = (1..=self.options.forecast_horizon as i64)
            .map(|step| {
                let day_index = last_index + step;
                ForecastPoint {
                    date: first_date + Duration::days(day_index),
                    day_index,
                    cumulative_spend: fit.predict(day_index as f64),
                }
            })
            .collect();

        SpendForecast {
            history,
            projection,
            fit: Some(fit),
        }
    }
}
