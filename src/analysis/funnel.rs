use serde::Serialize;

use super::Analyzer;
use crate::metrics::{Totals, scaled_ratio};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub stage: String,
    pub value: f64,
    /// Percent of the previous stage.
    pub from_previous: Option<f64>,
    /// Percent of the first stage.
    pub from_top: Option<f64>,
}

impl Analyzer {
    /// Impressions → reach → clicks → conversions.
    pub fn funnel(&self) -> Vec<FunnelStage> {
        let totals = Totals::from_records(self.records());
        let stages = [
            ("Impressions", totals.impressions),
            ("Reach", totals.reach),
            ("Clicks", totals.clicks),
            ("Conversions", totals.conversions),
        ];
        let top = totals.impressions;
        let mut previous: Option<f64> = None;
        stages
            .into_iter()
            .map(|(stage, value)| {
                let row = FunnelStage {
                    stage: stage.to_string(),
                    value,
                    from_previous: previous.and_then(|prev| scaled_ratio(value, prev, 100.0)),
                    from_top: scaled_ratio(value, top, 100.0),
                };
                previous = Some(value);
                row
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

    #[test]
    fn zero_reach_breaks_the_chain_without_fabricating_rates() {
        let analyzer = Analyzer::new(
            &table(vec![record(0, 10.0, 10.0, 2.0)]),
            &AnalysisOptions::default(),
        )
        .expect("analyzer");
        let funnel = analyzer.funnel();
        assert_eq!(funnel.len(), 4);
        assert_eq!(funnel[0].from_previous, None);
        assert_eq!(funnel[0].from_top, Some(100.0));
        assert_eq!(funnel[1].value, 0.0);
        assert_eq!(funnel[2].from_previous, None);
        assert_eq!(funnel[2].from_top, Some(5.0));
        assert_eq!(funnel[3].from_previous, Some(20.0));
    }
}
