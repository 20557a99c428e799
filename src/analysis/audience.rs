use serde::Serialize;

use super::Analyzer;
use crate::canonical::CanonicalField;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceRow {
    pub age: String,
    pub gender: Option<String>,
    pub clicks: f64,
    pub conversions: f64,
    pub spend: f64,
    /// Conversion rate, percent.
    pub cr: Option<f64>,
    pub cpc: Option<f64>,
}

impl Analyzer {
    /// Conversion by age (and gender when known). Segments under the click
    /// floor are left out as unreliable.
    pub fn audience_conversion(&self) -> Vec<AudienceRow> {
        let split_gender = self.table.has_dimension(CanonicalField::Gender);
        let min_clicks = self.options.min_segment_clicks;
        self.totals_by(|record| {
            (
                record.age.clone(),
                split_gender.then(|| record.gender.clone()),
            )
        })
        .into_iter()
        .filter(|(_, totals)| totals.clicks >= min_clicks)
        .map(|((age, gender), totals)| AudienceRow {
            age,
            gender,
            clicks: totals.clicks,
            conversions: totals.conversions,
            spend: totals.spend,
            cr: totals.cvr_percent(),
            cpc: totals.cpc(),
        })
        .collect()
    }
}
