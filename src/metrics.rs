//! Null-safe ratio policy and additive metric totals.
//!
//! Every ratio in the crate goes through [`safe_ratio`]: a zero denominator
//! yields `None`, never infinity, NaN or a substituted zero.

use serde::Serialize;

use crate::canonical::CanonicalRecord;

pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator)
}

pub fn scaled_ratio(numerator: f64, denominator: f64, scale: f64) -> Option<f64> {
    safe_ratio(numerator, denominator).map(|ratio| ratio * scale)
}

/// Additive sums over a group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub spend: f64,
    pub clicks: f64,
    pub impressions: f64,
    pub reach: f64,
    pub conversions: f64,
}

impl Totals {
    pub fn add(&mut self, record: &CanonicalRecord) {
        self.spend += record.spend;
        self.clicks += record.clicks;
        self.impressions += record.impressions;
        self.reach += record.reach;
        self.conversions += record.conversions;
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        let mut totals = Totals::default();
        for record in records {
            totals.add(record);
        }
        totals
    }

    pub fn cpc(&self) -> Option<f64> {
        safe_ratio(self.spend, self.clicks)
    }

    /// Click-through rate as a percentage.
    pub fn ctr_percent(&self) -> Option<f64> {
        scaled_ratio(self.clicks, self.impressions, 100.0)
    }

    /// Conversion rate (conversions per click) as a percentage.
    pub fn cvr_percent(&self) -> Option<f64> {
        scaled_ratio(self.conversions, self.clicks, 100.0)
    }

    pub fn cpm(&self) -> Option<f64> {
        scaled_ratio(self.spend, self.impressions, 1000.0)
    }

    pub fn frequency(&self) -> Option<f64> {
        safe_ratio(self.impressions, self.reach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_ratio_rejects_zero_denominator() {
        assert_eq!(safe_ratio(5.0, 0.0), None);
        assert_eq!(safe_ratio(0.0, 0.0), None);
        assert_eq!(safe_ratio(5.0, 2.0), Some(2.5));
    }

    #[test]
    fn totals_scale_percentages_and_mille() {
        let totals = Totals {
            spend: 50.0,
            clicks: 25.0,
            impressions: 1000.0,
            reach: 500.0,
            conversions: 5.0,
        };
        assert_eq!(totals.cpc(), Some(2.0));
        assert_eq!(totals.ctr_percent(), Some(2.5));
        assert_eq!(totals.cvr_percent(), Some(20.0));
        assert_eq!(totals.cpm(), Some(50.0));
        assert_eq!(totals.frequency(), Some(2.0));
    }

    #[test]
    fn empty_totals_have_no_ratios() {
        let totals = Totals::default();
        assert_eq!(totals.cpc(), None);
        assert_eq!(totals.ctr_percent(), None);
        assert_eq!(totals.cvr_percent(), None);
        assert_eq!(totals.cpm(), None);
        assert_eq!(totals.frequency(), None);
    }
}
