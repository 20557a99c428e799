//! Single- and multi-dimension efficiency breakdowns.

use serde::Serialize;

use super::Analyzer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformRow {
    pub platform: String,
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub ctr: Option<f64>,
    pub cvr: Option<f64>,
    pub cpc: Option<f64>,
    pub cpm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRow {
    pub country: String,
    pub spend: f64,
    pub clicks: f64,
    pub impressions: f64,
    pub conversions: f64,
    pub cpc: Option<f64>,
    pub ctr: Option<f64>,
    pub cvr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementRow {
    pub platform: String,
    pub device: String,
    pub placement: String,
    pub spend: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub cvr: Option<f64>,
}

impl Analyzer {
    pub fn platform_efficiency(&self) -> Vec<PlatformRow> {
        self.totals_by(|record| record.platform.clone())
            .into_iter()
            .map(|(platform, totals)| PlatformRow {
                platform,
                spend: totals.spend,
                impressions: totals.impressions,
                clicks: totals.clicks,
                conversions: totals.conversions,
                ctr: totals.ctr_percent(),
                cvr: totals.cvr_percent(),
                cpc: totals.cpc(),
                cpm: totals.cpm(),
            })
            .collect()
    }

    /// Countries ordered by spend, highest first.
    pub fn geo_performance(&self) -> Vec<GeoRow> {
        let mut rows = self
            .totals_by(|record| record.country.clone())
            .into_iter()
            .map(|(country, totals)| GeoRow {
                country,
                spend: totals.spend,
                clicks: totals.clicks,
                impressions: totals.impressions,
                conversions: totals.conversions,
                cpc: totals.cpc(),
                ctr: totals.ctr_percent(),
                cvr: totals.cvr_percent(),
            })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            b.spend
                .total_cmp(&a.spend)
                .then_with(|| a.country.cmp(&b.country))
        });
        rows
    }

    /// Platform × device × placement groups that actually spent.
    pub fn placement_breakdown(&self) -> Vec<PlacementRow> {
        self.totals_by(|record| {
            (
                record.platform.clone(),
                record.device.clone(),
                record.placement.clone(),
            )
        })
        .into_iter()
        .filter(|(_, totals)| totals.spend > 0.0)
        .map(|((platform, device, placement), totals)| PlacementRow {
            platform,
            device,
            placement,
            spend: totals.spend,
            clicks: totals.clicks,
            conversions: totals.conversions,
            cvr: totals.cvr_percent(),
        })
        .collect()
    }
}
