//! Assembles every analytical view into a single serializable document.
//!
//! The JSON form is the canonical output of `analyze`; [`AnalysisReport::views`]
//! flattens the same content into titled tables for terminal display.

use std::{collections::BTreeMap, io::Write, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;

use crate::{
    analysis::{
        AbTestResult, AbTestStatus, Analyzer, AnomalyRow, AttributionFlow, AudienceRow,
        CohortTable, FunnelStage, GeoRow, KeywordRow, PlacementRow, PlatformRow, SpendForecast,
        TrendRow,
    },
    io_utils,
    source::SourceSummary,
    table::{MISSING, ViewTable},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub sources: Vec<SourceSummary>,
    pub rows: usize,
    pub dropped_rows: usize,
    pub kpis: BTreeMap<&'static str, Option<f64>>,
    pub daily_trend: Vec<TrendRow>,
    pub platform_efficiency: Vec<PlatformRow>,
    pub geo_performance: Vec<GeoRow>,
    pub placement_breakdown: Vec<PlacementRow>,
    pub audience_conversion: Vec<AudienceRow>,
    pub cpc_anomalies: Vec<AnomalyRow>,
    pub ab_test: AbTestResult,
    pub spend_forecast: SpendForecast,
    pub attribution: AttributionFlow,
    pub keywords: Vec<KeywordRow>,
    pub funnel: Vec<FunnelStage>,
    pub cohorts: CohortTable,
}

impl AnalysisReport {
    pub fn build(analyzer: &Analyzer, sources: Vec<SourceSummary>) -> Self {
        let report = Self {
            sources,
            rows: analyzer.table().len(),
            dropped_rows: analyzer.table().dropped_rows,
            kpis: analyzer.summary_kpis().as_mapping(),
            daily_trend: analyzer.daily_trend(),
            platform_efficiency: analyzer.platform_efficiency(),
            geo_performance: analyzer.geo_performance(),
            placement_breakdown: analyzer.placement_breakdown(),
            audience_conversion: analyzer.audience_conversion(),
            cpc_anomalies: analyzer.cpc_anomalies(),
            ab_test: analyzer.ab_test(),
            spend_forecast: analyzer.spend_forecast(),
            attribution: analyzer.attribution_flow(),
            keywords: analyzer.keyword_frequency(),
            funnel: analyzer.funnel(),
            cohorts: analyzer.campaign_cohorts(),
        };
        debug!(
            "Report views: trend={} platforms={} geo={} placements={} audience={} anomalies={} keywords={} attribution_edges={} cohorts={}",
            report.daily_trend.len(),
            report.platform_efficiency.len(),
            report.geo_performance.len(),
            report.placement_breakdown.len(),
            report.audience_conversion.len(),
            report.cpc_anomalies.len(),
            report.keywords.len(),
            report.attribution.edge_count(),
            report.cohorts.rows.len()
        );
        report
    }

    pub fn anomaly_count(&self) -> usize {
        self.cpc_anomalies.iter().filter(|row| row.is_anomaly).count()
    }

    pub fn write_json(&self, path: Option<&Path>) -> Result<()> {
        let mut writer = io_utils::open_output(path)?;
        serde_json::to_writer_pretty(&mut writer, self).context("Serializing report")?;
        writeln!(writer).context("Writing report")?;
        writer.flush().context("Flushing report")?;
        Ok(())
    }

    pub fn views(&self) -> Vec<ViewTable> {
        vec![
            self.sources_view(),
            self.kpi_view(),
            self.trend_view(),
            self.platform_view(),
            self.geo_view(),
            self.placement_view(),
            self.audience_view(),
            self.anomaly_view(),
            self.ab_test_view(),
            self.forecast_view(),
            self.attribution_view(),
            self.keyword_view(),
            self.funnel_view(),
            self.cohort_view(),
        ]
    }

    fn sources_view(&self) -> ViewTable {
        let mut view = ViewTable::new("Sources", &["source", "rows", "sha256"]);
        for source in &self.sources {
            view.push(vec![
                source.id.clone(),
                source.rows.to_string(),
                source.digest.clone(),
            ]);
        }
        view
    }

    fn kpi_view(&self) -> ViewTable {
        let mut view = ViewTable::new("Summary KPIs", &["metric", "value"]);
        for (key, value) in &self.kpis {
            view.push(vec![key.to_string(), optional(*value)]);
        }
        view
    }

    fn trend_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Daily trend",
            &["date", "platform", "spend", "clicks", "impressions", "conversions", "cpc", "ctr", "cvr"],
        );
        for row in &self.daily_trend {
            view.push(vec![
                row.date.to_string(),
                row.platform.clone().unwrap_or_else(|| MISSING.to_string()),
                number(row.spend),
                number(row.clicks),
                number(row.impressions),
                number(row.conversions),
                optional(row.cpc),
                optional(row.ctr),
                optional(row.cvr),
            ]);
        }
        view
    }

    fn platform_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Platform efficiency",
            &["platform", "spend", "impressions", "clicks", "conversions", "ctr_%", "cvr_%", "cpc", "cpm"],
        );
        for row in &self.platform_efficiency {
            view.push(vec![
                row.platform.clone(),
                number(row.spend),
                number(row.impressions),
                number(row.clicks),
                number(row.conversions),
                optional(row.ctr),
                optional(row.cvr),
                optional(row.cpc),
                optional(row.cpm),
            ]);
        }
        view
    }

    fn geo_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Geo performance",
            &["country", "spend", "clicks", "impressions", "conversions", "cpc", "ctr_%", "cvr_%"],
        );
        for row in &self.geo_performance {
            view.push(vec![
                row.country.clone(),
                number(row.spend),
                number(row.clicks),
                number(row.impressions),
                number(row.conversions),
                optional(row.cpc),
                optional(row.ctr),
                optional(row.cvr),
            ]);
        }
        view
    }

    fn placement_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Device and placement",
            &["platform", "device", "placement", "spend", "clicks", "conversions", "cvr_%"],
        );
        for row in &self.placement_breakdown {
            view.push(vec![
                row.platform.clone(),
                row.device.clone(),
                row.placement.clone(),
                number(row.spend),
                number(row.clicks),
                number(row.conversions),
                optional(row.cvr),
            ]);
        }
        view
    }

    fn audience_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Audience conversion",
            &["age", "gender", "clicks", "conversions", "spend", "cr_%", "cpc"],
        );
        for row in &self.audience_conversion {
            view.push(vec![
                row.age.clone(),
                row.gender.clone().unwrap_or_else(|| MISSING.to_string()),
                number(row.clicks),
                number(row.conversions),
                number(row.spend),
                optional(row.cr),
                optional(row.cpc),
            ]);
        }
        view
    }

    fn anomaly_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "CPC anomalies",
            &["date", "spend", "clicks", "cpc", "mean", "std", "lower", "upper", "anomaly"],
        );
        for row in &self.cpc_anomalies {
            view.push(vec![
                row.date.to_string(),
                number(row.spend),
                number(row.clicks),
                optional(row.cpc),
                optional(row.rolling_mean),
                optional(row.rolling_std),
                optional(row.lower_bound),
                optional(row.upper_bound),
                if row.is_anomaly { "yes" } else { "" }.to_string(),
            ]);
        }
        view
    }

    fn ab_test_view(&self) -> ViewTable {
        let mut view = ViewTable::new("A/B significance", &["field", "value"]);
        let result = &self.ab_test;
        let status = match result.status {
            AbTestStatus::Completed => "completed",
            AbTestStatus::InsufficientCampaigns => "insufficient_campaigns",
            AbTestStatus::InsufficientSampleSize => "insufficient_sample_size",
        };
        view.push(vec!["status".to_string(), status.to_string()]);
        view.push(vec!["confidence_%".to_string(), number(result.confidence)]);
        view.push(vec![
            "winner".to_string(),
            result.winner.clone().unwrap_or_else(|| MISSING.to_string()),
        ]);
        if let Some(details) = &result.details {
            view.push(vec![
                format!("rate_% {}", details.campaign_a),
                optional(details.rate_a),
            ]);
            view.push(vec![
                format!("rate_% {}", details.campaign_b),
                optional(details.rate_b),
            ]);
            view.push(vec!["z_score".to_string(), optional(details.z_score)]);
            view.push(vec!["p_value".to_string(), optional(details.p_value)]);
        }
        view
    }

    fn forecast_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Spend forecast",
            &["date", "day", "kind", "spend", "cumulative_spend"],
        );
        for row in &self.spend_forecast.history {
            view.push(vec![
                row.date.to_string(),
                row.day_index.to_string(),
                "actual".to_string(),
                number(row.spend),
                number(row.cumulative_spend),
            ]);
        }
        for row in &self.spend_forecast.projection {
            view.push(vec![
                row.date.to_string(),
                row.day_index.to_string(),
                "forecast".to_string(),
                MISSING.to_string(),
                number(row.cumulative_spend),
            ]);
        }
        view
    }

    fn attribution_view(&self) -> ViewTable {
        let mut view = ViewTable::new("Attribution flow", &["from", "to", "value"]);
        let flow = &self.attribution;
        let label = |idx: usize| flow.nodes.get(idx).cloned().unwrap_or_default();
        for ((source, target), value) in flow.sources.iter().zip(&flow.targets).zip(&flow.values) {
            view.push(vec![label(*source), label(*target), number(*value)]);
        }
        view
    }

    fn keyword_view(&self) -> ViewTable {
        let mut view = ViewTable::new("Ad-name keywords", &["token", "clicks", "spend", "cpc"]);
        for row in &self.keywords {
            view.push(vec![
                row.token.clone(),
                number(row.clicks),
                number(row.spend),
                optional(row.cpc),
            ]);
        }
        view
    }

    fn funnel_view(&self) -> ViewTable {
        let mut view = ViewTable::new(
            "Funnel",
            &["stage", "value", "from_previous_%", "from_top_%"],
        );
        for stage in &self.funnel {
            view.push(vec![
                stage.stage.clone(),
                number(stage.value),
                optional(stage.from_previous),
                optional(stage.from_top),
            ]);
        }
        view
    }

    fn cohort_view(&self) -> ViewTable {
        let mut headers = vec!["cohort_week".to_string(), "campaigns".to_string()];
        headers.extend((0..self.cohorts.weeks_observed).map(|week| format!("w{week}_%")));
        let mut view = ViewTable {
            title: "Campaign cohorts".to_string(),
            headers,
            rows: Vec::new(),
        };
        for row in &self.cohorts.rows {
            let mut cells = vec![row.cohort_week.to_string(), row.campaigns.to_string()];
            cells.extend(row.retention.iter().map(|value| optional(*value)));
            view.push(cells);
        }
        view
    }
}

fn number(value: f64) -> String {
    format!("{value:.2}")
}

fn optional(value: Option<f64>) -> String {
    value.map(number).unwrap_or_else(|| MISSING.to_string())
}
