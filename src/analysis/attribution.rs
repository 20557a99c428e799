use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::Serialize;

use super::Analyzer;

pub const CONVERTED: &str = "Converted";
pub const LOST: &str = "Lost";

/// Platform → campaign → outcome flow as parallel edge arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributionFlow {
    pub nodes: Vec<String>,
    pub sources: Vec<usize>,
    pub targets: Vec<usize>,
    pub values: Vec<f64>,
}

impl AttributionFlow {
    fn push_edge(&mut self, source: usize, target: usize, value: f64) {
        if value > 0.0 {
            self.sources.push(source);
            self.targets.push(target);
            self.values.push(value);
        }
    }

    pub fn edge_count(&self) -> usize {
        self.values.len()
    }
}

impl Analyzer {
    /// Clicks from each platform into the top campaigns, then each campaign's
    /// clicks split into conversions and the remainder.
    pub fn attribution_flow(&self) -> AttributionFlow {
        let campaigns = self
            .totals_by(|record| record.campaign.clone())
            .into_iter()
            .sorted_by(|(name_a, a), (name_b, b)| {
                b.clicks.total_cmp(&a.clicks).then_with(|| name_a.cmp(name_b))
            })
            .take(self.options.attribution_max_campaigns)
            .collect_vec();
        if campaigns.is_empty() {
            return AttributionFlow::default();
        }
        let selected = campaigns
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<BTreeSet<_>>();

        let mut links: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for record in self.records() {
            if selected.contains(record.campaign.as_str()) {
                *links
                    .entry((record.platform.as_str(), record.campaign.as_str()))
                    .or_default() += record.clicks;
            }
        }
        let platforms = links
            .keys()
            .map(|(platform, _)| *platform)
            .collect::<BTreeSet<_>>();

        let mut flow = AttributionFlow::default();
        let mut platform_nodes = BTreeMap::new();
        for platform in platforms {
            platform_nodes.insert(platform, flow.nodes.len());
            flow.nodes.push(platform.to_string());
        }
        let mut campaign_nodes = BTreeMap::new();
        for (name, _) in &campaigns {
            campaign_nodes.insert(name.as_str(), flow.nodes.len());
            flow.nodes.push(name.clone());
        }
        let converted = flow.nodes.len();
        flow.nodes.push(CONVERTED.to_string());
        let lost = flow.nodes.len();
        flow.nodes.push(LOST.to_string());

        for ((platform, campaign), clicks) in &links {
            flow.push_edge(platform_nodes[platform], campaign_nodes[campaign], *clicks);
        }
        for (name, totals) in &campaigns {
            let node = campaign_nodes[name.as_str()];
            flow.push_edge(node, converted, totals.conversions);
            flow.push_edge(node, lost, (totals.clicks - totals.conversions).max(0.0));
        }
        flow
    }
}
