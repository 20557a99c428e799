//! Static configuration: column aliases, country codes, platform keywords and
//! analysis thresholds.
//!
//! [`Settings::default`] carries the built-in tables. A YAML file may override
//! any section; sections it omits keep their defaults. The `columns` section
//! is merged per field: a listed field replaces that field's aliases and every
//! other field keeps its built-in list. Settings are passed
//! explicitly to the normalizer and analyzer, never stored globally.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Deserializer, Serialize};

use crate::canonical::CanonicalField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformKeyword {
    pub keyword: String,
    pub platform: String,
}

impl PlatformKeyword {
    fn new(keyword: &str, platform: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            platform: platform.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Trailing days used for the CPC anomaly band.
    pub anomaly_window: usize,
    pub anomaly_sigmas: f64,
    /// Audience segments below this many clicks are dropped.
    pub min_segment_clicks: f64,
    pub ab_min_sample: f64,
    pub forecast_horizon: usize,
    pub forecast_min_days: usize,
    pub keyword_top: usize,
    /// Tokens must accumulate strictly more clicks than this.
    pub keyword_min_clicks: f64,
    pub keyword_min_length: usize,
    pub stop_words: Vec<String>,
    pub attribution_max_campaigns: usize,
    pub cohort_limit: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            anomaly_window: 7,
            anomaly_sigmas: 2.0,
            min_segment_clicks: 30.0,
            ab_min_sample: 30.0,
            forecast_horizon: 15,
            forecast_min_days: 5,
            keyword_top: 20,
            keyword_min_clicks: 5.0,
            keyword_min_length: 3,
            stop_words: ["v1", "v2", "v3", "copy", "final", "ads", "ad"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            attribution_max_campaigns: 5,
            cohort_limit: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Canonical field to lower-cased source column synonyms, tried in order.
    #[serde(deserialize_with = "merge_column_aliases")]
    pub columns: BTreeMap<CanonicalField, Vec<String>>,
    /// Lower-cased country name to ISO-3 code.
    pub countries: BTreeMap<String, String>,
    /// Source-identifier substrings mapped to a platform label, tried in order.
    pub platforms: Vec<PlatformKeyword>,
    pub analysis: AnalysisOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: default_column_aliases(),
            countries: default_country_codes(),
            platforms: vec![
                PlatformKeyword::new("facebook", "Facebook"),
                PlatformKeyword::new("meta", "Facebook"),
                PlatformKeyword::new("linkedin", "LinkedIn"),
                PlatformKeyword::new("google", "Google Ads"),
                PlatformKeyword::new("adwords", "Google Ads"),
                PlatformKeyword::new("ads_", "Google Ads"),
            ],
            analysis: AnalysisOptions::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .with_context(|| format!("Reading settings file {path:?}"))?;
        Self::from_yaml_str(&raw).with_context(|| format!("Parsing settings file {path:?}"))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(raw)?;
        settings.normalized()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml_string()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating settings file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.columns.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lower-cases and trims every lookup key and validates thresholds.
    pub fn normalized(mut self) -> Result<Self> {
        for aliases in self.columns.values_mut() {
            *aliases = aliases
                .iter()
                .map(|alias| alias.trim().to_lowercase())
                .filter(|alias| !alias.is_empty())
                .collect();
        }
        self.countries = self
            .countries
            .into_iter()
            .map(|(name, code)| (name.trim().to_lowercase(), code.trim().to_string()))
            .collect();
        for rule in &mut self.platforms {
            rule.keyword = rule.keyword.trim().to_lowercase();
        }
        self.platforms.retain(|rule| !rule.keyword.is_empty());
        let analysis = &mut self.analysis;
        analysis.stop_words = analysis
            .stop_words
            .iter()
            .map(|word| word.trim().to_lowercase())
            .collect();
        ensure!(
            analysis.anomaly_sigmas >= 0.0,
            "anomaly_sigmas must be non-negative"
        );
        ensure!(
            analysis.forecast_min_days >= 2,
            "forecast_min_days must be at least 2 to fit a line"
        );
        Ok(self)
    }
}

fn merge_column_aliases<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<CanonicalField, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<CanonicalField, Vec<String>>::deserialize(deserializer)?;
    let mut columns = default_column_aliases();
    columns.extend(overrides);
    Ok(columns)
}

fn default_column_aliases() -> BTreeMap<CanonicalField, Vec<String>> {
    let table: [(CanonicalField, &[&str]); 15] = [
        (CanonicalField::Date, &["date", "tarih", "day", "gun"]),
        (
            CanonicalField::Spend,
            &["amount spent", "cost", "total spent", "spend", "harcama", "tutar"],
        ),
        (
            CanonicalField::Clicks,
            &["clicks", "link clicks", "tiklama", "tiklamalar", "click"],
        ),
        (
            CanonicalField::Impressions,
            &["impressions", "gosterim", "goruntulenme", "impression"],
        ),
        (
            CanonicalField::Reach,
            &["reach", "erisim", "unique reach", "ulasim"],
        ),
        (
            CanonicalField::Conversions,
            &["conversions", "donusumler", "purchases", "satis", "leads", "results"],
        ),
        (
            CanonicalField::Campaign,
            &["campaign name", "kampanya adi", "campaign", "kampanya"],
        ),
        (
            CanonicalField::AdName,
            &["ad name", "reklam adi", "ad", "creative name", "reklam"],
        ),
        (CanonicalField::Platform, &["platform", "source", "kaynak"]),
        (
            CanonicalField::Country,
            &["country", "region", "ulke", "bolge", "location"],
        ),
        (CanonicalField::Age, &["age", "yas", "age range"]),
        (CanonicalField::Gender, &["gender", "cinsiyet"]),
        (
            CanonicalField::Device,
            &["device", "cihaz", "device platform"],
        ),
        (
            CanonicalField::Placement,
            &["placement", "yerlesim", "platform position"],
        ),
        (
            CanonicalField::Sentiment,
            &["sentiment", "sentiment score", "duygu", "puan"],
        ),
    ];
    table
        .into_iter()
        .map(|(field, aliases)| (field, aliases.iter().map(|s| s.to_string()).collect()))
        .collect()
}

fn default_country_codes() -> BTreeMap<String, String> {
    [
        ("turkey", "TUR"),
        ("turkiye", "TUR"),
        ("türkiye", "TUR"),
        ("tr", "TUR"),
        ("usa", "USA"),
        ("united states", "USA"),
        ("us", "USA"),
        ("uk", "GBR"),
        ("united kingdom", "GBR"),
        ("germany", "DEU"),
        ("almanya", "DEU"),
    ]
    .into_iter()
    .map(|(name, code)| (name.to_string(), code.to_string()))
    .collect()
}
