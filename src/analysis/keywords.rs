use std::{
    collections::{BTreeMap, BTreeSet},
    sync::OnceLock,
};

use regex::Regex;
use serde::Serialize;

use super::Analyzer;
use crate::{canonical::UNKNOWN, metrics::safe_ratio};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordRow {
    pub token: String,
    pub clicks: f64,
    pub spend: f64,
    pub cpc: Option<f64>,
}

fn token_re() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid token regex"))
}

/// Lower-cased alphanumeric runs of `ad_name`, deduplicated.
///
/// A token repeated within one name counts once, so `"sale_sale"` credits
/// its row's clicks to `sale` a single time.
pub fn tokenize(ad_name: &str, min_length: usize, stop_words: &[String]) -> BTreeSet<String> {
    let lowered = ad_name.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| token.chars().count() >= min_length)
        .filter(|token| !stop_words.iter().any(|word| word == token))
        .map(str::to_string)
        .collect()
}

impl Analyzer {
    /// Ad-name tokens ranked by the clicks of the rows that mention them.
    /// Rows without an ad name are skipped.
    pub fn keyword_frequency(&self) -> Vec<KeywordRow> {
        let options = &self.options;
        let mut accumulated: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for record in self.records() {
            if record.ad_name == UNKNOWN {
                continue;
            }
            for token in tokenize(&record.ad_name, options.keyword_min_length, &options.stop_words)
            {
                let entry = accumulated.entry(token).or_default();
                entry.0 += record.clicks;
                entry.1 += record.spend;
            }
        }

        let mut rows = accumulated
            .into_iter()
            .filter(|(_, (clicks, _))| *clicks > options.keyword_min_clicks)
            .map(|(token, (clicks, spend))| KeywordRow {
                token,
                clicks,
                spend,
                cpc: safe_ratio(spend, clicks),
            })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| b.clicks.total_cmp(&a.clicks).then_with(|| a.token.cmp(&b.token)));
        rows.truncate(options.keyword_top);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::test_support::{record, table},
        canonical::CanonicalRecord,
        config::AnalysisOptions,
    };

    fn ad(name: &str, clicks: f64) -> CanonicalRecord {
        let mut record = record(0, clicks * 2.0, clicks, 0.0);
        record.ad_name = name.to_string();
        record
    }

    #[test]
    fn tokenizer_drops_short_tokens_and_stop_words() {
        let stop_words = AnalysisOptions::default().stop_words;
        let tokens = tokenize("Summer_Sale_v1 - FINAL copy", 3, &stop_words);
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["sale".to_string(), "summer".to_string()]
        );
    }

    #[test]
    fn tokens_aggregate_clicks_across_ad_names() {
        let analyzer = Analyzer::new(
            &table(vec![
                ad("Summer_Sale_v1", 10.0),
                ad("summer-sale-final", 5.0),
                ad("Winter Promo", 3.0),
            ]),
            &AnalysisOptions::default(),
        )
        .expect("analyzer");
        let rows = analyzer.keyword_frequency();
        let tokens = rows.iter().map(|row| row.token.as_str()).collect::<Vec<_>>();
        assert_eq!(tokens, vec!["sale", "summer"]);
        assert_eq!(rows[1].clicks, 15.0);
        assert_eq!(rows[1].cpc, Some(2.0));
    }

    #[test]
    fn repeated_token_in_one_name_counts_once() {
        assert_eq!(tokenize("Sale_SALE_sale", 3, &[]).len(), 1);
        let analyzer = Analyzer::new(
            &table(vec![ad("sale_sale_v2", 10.0)]),
            &AnalysisOptions::default(),
        )
        .expect("analyzer");
        let rows = analyzer.keyword_frequency();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token, "sale");
        assert_eq!(rows[0].clicks, 10.0);
    }

    #[test]
    fn rows_without_ad_name_are_ignored() {
        let analyzer = Analyzer::new(&table(vec![ad(UNKNOWN, 40.0)]), &AnalysisOptions::default())
            .expect("analyzer");
        assert!(analyzer.keyword_frequency().is_empty());
    }
}
