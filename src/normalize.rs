//! Reconciles heterogeneous export schemas onto the canonical model.
//!
//! [`Normalizer::normalize`] runs the full pass over a [`RawTable`]:
//!
//! 1. [`Normalizer::reconcile_columns`] maps each source's columns to
//!    canonical fields, first by exact canonical name, then by
//!    case-insensitive alias.
//! 2. [`Normalizer::coerce_types`] builds typed records: rows without a
//!    parseable date are dropped, unparseable metrics become 0.0, blank text
//!    dimensions become `"Unknown"`.
//! 3. Platform is inferred from the source identifier where the row has none,
//!    and country names are mapped to ISO-3 codes.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::{
    canonical::{CanonicalField, CanonicalRecord, CanonicalTable, UNKNOWN},
    config::Settings,
    data::{clean_text, parse_metric, parse_naive_date, parse_optional_number},
    source::{RawRow, RawTable},
};

/// One source's canonical field to raw column index, plus its unmapped columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub fields: BTreeMap<CanonicalField, usize>,
    pub extras: Vec<usize>,
}

impl ColumnMapping {
    pub fn column_for(&self, field: CanonicalField) -> Option<usize> {
        self.fields.get(&field).copied()
    }
}

/// Column mappings for every source of a [`RawTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMapping {
    /// Indexed like [`RawTable::sources`].
    pub sources: Vec<ColumnMapping>,
    /// Raw columns left unmapped by at least one source, in table order.
    pub extras: Vec<usize>,
}

impl SchemaMapping {
    pub fn source(&self, origin: usize) -> Option<&ColumnMapping> {
        self.sources.get(origin)
    }

    pub fn sourced_fields(&self) -> BTreeSet<CanonicalField> {
        self.sources
            .iter()
            .flat_map(|mapping| mapping.fields.keys().copied())
            .collect()
    }
}

pub struct Normalizer<'a> {
    settings: &'a Settings,
}

impl<'a> Normalizer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn normalize(&self, raw: &RawTable) -> CanonicalTable {
        let mapping = self.reconcile_columns(raw);
        let (records, dropped_rows) = self.coerce_types(raw, &mapping);
        if dropped_rows > 0 {
            warn!("Dropped {dropped_rows} row(s) without a valid date");
        }
        let sourced_fields = mapping.sourced_fields();
        info!(
            "Normalized {} row(s) from {} source(s); {} canonical field(s) sourced, {} extra column(s) kept",
            records.len(),
            raw.sources.len(),
            sourced_fields.len(),
            mapping.extras.len()
        );
        CanonicalTable {
            records,
            extra_columns: mapping
                .extras
                .iter()
                .map(|idx| raw.columns[*idx].clone())
                .collect(),
            sourced_fields,
            dropped_rows,
        }
    }

    /// Maps each source's own headers independently, so one export's naming
    /// never shadows another's.
    pub fn reconcile_columns(&self, raw: &RawTable) -> SchemaMapping {
        let sources = raw
            .sources
            .iter()
            .zip(&raw.layouts)
            .map(|(summary, layout)| {
                let mapping = self.reconcile_layout(&raw.columns, layout);
                debug!(
                    "'{}': {} canonical field(s) mapped, {} column(s) unmapped",
                    summary.id,
                    mapping.fields.len(),
                    mapping.extras.len()
                );
                mapping
            })
            .collect::<Vec<_>>();
        let extras = sources
            .iter()
            .flat_map(|mapping| mapping.extras.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if !extras.is_empty() {
            debug!(
                "Keeping unmapped column(s): {:?}",
                extras.iter().map(|idx| &raw.columns[*idx]).collect::<Vec<_>>()
            );
        }
        SchemaMapping { sources, extras }
    }

    /// Exact canonical names first, then aliases in configured order. A
    /// column claimed by one field is not reused for another.
    fn reconcile_layout(&self, columns: &[String], layout: &[usize]) -> ColumnMapping {
        let mut fields = BTreeMap::new();
        let mut claimed = BTreeSet::new();

        for field in CanonicalField::ALL {
            if let Some(idx) = layout
                .iter()
                .copied()
                .find(|idx| !claimed.contains(idx) && columns[*idx] == field.as_str())
            {
                fields.insert(field, idx);
                claimed.insert(idx);
            }
        }

        for field in CanonicalField::ALL {
            if fields.contains_key(&field) {
                continue;
            }
            let found = self.settings.aliases(field).iter().find_map(|alias| {
                layout.iter().copied().find(|idx| {
                    !claimed.contains(idx) && columns[*idx].trim().to_lowercase() == *alias
                })
            });
            match found {
                Some(idx) => {
                    debug!("Mapped column '{}' to {field}", columns[idx]);
                    fields.insert(field, idx);
                    claimed.insert(idx);
                }
                None => debug!("No source column for {field}; filling defaults"),
            }
        }

        let mut extras = Vec::new();
        for idx in layout {
            if !claimed.contains(idx) && !extras.contains(idx) {
                extras.push(*idx);
            }
        }
        ColumnMapping { fields, extras }
    }

    /// Returns the typed records and the number of rows dropped for bad dates.
    pub fn coerce_types(
        &self,
        raw: &RawTable,
        mapping: &SchemaMapping,
    ) -> (Vec<CanonicalRecord>, usize) {
        let fallback = ColumnMapping::default();
        let mut records = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        for row in &raw.rows {
            let columns = mapping.source(row.origin).unwrap_or(&fallback);
            match self.coerce_row(row, columns, &mapping.extras) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }
        (records, dropped)
    }

    fn coerce_row(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        extras: &[usize],
    ) -> Option<CanonicalRecord> {
        let cell = |field: CanonicalField| {
            mapping
                .column_for(field)
                .and_then(|idx| row.cells.get(idx))
                .and_then(|value| value.as_deref())
        };

        let date = parse_naive_date(cell(CanonicalField::Date)?).ok()?;
        let mut record = CanonicalRecord::blank(row.source.clone(), date);

        for field in CanonicalField::METRICS {
            let value = cell(field).and_then(|raw| parse_metric(raw).ok());
            record.set_metric(field, value.unwrap_or(0.0));
        }

        for field in CanonicalField::ALL {
            if !field.is_text_dimension() {
                continue;
            }
            let value = match field {
                CanonicalField::Platform => Some(self.infer_platform(cell(field), &row.source)),
                CanonicalField::Country => {
                    clean_text(cell(field)).map(|country| self.normalize_country(&country))
                }
                _ => clean_text(cell(field)),
            };
            record.set_dimension(field, value.unwrap_or_else(|| UNKNOWN.to_string()));
        }

        record.sentiment = cell(CanonicalField::Sentiment).and_then(parse_optional_number);
        record.extras = extras
            .iter()
            .map(|idx| {
                if mapping.extras.contains(idx) {
                    row.cells.get(*idx).cloned().flatten()
                } else {
                    None
                }
            })
            .collect();
        record.refresh_derived();
        Some(record)
    }

    /// Keeps an explicit platform; otherwise matches the source identifier
    /// against the configured keywords.
    pub fn infer_platform(&self, current: Option<&str>, source_id: &str) -> String {
        if let Some(explicit) = clean_text(current) {
            return explicit;
        }
        let lowered = source_id.to_lowercase();
        self.settings
            .platforms
            .iter()
            .find(|rule| lowered.contains(&rule.keyword))
            .map(|rule| rule.platform.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// ISO-3 codes pass through; known names map to their code; anything else is kept as is.
    pub fn normalize_country(&self, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_uppercase()) {
            return trimmed.to_string();
        }
        self.settings
            .countries
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RawSource, ingest};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn raw(id: &str, headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let source = RawSource::new(
            id,
            strings(headers),
            rows.iter().map(|row| strings(row)).collect(),
        );
        ingest(vec![Ok(source)]).expect("ingest")
    }

    #[test]
    fn exact_canonical_name_wins_over_alias() {
        let settings = Settings::default();
        let table = raw("x.csv", &["cost", "Spend"], &[&["1", "2"]]);
        let mapping = Normalizer::new(&settings).reconcile_columns(&table);
        assert_eq!(mapping.sources[0].column_for(CanonicalField::Spend), Some(1));
        assert_eq!(mapping.extras, vec![0]);
    }

    #[test]
    fn claimed_column_is_not_reused() {
        let settings = Settings::default();
        let table = raw("x.csv", &["Platform", "source"], &[&["Meta", "crm"]]);
        let mapping = Normalizer::new(&settings).reconcile_columns(&table);
        assert_eq!(mapping.sources[0].column_for(CanonicalField::Platform), Some(0));
        assert_eq!(mapping.extras, vec![1]);
    }

    #[test]
    fn extras_are_kept_only_for_sources_that_leave_them_unmapped() {
        let settings = Settings::default();
        let first = RawSource::new(
            "a.csv",
            strings(&["Date", "Tarih", "Clicks"]),
            vec![strings(&["2024-01-01", "01.01.2024", "3"])],
        );
        let second = RawSource::new(
            "b.csv",
            strings(&["Tarih", "Clicks"]),
            vec![strings(&["2024-01-02", "4"])],
        );
        let table = ingest(vec![Ok(first), Ok(second)]).expect("ingest");
        let normalizer = Normalizer::new(&settings);

        let mapping = normalizer.reconcile_columns(&table);
        assert_eq!(mapping.sources.len(), 2);
        assert_eq!(mapping.sources[0].column_for(CanonicalField::Date), Some(0));
        assert_eq!(mapping.sources[1].column_for(CanonicalField::Date), Some(1));
        assert_eq!(mapping.extras, vec![1]);

        let canonical = normalizer.normalize(&table);
        assert_eq!(canonical.len(), 2);
        assert_eq!(canonical.extra_columns, vec!["Tarih".to_string()]);
        assert_eq!(canonical.records[0].extras, vec![Some("01.01.2024".to_string())]);
        assert_eq!(canonical.records[1].extras, vec![None]);
        assert_eq!(canonical.records[1].clicks, 4.0);
    }

    #[test]
    fn platform_inference_uses_keyword_order() {
        let settings = Settings::default();
        let normalizer = Normalizer::new(&settings);
        assert_eq!(normalizer.infer_platform(None, "Meta_Ads_Q1.csv"), "Facebook");
        assert_eq!(normalizer.infer_platform(Some(" "), "linkedin-export.csv"), "LinkedIn");
        assert_eq!(normalizer.infer_platform(Some("nan"), "ADWORDS.csv"), "Google Ads");
        assert_eq!(normalizer.infer_platform(None, "tiktok.csv"), UNKNOWN);
        assert_eq!(normalizer.infer_platform(Some("TikTok"), "facebook.csv"), "TikTok");
    }

    #[test]
    fn country_codes_are_normalized() {
        let settings = Settings::default();
        let normalizer = Normalizer::new(&settings);
        assert_eq!(normalizer.normalize_country("Turkey"), "TUR");
        assert_eq!(normalizer.normalize_country(" united states "), "USA");
        assert_eq!(normalizer.normalize_country("FRA"), "FRA");
        assert_eq!(normalizer.normalize_country("France"), "France");
        assert_eq!(normalizer.normalize_country("tr"), "TUR");
    }

    #[test]
    fn unparseable_metrics_default_to_zero_and_keep_row() {
        let settings = Settings::default();
        let table = raw(
            "facebook.csv",
            &["Date", "Amount Spent", "Clicks"],
            &[&["2024-01-01", "n/a", "x"], &["bad", "1", "1"]],
        );
        let canonical = Normalizer::new(&settings).normalize(&table);
        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical.dropped_rows, 1);
        let record = &canonical.records[0];
        assert_eq!(record.spend, 0.0);
        assert_eq!(record.clicks, 0.0);
        assert_eq!(record.cpc, None);
        assert_eq!(record.platform, "Facebook");
        assert_eq!(record.country, UNKNOWN);
        assert_eq!(record.sentiment, None);
    }
}
