use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::generate::value::Value;
use crate::schema::types::*;

/// Build the generation profile of one table from its catalog rows.
///
/// Primary-key columns and columns with a default expression are left for
/// the database to fill, as are foreign-key columns when
/// `skip_foreign_key_columns` is set. Every other column gets a
/// [`ColumnProfile`], plus [`ColumnStatistics`] when `pg_stats` has a row
/// for it.
pub fn build_table_profile(catalog: &TableCatalog, skip_foreign_key_columns: bool) -> TableProfile {
    let stats_by_column: HashMap<&str, &RawStatistics> = catalog
        .statistics
        .iter()
        .map(|s| (s.column_name.as_str(), s))
        .collect();

    let mut columns = IndexMap::new();
    let mut statistics = HashMap::new();
    let mut excluded = Vec::new();

    for raw in &catalog.columns {
        let exclusion = if catalog.primary_keys.contains(&raw.name) {
            Some(Exclusion::PrimaryKey)
        } else if raw.default_expr.is_some() {
            Some(Exclusion::HasDefault)
        } else if skip_foreign_key_columns && catalog.foreign_key_columns.contains(&raw.name) {
            Some(Exclusion::ForeignKey)
        } else {
            None
        };

        if let Some(reason) = exclusion {
            debug!("{}.{} left to the database ({})", catalog.table_name, raw.name, reason);
            excluded.push((raw.name.clone(), reason));
            continue;
        }

        let profile = ColumnProfile {
            table_name: catalog.table_name.clone(),
            column_name: raw.name.clone(),
            kind: TypeKind::classify(&raw.type_name),
            type_name: raw.type_name.clone(),
            max_length: raw.max_length,
            numeric_precision: raw.numeric_precision,
            numeric_precision_radix: raw.numeric_precision_radix,
            numeric_scale: raw.numeric_scale,
            has_default: false,
        };

        if let Some(raw_stats) = stats_by_column.get(raw.name.as_str()) {
            statistics.insert(raw.name.clone(), column_statistics(&profile, raw_stats));
        }

        columns.insert(raw.name.clone(), profile);
    }

    TableProfile {
        table_name: catalog.table_name.clone(),
        columns,
        statistics,
        excluded,
    }
}

/// Type the raw `pg_stats` row of a column.
///
/// NULL elements of `most_common_vals` are dropped together with their
/// frequency. Lists of different lengths cannot be paired, so both are
/// discarded and the column falls back to type-default generation.
fn column_statistics(profile: &ColumnProfile, raw: &RawStatistics) -> ColumnStatistics {
    let mut common_values = Vec::new();
    let mut common_freqs = Vec::new();

    if let (Some(values), Some(freqs)) = (&raw.most_common_vals, &raw.most_common_freqs) {
        if values.len() == freqs.len() {
            for (value, freq) in values.iter().zip(freqs) {
                if let Some(text) = value {
                    common_values.push(Value::from_catalog_text(profile.kind, text));
                    common_freqs.push(*freq);
                }
            }
        } else {
            warn!(
                "{}.{}: {} common values but {} frequencies; ignoring them",
                profile.table_name,
                profile.column_name,
                values.len(),
                freqs.len()
            );
        }
    }

    ColumnStatistics {
        null_frac: raw.null_frac,
        avg_width: raw.avg_width,
        distinct_estimate: raw.n_distinct,
        common_values,
        common_freqs,
        histogram_bounds: raw
            .histogram_bounds
            .as_ref()
            .map(|bounds| bounds.iter().flatten().cloned().collect()),
        correlation: raw.correlation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_catalog() -> TableCatalog {
        let mut catalog = TableCatalog::new("actor");
        let mut actor_id = RawColumn::new("actor_id", "integer");
        actor_id.default_expr = Some("nextval('actor_actor_id_seq'::regclass)".to_string());
        let mut first_name = RawColumn::new("first_name", "character varying");
        first_name.max_length = Some(45);
        let mut last_update = RawColumn::new("last_update", "timestamp without time zone");
        last_update.default_expr = Some("now()".to_string());
        let mut store_id = RawColumn::new("store_id", "smallint");
        store_id.numeric_precision = Some(16);
        store_id.numeric_precision_radix = Some(2);
        store_id.numeric_scale = Some(0);

        catalog.columns = vec![actor_id, first_name, last_update, store_id];
        catalog.primary_keys.insert("actor_id".to_string());
        catalog.foreign_key_columns.insert("store_id".to_string());
        catalog.statistics.push(RawStatistics {
            column_name: "first_name".to_string(),
            null_frac: 0.0,
            avg_width: 6,
            n_distinct: -0.64,
            most_common_vals: Some(vec![Some("KENNETH".into()), Some("PENELOPE".into())]),
            most_common_freqs: Some(vec![0.02, 0.02]),
            histogram_bounds: None,
            correlation: Some(0.05),
        });
        catalog
    }

    #[test]
    fn test_primary_key_and_default_columns_excluded() {
        let profile = build_table_profile(&actor_catalog(), false);
        assert_eq!(profile.column_names(), vec!["first_name", "store_id"]);
        assert!(profile
            .excluded
            .contains(&("actor_id".to_string(), Exclusion::PrimaryKey)));
        assert!(profile
            .excluded
            .contains(&("last_update".to_string(), Exclusion::HasDefault)));
    }

    #[test]
    fn test_foreign_key_columns_skipped_on_request() {
        let profile = build_table_profile(&actor_catalog(), true);
        assert_eq!(profile.column_names(), vec!["first_name"]);
        assert!(profile
            .excluded
            .contains(&("store_id".to_string(), Exclusion::ForeignKey)));
    }

    #[test]
    fn test_statistics_attached_and_typed() {
        let profile = build_table_profile(&actor_catalog(), false);
        let stats = &profile.statistics["first_name"];
        assert_eq!(stats.common_values, vec![
            Value::Text("KENNETH".into()),
            Value::Text("PENELOPE".into())
        ]);
        assert_eq!(stats.common_freqs, vec![0.02, 0.02]);
        assert_eq!(stats.distinct_estimate, -0.64);
        assert!(!profile.statistics.contains_key("store_id"));
        assert_eq!(profile.columns["store_id"].kind, TypeKind::Numeric);
        assert_eq!(profile.columns["first_name"].max_length, Some(45));
    }

    #[test]
    fn test_mismatched_common_lists_are_dropped() {
        let mut catalog = actor_catalog();
        catalog.statistics[0].most_common_freqs = Some(vec![0.5]);
        let profile = build_table_profile(&catalog, false);
        let stats = &profile.statistics["first_name"];
        assert!(!stats.has_common_values());
        assert_eq!(stats.avg_width, 6);
    }

    #[test]
    fn test_null_common_value_dropped_with_its_frequency() {
        let mut catalog = actor_catalog();
        catalog.statistics[0].most_common_vals = Some(vec![None, Some("KENNETH".into())]);
        catalog.statistics[0].most_common_freqs = Some(vec![0.3, 0.1]);
        let profile = build_table_profile(&catalog, false);
        let stats = &profile.statistics["first_name"];
        assert_eq!(stats.common_values, vec![Value::Text("KENNETH".into())]);
        assert_eq!(stats.common_freqs, vec![0.1]);
    }
}
