use std::collections::{BTreeSet, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::generate::value::Value;

/// Semantic kind of a column, derived from its declared type name.
///
/// Every generator in the crate is keyed on this closed set; type-name
/// strings are only looked at once, by [`TypeKind::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Numeric,
    Temporal,
    Boolean,
    Text,
    Unsupported,
}

impl TypeKind {
    /// Map a PostgreSQL type name to its semantic kind.
    ///
    /// Case-insensitive; a parenthesized length or precision suffix
    /// (`character varying(20)`, `numeric(10,2)`) is ignored.
    pub fn classify(type_name: &str) -> Self {
        let lowered = type_name.trim().to_lowercase();
        let without_modifier = match (lowered.find('('), lowered.find(')')) {
            (Some(open), Some(close)) if close > open => {
                format!("{} {}", &lowered[..open], &lowered[close + 1..])
            }
            _ => lowered,
        };
        let normalized = without_modifier
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" | "decimal"
            | "numeric" | "real" | "float4" | "double precision" | "float8" => TypeKind::Numeric,

            "date"
            | "timestamp"
            | "timestamp without time zone"
            | "timestamp with time zone"
            | "timestamptz" => TypeKind::Temporal,

            "boolean" | "bool" => TypeKind::Boolean,

            "text" | "character varying" | "varchar" | "character" | "char" | "bpchar" => {
                TypeKind::Text
            }

            _ => TypeKind::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, TypeKind::Unsupported)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Numeric => write!(f, "numeric"),
            TypeKind::Temporal => write!(f, "temporal"),
            TypeKind::Boolean => write!(f, "boolean"),
            TypeKind::Text => write!(f, "text"),
            TypeKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// One row of `information_schema.columns`, as reported by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub type_name: String,
    pub max_length: Option<u32>,
    pub default_expr: Option<String>,
    pub numeric_precision: Option<u32>,
    pub numeric_precision_radix: Option<u32>,
    pub numeric_scale: Option<u32>,
}

impl RawColumn {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            max_length: None,
            default_expr: None,
            numeric_precision: None,
            numeric_precision_radix: None,
            numeric_scale: None,
        }
    }
}

/// One row of `pg_stats`, with the array columns already split into elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStatistics {
    pub column_name: String,
    pub null_frac: f64,
    pub avg_width: i32,
    pub n_distinct: f64,
    pub most_common_vals: Option<Vec<Option<String>>>,
    pub most_common_freqs: Option<Vec<f64>>,
    pub histogram_bounds: Option<Vec<Option<String>>>,
    pub correlation: Option<f64>,
}

/// Everything the catalog reports about one table, gathered before any
/// generation starts.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    pub table_name: String,
    pub columns: Vec<RawColumn>,
    pub primary_keys: BTreeSet<String>,
    pub foreign_key_columns: BTreeSet<String>,
    pub statistics: Vec<RawStatistics>,
    /// Live row count of the source table; `None` when it could not be read.
    pub live_rows: Option<u64>,
    /// Live `MIN`/`MAX` of numeric columns that carry common values.
    pub numeric_bounds: HashMap<String, (Option<f64>, Option<f64>)>,
}

impl TableCatalog {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            ..Default::default()
        }
    }
}

/// Schema facts about a column that will be generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub table_name: String,
    pub column_name: String,
    pub kind: TypeKind,
    /// Declared type name, used as the cast target of the insert placeholder.
    pub type_name: String,
    pub max_length: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_precision_radix: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub has_default: bool,
}

/// Planner statistics of a column, with common values typed per column kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub null_frac: f64,
    pub avg_width: i32,
    /// Positive: absolute distinct count. Negative: minus the fraction of
    /// rows that are distinct.
    pub distinct_estimate: f64,
    pub common_values: Vec<Value>,
    pub common_freqs: Vec<f64>,
    pub histogram_bounds: Option<Vec<String>>,
    pub correlation: Option<f64>,
}

impl ColumnStatistics {
    /// True when the statistics can seed a value pool.
    pub fn has_common_values(&self) -> bool {
        !self.common_values.is_empty() && !self.common_freqs.is_empty()
    }
}

/// Why a column is left for the database to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    PrimaryKey,
    HasDefault,
    ForeignKey,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::PrimaryKey => write!(f, "primary key"),
            Exclusion::HasDefault => write!(f, "has default"),
            Exclusion::ForeignKey => write!(f, "foreign key"),
        }
    }
}

/// Per-table profile: the generatable columns in ordinal order plus their
/// statistics, and the columns left to the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProfile {
    pub table_name: String,
    pub columns: IndexMap<String, ColumnProfile>,
    pub statistics: HashMap<String, ColumnStatistics>,
    pub excluded: Vec<(String, Exclusion)>,
}

impl TableProfile {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// The first generatable column whose type has no semantic kind.
    pub fn first_unsupported(&self) -> Option<&ColumnProfile> {
        self.columns.values().find(|c| !c.kind.is_supported())
    }
}
