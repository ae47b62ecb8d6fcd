//! Column type normalization
//!
//! Coerces every free-text column to the canonical string kind. When a
//! sentinel is configured, missing entries in those columns are replaced
//! with it, so cleaned text columns carry no missing values. Typed
//! columns (int64, float64) pass through untouched.

use crate::table::{ColumnData, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cleaning policy for text columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanPolicy {
    /// Value substituted for missing text entries; `None` preserves them
    pub sentinel: Option<String>,
}

impl Default for CleanPolicy {
    fn default() -> Self {
        Self {
            sentinel: Some("unknown".to_string()),
        }
    }
}

impl CleanPolicy {
    /// Variant that keeps missing markers instead of filling them
    pub fn keep_missing() -> Self {
        Self { sentinel: None }
    }
}

/// Normalize text columns in place
pub fn clean(table: &mut Table, policy: &CleanPolicy) {
    for column in &mut table.columns {
        if let ColumnData::Text(values) = &mut column.data {
            let values = std::mem::take(values);
            let canonical = match &policy.sentinel {
                Some(sentinel) => values
                    .into_iter()
                    .map(|v| Some(v.unwrap_or_else(|| sentinel.clone())))
                    .collect(),
                None => values,
            };
            debug!(column = %column.name, "coerced text column to string");
            column.data = ColumnData::Str(canonical);
        }
    }
}
