//! Schema mapping and table provisioning
//!
//! The warehouse schema is inferred once, from the first dataset seen for
//! a table: one REQUIRED field per column, in column order, using a fixed
//! native-kind to warehouse-type mapping. Later batches must already be
//! schema-compatible; no schema evolution is attempted.

use crate::table::{ColumnKind, Table};
use crate::warehouse::client::{SchemaField, TableId, WarehouseClient};
use anyhow::Result;
use fdp_common::FdpError;
use tracing::{debug, info};

/// Fixed native-kind to warehouse-type mapping; kinds outside it have no
/// warehouse representation
fn warehouse_type(kind: ColumnKind) -> Option<&'static str> {
    match kind {
        ColumnKind::Text => Some("STRING"),
        ColumnKind::Str => Some("STRING"),
        ColumnKind::Int64 => Some("INTEGER"),
        ColumnKind::Float64 => None,
    }
}

/// Derive the warehouse schema from a dataset's columns
///
/// Fails with `UnsupportedColumnType` before any DDL when a column's kind
/// has no mapping.
pub fn build_schema(table: &Table) -> std::result::Result<Vec<SchemaField>, FdpError> {
    table
        .columns
        .iter()
        .map(|column| {
            let kind = column.data.kind();
            let field_type =
                warehouse_type(kind).ok_or_else(|| FdpError::UnsupportedColumnType {
                    column: column.name.clone(),
                    kind: kind.as_str().to_string(),
                })?;
            Ok(SchemaField {
                name: column.name.clone(),
                field_type: field_type.to_string(),
                mode: "REQUIRED".to_string(),
            })
        })
        .collect()
}

/// Create the destination table from the dataset's schema unless it
/// already exists
///
/// An existing table is left untouched (append proceeds against it); an
/// absent table is created. Lookup failures other than "absent"
/// propagate.
pub async fn ensure_table(
    client: &WarehouseClient,
    table_id: &TableId,
    table: &Table,
) -> Result<()> {
    if client.table_exists(table_id).await? {
        debug!(table = %table_id, "table already exists, appending");
        return Ok(());
    }

    let schema = build_schema(table)?;
    client.create_table(table_id, &schema).await?;
    info!(table = %table_id, fields = schema.len(), "created table");
    Ok(())
}
