//! External and materialized table registration
//!
//! The alternative load path: declare a file-backed external table over
//! the uploaded parquet object, then copy it into a native table with a
//! `CREATE OR REPLACE ... AS SELECT` query. Both statements replace
//! unconditionally; the external table is a staging indirection with no
//! value after materialization, so it is always rebuilt. DDL failures
//! propagate with no rollback of whatever was already created.

use crate::warehouse::client::{TableId, WarehouseClient};
use anyhow::Result;
use tracing::info;

/// Declare the staging external table over a parquet object, returning
/// its fully qualified name
pub async fn register_external(
    client: &WarehouseClient,
    table_id: &TableId,
    object_uri: &str,
) -> Result<String> {
    let external_name = table_id.external_qualified();
    let sql = format!(
        "CREATE OR REPLACE EXTERNAL TABLE `{}` OPTIONS (format = 'PARQUET', uris = ['{}'])",
        external_name, object_uri
    );
    client.execute(&table_id.project, &sql).await?;
    info!(table = %external_name, uri = object_uri, "registered external table");
    Ok(external_name)
}

/// Copy the external table into the native destination table
pub async fn materialize(client: &WarehouseClient, table_id: &TableId) -> Result<()> {
    let sql = format!(
        "CREATE OR REPLACE TABLE `{}` AS SELECT * FROM `{}`",
        table_id.qualified(),
        table_id.external_qualified()
    );
    client.execute(&table_id.project, &sql).await?;
    info!(table = %table_id, "materialized table");
    Ok(())
}
