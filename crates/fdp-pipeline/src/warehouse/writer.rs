//! Batched warehouse appends
//!
//! Appends a dataset's rows through the streaming insert endpoint in
//! bounded-size batches. Append-only and at-least-once: re-running the
//! pipeline over the same input appends the rows again.

use crate::table::{ColumnData, Table};
use crate::warehouse::client::{TableId, WarehouseClient};
use anyhow::Result;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Render the table as one JSON object per row; missing values become null
pub fn rows_json(table: &Table) -> Vec<Value> {
    let num_rows = table.num_rows();
    let mut rows = Vec::with_capacity(num_rows);

    for i in 0..num_rows {
        let mut row = Map::with_capacity(table.num_columns());
        for column in &table.columns {
            let value = match &column.data {
                ColumnData::Text(v) | ColumnData::Str(v) => {
                    v[i].as_ref().map(|s| json!(s)).unwrap_or(Value::Null)
                },
                ColumnData::Int64(v) => v[i].map(|n| json!(n)).unwrap_or(Value::Null),
                ColumnData::Float64(v) => v[i].map(|n| json!(n)).unwrap_or(Value::Null),
            };
            row.insert(column.name.clone(), value);
        }
        rows.push(Value::Object(row));
    }

    rows
}

/// Append all rows of `table` into `table_id` in batches of `batch_rows`
pub async fn append_rows(
    client: &WarehouseClient,
    table_id: &TableId,
    table: &Table,
    batch_rows: usize,
) -> Result<()> {
    let rows = rows_json(table);
    let total = rows.len();

    for (batch_index, chunk) in rows.chunks(batch_rows).enumerate() {
        client.insert_rows(table_id, chunk).await?;
        debug!(table = %table_id, batch = batch_index, rows = chunk.len(), "appended batch");
    }

    info!(table = %table_id, rows = total, "append complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn three_row_table() -> Table {
        Table {
            name: "airports".to_string(),
            columns: vec![
                Column {
                    name: "iata".to_string(),
                    data: ColumnData::Str(vec![
                        Some("JFK".to_string()),
                        Some("LAX".to_string()),
                        None,
                    ]),
                },
                Column {
                    name: "elevation".to_string(),
                    data: ColumnData::Int64(vec![Some(13), Some(38), Some(0)]),
                },
            ],
        }
    }

    #[test]
    fn test_rows_json_shape() {
        let rows = rows_json(&three_row_table());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["iata"], "JFK");
        assert_eq!(rows[0]["elevation"], 13);
        assert_eq!(rows[2]["iata"], Value::Null);
    }

    #[tokio::test]
    async fn test_append_batches_by_row_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/proj/datasets/flights/tables/airports/insertAll"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let client = WarehouseClient::new(server.uri(), None);
        let table_id = TableId::new("proj", "flights", "airports");
        // 3 rows with a batch threshold of 2 -> two insert calls
        append_rows(&client, &table_id, &three_row_table(), 2)
            .await
            .unwrap();
    }
}
