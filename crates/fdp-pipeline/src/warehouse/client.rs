//! Warehouse REST client
//!
//! Minimal client for the warehouse's table metadata, streaming insert
//! and query endpoints. A table lookup distinguishes "absent" (HTTP 404)
//! from every other failure; only the former signals that provisioning
//! should create the table, anything else propagates as
//! `FdpError::TableLookup` so a connectivity problem cannot silently
//! trigger table creation.

use anyhow::Result;
use fdp_common::FdpError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Three-part warehouse table identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Fully qualified name: `project.dataset.table`
    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }

    /// Name of the staging external table: `project.dataset.table_external`
    pub fn external_qualified(&self) -> String {
        format!("{}_external", self.qualified())
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

/// One field of a warehouse table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: String,
}

#[derive(Debug, Deserialize)]
struct InsertAllResponse {
    #[serde(rename = "insertErrors", default)]
    insert_errors: Vec<serde_json::Value>,
}

#[derive(Clone)]
pub struct WarehouseClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl WarehouseClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn table_url(&self, table: &TableId) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables",
            self.base_url, table.project, table.dataset
        )
    }

    /// Metadata lookup: `Ok(true)` if the table exists, `Ok(false)` only
    /// on HTTP 404
    pub async fn table_exists(&self, table: &TableId) -> Result<bool> {
        let url = format!("{}/{}", self.table_url(table), table.table);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| FdpError::TableLookup {
                table: table.qualified(),
                reason: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(FdpError::TableLookup {
                table: table.qualified(),
                reason: format!("HTTP {}", status),
            }
            .into()),
        }
    }

    /// Create a table with the given schema
    pub async fn create_table(&self, table: &TableId, schema: &[SchemaField]) -> Result<()> {
        let body = json!({
            "tableReference": {
                "projectId": table.project,
                "datasetId": table.dataset,
                "tableId": table.table,
            },
            "schema": { "fields": schema },
        });

        let response = self
            .authorized(self.http.post(self.table_url(table)))
            .json(&body)
            .send()
            .await
            .map_err(|e| FdpError::Warehouse(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FdpError::Warehouse(format!(
                "create table {} failed: HTTP {}",
                table,
                response.status()
            ))
            .into());
        }
        debug!(table = %table, "created warehouse table");
        Ok(())
    }

    /// Append rows through the streaming insert endpoint
    pub async fn insert_rows(&self, table: &TableId, rows: &[serde_json::Value]) -> Result<()> {
        let url = format!("{}/{}/insertAll", self.table_url(table), table.table);
        let body = json!({
            "rows": rows.iter().map(|r| json!({ "json": r })).collect::<Vec<_>>(),
        });

        let response = self
            .authorized(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| FdpError::Warehouse(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FdpError::Warehouse(format!(
                "insert into {} failed: HTTP {}",
                table,
                response.status()
            ))
            .into());
        }

        let parsed: InsertAllResponse = response
            .json()
            .await
            .map_err(|e| FdpError::Warehouse(e.to_string()))?;
        if !parsed.insert_errors.is_empty() {
            return Err(FdpError::Warehouse(format!(
                "insert into {} rejected {} rows",
                table,
                parsed.insert_errors.len()
            ))
            .into());
        }
        Ok(())
    }

    /// Execute a DDL statement in the given project
    pub async fn execute(&self, project: &str, sql: &str) -> Result<()> {
        let url = format!("{}/projects/{}/queries", self.base_url, project);
        let body = json!({ "query": sql, "useLegacySql": false });

        debug!(sql, "executing warehouse query");
        let response = self
            .authorized(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| FdpError::Warehouse(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FdpError::Warehouse(format!(
                "query failed: HTTP {}",
                response.status()
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn airports() -> TableId {
        TableId::new("proj", "flights", "airports")
    }

    #[test]
    fn test_table_naming() {
        let id = airports();
        assert_eq!(id.qualified(), "proj.flights.airports");
        assert_eq!(id.external_qualified(), "proj.flights.airports_external");
        assert_eq!(id.to_string(), "proj.flights.airports");
    }

    #[tokio::test]
    async fn test_table_exists_distinguishes_absent_from_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/proj/datasets/flights/tables/airports"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = WarehouseClient::new(server.uri(), None);
        assert!(!client.table_exists(&airports()).await.unwrap());

        server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client.table_exists(&airports()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FdpError>(),
            Some(FdpError::TableLookup { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_rows_rejects_partial_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/proj/datasets/flights/tables/airports/insertAll"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "insertErrors": [{"index": 0, "errors": [{"reason": "invalid"}]}]
            })))
            .mount(&server)
            .await;

        let client = WarehouseClient::new(server.uri(), None);
        let rows = vec![serde_json::json!({"iata": "JFK"})];
        let err = client.insert_rows(&airports(), &rows).await.unwrap_err();
        assert!(err.to_string().contains("rejected 1 rows"));
    }

    #[tokio::test]
    async fn test_create_table_sends_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/proj/datasets/flights/tables"))
            .and(body_partial_json(serde_json::json!({
                "tableReference": {"tableId": "airports"},
                "schema": {"fields": [{"name": "iata", "type": "STRING", "mode": "REQUIRED"}]},
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WarehouseClient::new(server.uri(), None);
        let schema = vec![SchemaField {
            name: "iata".to_string(),
            field_type: "STRING".to_string(),
            mode: "REQUIRED".to_string(),
        }];
        client.create_table(&airports(), &schema).await.unwrap();
    }
}
