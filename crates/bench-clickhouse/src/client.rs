//! Thin HTTP client for the ClickHouse HTTP interface.

use crate::error::ClickHouseError;
use crate::format::parse_tab_separated;
use bench_core::ResultSet;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Connection settings for one ClickHouse server.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// Base URL of the HTTP interface, e.g. `http://127.0.0.1:18123`.
    pub endpoint: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl ClickHouseConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            database: "default".to_string(),
            user: "default".to_string(),
            password: String::new(),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

/// HTTP client bound to one server.
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    http: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseConfig) -> Result<Self, ClickHouseError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// `GET /ping`; the server answers `Ok.` once it accepts queries.
    pub async fn ping(&self) -> Result<bool, ClickHouseError> {
        let url = format!("{}/ping", self.config.endpoint);
        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        Ok(response.text().await?.trim() == "Ok.")
    }

    /// Execute a statement and discard its output.
    pub async fn execute(&self, sql: &str) -> Result<(), ClickHouseError> {
        tracing::debug!("Executing: {sql}");
        self.post(sql, None, &[]).await?;
        Ok(())
    }

    /// Run a query and return its `TabSeparated` output as cell strings.
    pub async fn query_rows(
        &self,
        sql: &str,
        query_id: Option<&str>,
    ) -> Result<ResultSet, ClickHouseError> {
        let body = format!("{} FORMAT TabSeparated", strip_trailing_semicolon(sql));
        let response = self.post(&body, query_id, &[]).await?;
        let text = response.text().await?;
        Ok(parse_tab_separated(&text))
    }

    /// Run a query and decode its `JSONEachRow` output.
    pub async fn query_json<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>, ClickHouseError> {
        let body = format!("{} FORMAT JSONEachRow", strip_trailing_semicolon(sql));
        let response = self
            .post(&body, None, &[("output_format_json_quote_64bit_integers", "0")])
            .await?;
        let text = response.text().await?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| ClickHouseError::Decode(format!("{e}: {line}")))
            })
            .collect()
    }

    /// Insert pre-encoded `JSONEachRow` lines into `table`.
    pub async fn insert_json_lines(
        &self,
        table: &str,
        columns: &[&str],
        body: String,
    ) -> Result<(), ClickHouseError> {
        let column_list = columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!("INSERT INTO `{table}` ({column_list}) FORMAT JSONEachRow");

        let response = self
            .http
            .post(&self.config.endpoint)
            .query(&[
                ("database", self.config.database.as_str()),
                ("query", insert.as_str()),
            ])
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn post(
        &self,
        sql: &str,
        query_id: Option<&str>,
        settings: &[(&str, &str)],
    ) -> Result<Response, ClickHouseError> {
        let mut params: Vec<(&str, &str)> = vec![("database", self.config.database.as_str())];
        if let Some(id) = query_id {
            params.push(("query_id", id));
        }
        params.extend_from_slice(settings);

        let response = self
            .http
            .post(&self.config.endpoint)
            .query(&params)
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(sql.to_string())
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, ClickHouseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClickHouseError::Server {
        status: status.as_u16(),
        body,
    })
}

fn strip_trailing_semicolon(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}
