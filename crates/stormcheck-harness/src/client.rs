//! GraphQL client for the query API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{GraphQlResponse, StormReportsData, StormReportsResult};
use crate::query::StormReportsQuery;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

/// Client for `POST {api_url}/query`.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphQlClient {
    /// Create a client with a per-request timeout.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/query", api_url.trim_end_matches('/')),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute `query` and decode its `data` member as `T`.
    ///
    /// Fails on transport errors, non-200 status, a malformed envelope, a
    /// non-empty `errors` array, or missing `data`.
    pub async fn query<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        debug!(endpoint = %self.endpoint, %query, "GraphQL request");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphQlResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(source) => return Err(Error::Decode { source, body }),
        };

        if !envelope.errors.is_empty() {
            return Err(Error::GraphQl(envelope.errors));
        }

        envelope.data.ok_or(Error::MissingData)
    }

    /// Execute a `stormReports` query.
    pub async fn storm_reports(&self, query: &StormReportsQuery) -> Result<StormReportsResult> {
        let data: StormReportsData = self.query(&query.render()).await?;
        Ok(data.storm_reports)
    }
}
