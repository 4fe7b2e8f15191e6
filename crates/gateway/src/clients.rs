use std::time::Duration;

use http::StatusCode;
use serde_json::Value;

use crate::metrics;
use crate::ownership::OrderSummary;

/// Failure of one outbound upstream call, translated at the client boundary.
/// Raw transport errors never cross into the orchestrator.
#[derive(Debug)]
pub enum UpstreamError {
    Timeout,
    Http(reqwest::Error),
    BadStatus(StatusCode),
    EmptyBody,
    Decode,
    NotFound,
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamError::Timeout => write!(f, "request timed out"),
            UpstreamError::Http(_) => write!(f, "transport error"),
            UpstreamError::BadStatus(status) => write!(f, "unexpected status {}", status.as_u16()),
            UpstreamError::EmptyBody => write!(f, "empty response body"),
            UpstreamError::Decode => write!(f, "undecodable response body"),
            UpstreamError::NotFound => write!(f, "order not found"),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl From<reqwest::Error> for UpstreamError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Http(value)
        }
    }
}

fn build_http_client(
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(read_timeout)
        .build()
        .map_err(UpstreamError::Http)
}

async fn read_json_body(resp: reqwest::Response) -> Result<Value, UpstreamError> {
    let body = resp.bytes().await?;
    if body.is_empty() {
        return Err(UpstreamError::EmptyBody);
    }
    serde_json::from_slice(&body).map_err(|_| UpstreamError::Decode)
}

/// Client for the orders upstream; fetches the minimal ownership record.
#[derive(Clone)]
pub struct OrdersClient {
    base_url: String,
    http: reqwest::Client,
}

impl OrdersClient {
    pub fn new(
        base_url: String,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http = build_http_client(connect_timeout, read_timeout)?;
        Ok(Self { base_url, http })
    }

    /// One outbound request, no internal retries. 404 is domain-visible as
    /// `NotFound`; every other failure is an upstream error.
    pub async fn fetch_order(&self, order_id: i64) -> Result<OrderSummary, UpstreamError> {
        let url = format!("{}/orders/{}", self.base_url.trim_end_matches('/'), order_id);
        let result = self.fetch(&url).await;
        metrics::observe_upstream_call("orders", &result);
        result
    }

    async fn fetch(&self, url: &str) -> Result<OrderSummary, UpstreamError> {
        let resp = self.http.get(url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(UpstreamError::BadStatus(resp.status()));
        }

        let body = read_json_body(resp).await?;
        serde_json::from_value(body).map_err(|_| UpstreamError::Decode)
    }
}

/// Client for the detail aggregator; returns the payload verbatim.
#[derive(Clone)]
pub struct OrderDetailClient {
    base_url: String,
    http: reqwest::Client,
}

impl OrderDetailClient {
    pub fn new(
        base_url: String,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http = build_http_client(connect_timeout, read_timeout)?;
        Ok(Self { base_url, http })
    }

    pub async fn fetch_full_order(&self, order_id: i64) -> Result<Value, UpstreamError> {
        let url = format!(
            "{}/orders/{}/full",
            self.base_url.trim_end_matches('/'),
            order_id
        );
        let result = self.fetch(&url).await;
        metrics::observe_upstream_call("order_detail", &result);
        result
    }

    async fn fetch(&self, url: &str) -> Result<Value, UpstreamError> {
        let resp = self.http.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(UpstreamError::BadStatus(resp.status()));
        }

        read_json_body(resp).await
    }
}
