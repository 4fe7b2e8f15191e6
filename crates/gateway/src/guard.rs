use serde_json::Value;

use crate::clients::{OrderDetailClient, OrdersClient, UpstreamError};

/// Outcome of one authorization-and-fetch run. Transient; translated to a
/// transport response exactly once, at the endpoint boundary.
#[derive(Debug)]
pub enum AuthorizationDecision {
    Authorized(Value),
    Forbidden(&'static str),
    NotFound,
    UpstreamFailure(String),
}

impl AuthorizationDecision {
    pub fn outcome_label(&self) -> &'static str {
        match self {
            AuthorizationDecision::Authorized(_) => "authorized",
            AuthorizationDecision::Forbidden(_) => "forbidden",
            AuthorizationDecision::NotFound => "not_found",
            AuthorizationDecision::UpstreamFailure(_) => "upstream_failure",
        }
    }
}

/// Composes the two upstream clients into one gateway decision.
#[derive(Clone)]
pub struct GuardService {
    orders: OrdersClient,
    detail: OrderDetailClient,
}

impl GuardService {
    pub fn new(orders: OrdersClient, detail: OrderDetailClient) -> Self {
        Self { orders, detail }
    }

    /// Strict short-circuit sequence: identity presence, summary fetch,
    /// ownership resolution, comparison, and only then the detail fetch.
    /// The ownership check runs entirely on the lightweight summary so an
    /// unauthorized caller never triggers the aggregator call.
    pub async fn authorize_and_fetch(
        &self,
        order_id: i64,
        vendor_id: Option<&str>,
    ) -> AuthorizationDecision {
        let vendor_id = vendor_id.map(str::trim).filter(|v| !v.is_empty());
        let Some(vendor_id) = vendor_id else {
            return AuthorizationDecision::Forbidden("no vendor identity in token");
        };

        let summary = match self.orders.fetch_order(order_id).await {
            Ok(summary) => summary,
            Err(UpstreamError::NotFound) => return AuthorizationDecision::NotFound,
            Err(err) => {
                tracing::warn!(order_id, error = %err, "orders upstream call failed");
                return AuthorizationDecision::UpstreamFailure(format!(
                    "orders upstream: {}",
                    err
                ));
            }
        };

        // Missing owner on a fetched summary is upstream data quality, not a
        // caller failure; the caller did nothing wrong.
        let owner = summary.resolved_owner().map(str::trim).filter(|o| !o.is_empty());
        let Some(owner) = owner else {
            tracing::warn!(order_id, "order summary has no owner field");
            return AuthorizationDecision::UpstreamFailure(
                "owner field missing from order summary".to_string(),
            );
        };

        if !owner.eq_ignore_ascii_case(vendor_id) {
            return AuthorizationDecision::Forbidden(
                "order does not belong to authenticated vendor",
            );
        }

        match self.detail.fetch_full_order(order_id).await {
            Ok(detail) => AuthorizationDecision::Authorized(detail),
            Err(err) => {
                tracing::warn!(order_id, error = %err, "order detail upstream call failed");
                AuthorizationDecision::UpstreamFailure(format!("order detail upstream: {}", err))
            }
        }
    }
}
