use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use guard_auth::{OidcAuthenticator, VerifiedIdentity};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::clients::{OrderDetailClient, OrdersClient};
use crate::config::{AuthMode, GuardConfig, StartupError};
use crate::guard::{AuthorizationDecision, GuardService};
use crate::identity::extract_vendor_id;
use crate::metrics;

const FULL_ORDER_ROUTE: &str = "/orders/{order_id}/full";

#[derive(Clone)]
pub struct AppState {
    pub config: GuardConfig,
    oidc: Option<OidcAuthenticator>,
    guard: GuardService,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

fn json_error(status: StatusCode, error: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            message: message.into(),
        }),
    )
}

pub async fn router(config: GuardConfig) -> Result<Router, StartupError> {
    let oidc = if config.auth_mode == AuthMode::Oidc {
        let oidc_config = config.oidc.clone().ok_or_else(|| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "oidc auth mode requires oidc config".to_string(),
        })?;

        Some(
            OidcAuthenticator::new(oidc_config)
                .await
                .map_err(|err| StartupError {
                    code: err.code,
                    message: err.message,
                })?,
        )
    } else {
        None
    };

    let connect = config.connect_timeout();
    let read = config.read_timeout();

    let orders = OrdersClient::new(config.orders_base_url.clone(), connect, read).map_err(|_| {
        StartupError {
            code: "ERR_ORDERS_CLIENT_INIT",
            message: "failed to initialize orders upstream client".to_string(),
        }
    })?;
    let detail = OrderDetailClient::new(config.order_detail_base_url.clone(), connect, read)
        .map_err(|_| StartupError {
            code: "ERR_DETAIL_CLIENT_INIT",
            message: "failed to initialize order detail upstream client".to_string(),
        })?;

    let state = AppState {
        config,
        oidc,
        guard: GuardService::new(orders, detail),
    };

    Ok(Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_endpoint))
        .route(FULL_ORDER_ROUTE, get(full_order_detail))
        .with_state(state))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_endpoint() -> impl IntoResponse {
    metrics::render()
}

async fn full_order_detail(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let result = handle_full_order_detail(&state, order_id, &headers).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err((status, _)) => *status,
    };
    record_request(status, started.elapsed());

    result
}

async fn handle_full_order_detail(
    state: &AppState,
    order_id: i64,
    headers: &HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let identity = extract_identity(state, headers).await?;
    let vendor_id = extract_vendor_id(&identity, &state.config.vendor_claim);

    let decision = state
        .guard
        .authorize_and_fetch(order_id, vendor_id.as_deref())
        .await;

    metrics::record_decision(decision.outcome_label());

    // The single central translation of orchestrator outcomes to transport.
    match decision {
        AuthorizationDecision::Authorized(detail) => {
            tracing::info!(order_id, outcome = "authorized", "full order detail served");
            Ok(Json(detail))
        }
        AuthorizationDecision::Forbidden(reason) => {
            tracing::warn!(order_id, outcome = "forbidden", reason, "request denied");
            Err(json_error(StatusCode::FORBIDDEN, "forbidden", reason))
        }
        AuthorizationDecision::NotFound => {
            tracing::info!(order_id, outcome = "not_found", "order not found");
            Err(json_error(
                StatusCode::NOT_FOUND,
                "not_found",
                "order not found",
            ))
        }
        AuthorizationDecision::UpstreamFailure(reason) => {
            tracing::warn!(order_id, outcome = "upstream_failure", reason = %reason, "upstream failure");
            Err(json_error(StatusCode::BAD_GATEWAY, "upstream_error", reason))
        }
    }
}

async fn extract_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<VerifiedIdentity, ApiError> {
    match state.config.auth_mode {
        AuthMode::Local => {
            validate_local_auth_shared_secret(
                headers,
                state.config.local_auth_shared_secret.as_deref(),
            )?;
            Ok(local_identity(headers, &state.config.vendor_claim))
        }
        AuthMode::Oidc => {
            let Some(auth) = state.oidc.as_ref() else {
                return Err(json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "oidc authenticator is not initialized",
                ));
            };

            auth.authenticate(headers).await.map_err(|err| match err.code {
                "ERR_AUTH_UNAVAILABLE" => json_error(
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "identity provider unavailable",
                ),
                _ => json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.message),
            })
        }
    }
}

/// Dev-mode identity: the claim set is assembled from request headers. Both
/// headers are optional so an identity-free request still reaches the
/// orchestrator, which owns that denial.
fn local_identity(headers: &HeaderMap, vendor_claim: &str) -> VerifiedIdentity {
    let mut claims = Map::new();

    if let Some(vendor_id) = header_value(headers, "x-guard-vendor-id") {
        claims.insert(vendor_claim.to_string(), Value::String(vendor_id));
    }
    if let Some(subject) = header_value(headers, "x-guard-subject") {
        claims.insert("sub".to_string(), Value::String(subject));
    }

    VerifiedIdentity::from_claims(claims)
}

fn validate_local_auth_shared_secret(
    headers: &HeaderMap,
    expected_secret: Option<&str>,
) -> Result<(), ApiError> {
    let Some(expected_secret) = expected_secret else {
        return Ok(());
    };

    let provided_secret = header_value(headers, "x-guard-local-auth-secret").ok_or_else(|| {
        json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing local auth secret",
        )
    })?;

    if provided_secret != expected_secret {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "invalid local auth secret",
        ));
    }

    Ok(())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn record_request(status: StatusCode, elapsed: Duration) {
    metrics::record_http_request(FULL_ORDER_ROUTE, "GET", status.as_u16(), elapsed);
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn local_identity_populates_configured_claim_and_subject() {
        let mut headers = HeaderMap::new();
        headers.insert("x-guard-vendor-id", HeaderValue::from_static("vendor-a"));
        headers.insert("x-guard-subject", HeaderValue::from_static("auth0|123"));

        let identity = local_identity(&headers, "vendorId");
        assert_eq!(identity.claim_string("vendorId").as_deref(), Some("vendor-a"));
        assert_eq!(identity.subject().as_deref(), Some("auth0|123"));
    }

    #[test]
    fn local_identity_without_headers_is_empty() {
        let identity = local_identity(&HeaderMap::new(), "vendorId");
        assert_eq!(extract_vendor_id(&identity, "vendorId"), None);
    }

    #[test]
    fn shared_secret_is_enforced_when_configured() {
        let mut headers = HeaderMap::new();
        assert!(validate_local_auth_shared_secret(&headers, None).is_ok());

        let err = validate_local_auth_shared_secret(&headers, Some("s3cret")).unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        headers.insert(
            "x-guard-local-auth-secret",
            HeaderValue::from_static("wrong"),
        );
        let err = validate_local_auth_shared_secret(&headers, Some("s3cret")).unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        headers.insert(
            "x-guard-local-auth-secret",
            HeaderValue::from_static("s3cret"),
        );
        assert!(validate_local_auth_shared_secret(&headers, Some("s3cret")).is_ok());
    }
}
