use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::clients::UpstreamError;

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
static DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static UPSTREAM_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

fn register_collector<T>(collector: T) -> T
where
    T: prometheus::core::Collector + Clone + 'static,
{
    let _ = registry().register(Box::new(collector.clone()));
    collector
}

fn http_requests_total() -> &'static IntCounterVec {
    HTTP_REQUESTS_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "guard_http_requests_total",
                    "Gateway HTTP request count.",
                ),
                &["route", "method", "status"],
            )
            .expect("create guard_http_requests_total"),
        )
    })
}

fn http_request_duration_seconds() -> &'static HistogramVec {
    HTTP_REQUEST_DURATION_SECONDS.get_or_init(|| {
        register_collector(
            HistogramVec::new(
                HistogramOpts::new(
                    "guard_http_request_duration_seconds",
                    "Gateway HTTP request duration in seconds.",
                )
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
                &["route", "method"],
            )
            .expect("create guard_http_request_duration_seconds"),
        )
    })
}

fn decisions_total() -> &'static IntCounterVec {
    DECISIONS_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "guard_decisions_total",
                    "Authorization decisions by outcome.",
                ),
                &["outcome"],
            )
            .expect("create guard_decisions_total"),
        )
    })
}

fn upstream_requests_total() -> &'static IntCounterVec {
    UPSTREAM_REQUESTS_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "guard_upstream_requests_total",
                    "Outbound upstream calls by upstream and outcome.",
                ),
                &["upstream", "outcome"],
            )
            .expect("create guard_upstream_requests_total"),
        )
    })
}

pub fn record_http_request(route: &str, method: &str, status: u16, duration: Duration) {
    let status = status.to_string();
    http_requests_total()
        .with_label_values(&[route, method, status.as_str()])
        .inc();
    http_request_duration_seconds()
        .with_label_values(&[route, method])
        .observe(duration.as_secs_f64());
}

pub fn record_decision(outcome: &str) {
    decisions_total().with_label_values(&[outcome]).inc();
}

pub fn observe_upstream_call<T>(upstream: &str, result: &Result<T, UpstreamError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(UpstreamError::Timeout) => "timeout",
        Err(UpstreamError::Http(_)) => "transport_error",
        Err(UpstreamError::BadStatus(_)) => "bad_status",
        Err(UpstreamError::EmptyBody) => "empty_body",
        Err(UpstreamError::Decode) => "decode_error",
        Err(UpstreamError::NotFound) => "not_found",
    };
    upstream_requests_total()
        .with_label_values(&[upstream, outcome])
        .inc();
}

pub fn render() -> String {
    // Collectors register lazily; make sure all are in before the scrape.
    let _ = http_requests_total();
    let _ = http_request_duration_seconds();
    let _ = decisions_total();
    let _ = upstream_requests_total();

    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_exposes_registered_families_after_recording() {
        record_http_request("/orders/{order_id}/full", "GET", 200, Duration::from_millis(3));
        record_decision("authorized");

        let text = render();
        assert!(text.contains("guard_http_requests_total"));
        assert!(text.contains("guard_decisions_total"));
    }
}
