use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
static VALIDATION_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static EDIT_WINDOW_REJECTIONS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

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
                    "survey_gateway_http_requests_total",
                    "Survey API HTTP request count.",
                ),
                &["route", "method", "status"],
            )
            .expect("create survey_gateway_http_requests_total"),
        )
    })
}

fn http_request_duration_seconds() -> &'static HistogramVec {
    HTTP_REQUEST_DURATION_SECONDS.get_or_init(|| {
        register_collector(
            HistogramVec::new(
                HistogramOpts::new(
                    "survey_gateway_http_request_duration_seconds",
                    "Survey API HTTP request duration in seconds.",
                )
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
                &["route", "method", "outcome"],
            )
            .expect("create survey_gateway_http_request_duration_seconds"),
        )
    })
}

fn validation_failures_total() -> &'static IntCounterVec {
    VALIDATION_FAILURES_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "survey_gateway_validation_failures_total",
                    "Create requests rejected by field validation.",
                ),
                &["entity"],
            )
            .expect("create survey_gateway_validation_failures_total"),
        )
    })
}

fn edit_window_rejections_total() -> &'static IntCounter {
    EDIT_WINDOW_REJECTIONS_TOTAL.get_or_init(|| {
        register_collector(
            IntCounter::new(
                "survey_gateway_edit_window_rejections_total",
                "Response updates rejected because the edit window closed.",
            )
            .expect("create survey_gateway_edit_window_rejections_total"),
        )
    })
}

pub fn observe_http_request(route: &str, method: &str, status: u16, duration: Duration) {
    let status_str = status.to_string();
    http_requests_total()
        .with_label_values(&[route, method, status_str.as_str()])
        .inc();

    let outcome = if (200..400).contains(&status) {
        "success"
    } else {
        "error"
    };
    http_request_duration_seconds()
        .with_label_values(&[route, method, outcome])
        .observe(duration.as_secs_f64());
}

/// `entity` is `survey` or `survey_response`.
pub fn observe_validation_failure(entity: &str) {
    validation_failures_total()
        .with_label_values(&[entity])
        .inc();
}

pub fn inc_edit_window_rejection() {
    edit_window_rejections_total().inc();
}

pub fn render() -> Result<(Vec<u8>, String), prometheus::Error> {
    // Counters without labels show up at zero before their first increment.
    let _ = edit_window_rejections_total();

    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_observed_series() {
        observe_http_request("/api/surveys", "GET", 200, Duration::from_millis(3));
        observe_validation_failure("survey");

        let (body, content_type) = render().expect("render should succeed");
        let text = String::from_utf8(body).expect("exposition is utf-8");
        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains("survey_gateway_http_requests_total"));
        assert!(text.contains("route=\"/api/surveys\""));
        assert!(text.contains("survey_gateway_validation_failures_total{entity=\"survey\"}"));
        assert!(text.contains("survey_gateway_edit_window_rejections_total"));
    }
}
