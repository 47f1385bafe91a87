use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::collector::{render_exposition, Collector};

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Install the process-wide recorder for the exporter's own metrics.
///
/// Safe to call more than once; later calls return the installed handle.
pub fn init_recorder() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;

    // Ignore error if the handle was already set by a concurrent caller.
    let _ = PROM_HANDLE.set(handle.clone());
    Ok(handle)
}

#[derive(Clone)]
pub struct AppState {
    collector: Arc<dyn Collector>,
    self_metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(collector: Arc<dyn Collector>, self_metrics: Option<PrometheusHandle>) -> Self {
        Self {
            collector,
            self_metrics,
        }
    }
}

pub fn router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve `app` on `addr` until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind metrics listener on {addr}: {e}"))?;

    tracing::info!(%addr, "metrics server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("metrics server error: {e}"))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.collector.collect().await {
        Ok(samples) => {
            let mut body = render_exposition(&state.collector.describe(), &samples);
            if let Some(handle) = &state.self_metrics {
                body.push_str(&handle.render());
            }
            (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("{e}\n")).into_response(),
    }
}

async fn health_handler() -> &'static str {
    "ok\n"
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        collector::MeterCollector,
        pipeline::Pipeline,
        testing::{Ending, ScriptedSource},
    };

    fn app(source: ScriptedSource, metrics_path: &str) -> Router {
        let collector = MeterCollector::new(Pipeline {
            source,
            line_buffer: 100,
            deadline: Duration::from_secs(5),
        });
        router(AppState::new(Arc::new(collector), None), metrics_path)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_fresh_reading() {
        let source = ScriptedSource::new(
            [
                "/ISK5\\2M550T-1012",
                "1-0:1.8.1(001581.123*kWh)",
                "1-0:1.8.2(001427.007*kWh)",
                "0-1:24.2.1(180630193501S)(01354.810*m3)",
                "!4A0B",
            ],
            Ending::End,
        );

        let response = app(source, "/metrics")
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = body_text(response).await;
        assert!(body.contains("# TYPE energy_electricity_total counter\n"));
        assert!(body.contains("energy_electricity_total{type=\"low\"} 1581.123\n"));
        assert!(body.contains("energy_electricity_total{type=\"normal\"} 1427.007\n"));
        assert!(body.contains("energy_gas_total 1354.81\n"));
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_unavailable_reading() {
        let source = ScriptedSource::new(["garbage"], Ending::Timeout);

        let response = app(source, "/metrics")
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains("reading unavailable"));
    }

    #[tokio::test]
    async fn health_endpoint_does_not_touch_device() {
        let source = ScriptedSource::empty();

        let response = app(source.clone(), "/metrics")
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(source.opened(), 0);
    }

    #[tokio::test]
    async fn custom_metrics_path() {
        let source = ScriptedSource::empty();
        let router = app(source, "/p1/metrics");

        let response = router
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(Request::get("/p1/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // Reachable, but the empty source has no telegram to offer.
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
