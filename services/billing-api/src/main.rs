//! Makerspace Billing API
//!
//! REST service for equipment access checks, cost estimates and final
//! reservation billing.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/equipment` - List access policies
//! - `GET /api/v1/equipment/{equipment_id}/policy` - Get a policy
//! - `PUT /api/v1/equipment/{equipment_id}/policy` - Create or replace a policy
//! - `POST /api/v1/billing/estimate` - Estimate a reservation's cost
//! - `POST /api/v1/billing/access-check` - Check access for a reservation
//! - `POST /api/v1/billing/finalize` - Bill a completed reservation
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use makerspace_billing_core::BillingService;
use makerspace_store::{Repositories, Snapshot};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    let env_file = makerspace_utils::load_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("billing_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(env_file = ?env_file, "Starting Makerspace Billing API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        currency = %config.billing.currency,
        utc_offset = %config.billing.utc_offset,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create repositories
    let repos = match &config.data_file {
        Some(path) => {
            let repos = Repositories::from_snapshot(Snapshot::load(path)?)?;
            tracing::info!(path = %path.display(), "Store seeded from snapshot");
            repos
        }
        None => {
            tracing::warn!("DATA_FILE not set, starting with an empty store");
            Repositories::in_memory()
        }
    };

    // Create billing service
    let billing = BillingService::new(repos, config.billing.clone());
    let policies = billing.verify_policies().await?;
    tracing::info!(policies, "Access policies verified");

    // Create application state
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(billing, config);

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    run_http_server(app, http_addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // API v1 routes
    let api_v1 = Router::new()
        // Policy routes
        .route("/equipment", get(handlers::list_policies))
        .route(
            "/equipment/{equipment_id}/policy",
            get(handlers::get_policy).put(handlers::put_policy),
        )
        // Billing routes
        .route("/billing/estimate", post(handlers::estimate))
        .route("/billing/access-check", post(handlers::access_check))
        .route("/billing/finalize", post(handlers::finalize));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    // Combine all routes
    Router::new()
        .nest("/api/v1", api_v1)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Calculations are in-memory; most requests finish well under 10ms
    let billing_latency_buckets = &[0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("billing_operation_duration_seconds".to_string()),
            billing_latency_buckets,
        )?
        .install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "billing_access_checks_total",
        "Total access checks by decision"
    );
    metrics::describe_counter!(
        "billing_reservations_finalized_total",
        "Total pay-per-use reservations billed"
    );
    metrics::describe_counter!(
        "billing_overuse_penalties_total",
        "Total reservations billed with an overuse penalty"
    );
    metrics::describe_counter!(
        "billing_policies_saved_total",
        "Total access policies created or replaced"
    );
    metrics::describe_histogram!(
        "billing_operation_duration_seconds",
        "Billing operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use makerspace_billing_core::BillingConfig;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config {
            http_port: 0,
            data_file: None,
            billing: BillingConfig::default(),
            request_timeout: Duration::from_secs(5),
            metrics_enabled: false,
        };
        let billing = BillingService::new(Repositories::in_memory(), config.billing.clone());
        build_router(AppState::new(billing, config), None)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_put_then_estimate() {
        let app = app();

        let policy = json!({
            "equipment_id": "laser-cutter-1",
            "access_type": "pay_per_use",
            "price_per_unit": "150",
            "cost_unit": "hour",
            "max_daily_cap": "500"
        });
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/api/v1/equipment/laser-cutter-1/policy", policy))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/equipment/laser-cutter-1/policy"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["access_type"], "pay_per_use");

        let request = json!({
            "user_id": "5b0e4c7e-1f7a-4c55-9a8e-3f1d2c6b7a90",
            "equipment_id": "laser-cutter-1",
            "duration_minutes": 90
        });
        let response = app
            .oneshot(json_request("POST", "/api/v1/billing/estimate", request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["applicable"], true);
        let total: Decimal = body["estimate"]["estimated_total"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(total, dec!(225));
    }

    #[tokio::test]
    async fn test_invalid_policy_is_rejected() {
        let policy = json!({
            "equipment_id": "laser-cutter-1",
            "access_type": "pay_per_use",
            "cost_unit": "hour"
        });
        let response = app()
            .oneshot(json_request("PUT", "/api/v1/equipment/laser-cutter-1/policy", policy))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_POLICY");
    }

    #[tokio::test]
    async fn test_misspelled_policy_field_is_rejected() {
        let policy = json!({
            "equipment_id": "laser-cutter-1",
            "access_type": "pay_per_use",
            "price_per_unit": "150",
            "cost_unit": "hour",
            "max_daily_cap_inr": "500"
        });
        let response = app()
            .oneshot(json_request("PUT", "/api/v1/equipment/laser-cutter-1/policy", policy))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_equipment_is_not_found() {
        let response = app()
            .oneshot(get_request("/api/v1/equipment/plasma-cutter/policy"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "POLICY_NOT_FOUND");
    }
}
