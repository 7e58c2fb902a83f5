use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use metrics::MetricsRegistry;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::App;

struct ServeState {
    registry: Arc<MetricsRegistry>,
}

/// Runs the diagnostic HTTP server: text exposition under `/metrics`, a
/// prometheus-style instant query API, and a static dashboard.
pub async fn run(port: u16) -> anyhow::Result<()> {
    let app = App::open()?;

    if let Ok(stats) = app.storage.stats().await {
        app.registry
            .component("server")
            .set_indexed_documents(stats.document_count as f64);
    }

    let state = Arc::new(ServeState {
        registry: Arc::clone(&app.registry),
    });

    let router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/query", get(query_handler))
        .route("/dashboard", get(dashboard_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "serving metrics dashboard");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.close().await?;
    Ok(())
}

async fn metrics_handler(State(state): State<Arc<ServeState>>) -> Response {
    match state.registry.encode_text() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
struct QueryParams {
    query: String,
}

async fn query_handler(
    State(state): State<Arc<ServeState>>,
    Query(params): Query<QueryParams>,
) -> Response {
    if params.query.is_empty() {
        return (StatusCode::BAD_REQUEST, "query parameter is required").into_response();
    }

    let timestamp = Utc::now().timestamp() as f64;
    let result: Vec<serde_json::Value> = state
        .registry
        .query(&params.query)
        .into_iter()
        .map(|sample| {
            let mut metric = sample.labels;
            metric.insert("__name__".to_string(), sample.name);
            json!({
                "metric": metric,
                "value": [timestamp, sample.value.to_string()],
            })
        })
        .collect();

    Json(json!({
        "status": "success",
        "data": {
            "resultType": "vector",
            "result": result,
        }
    }))
    .into_response()
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(include_str!("dashboard.html"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("received shutdown signal");
}
