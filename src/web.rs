//! The web view: a single `GET /` page.
//!
//! `GET /?n=N` renders the aggregation with `N` items per source. A missing
//! or non-numeric `n` falls back to the configured default; `n <= 0` is a
//! configuration error and answers `400 Bad Request` with an error page.
//! Failing sources still render as empty sections with a 200.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::aggregator::Aggregator;
use crate::fetch::Fetch;
use crate::outputs::html::{render_error_page, render_page};

pub struct AppState<F> {
    pub aggregator: Aggregator<F>,
}

/// Query string of the index page. `n` is kept as text so that garbage
/// falls back to the default instead of being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    n: Option<String>,
}

impl IndexQuery {
    fn requested(&self) -> Option<i64> {
        self.n.as_deref().and_then(|n| n.trim().parse::<i64>().ok())
    }
}

pub fn router<F: Fetch + 'static>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/", get(index::<F>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[instrument(level = "info", skip_all, fields(n = ?query.n))]
async fn index<F: Fetch + 'static>(
    State(state): State<Arc<AppState<F>>>,
    Query(query): Query<IndexQuery>,
) -> Response {
    let generated = Local::now().format("%Y-%m-%d %H:%M").to_string();
    let aggregator = &state.aggregator;

    let limit = match aggregator.resolve_limit(query.requested()) {
        Ok(limit) => limit,
        Err(e) => {
            warn!(error = %e, "Rejected request");
            let page = render_error_page(
                &e.to_string(),
                aggregator.config().default_limit,
                &generated,
            );
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
    };

    let result = aggregator.aggregate(limit).await;
    Html(render_page(&result, &generated)).into_response()
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve<F: Fetch + 'static>(
    aggregator: Aggregator<F>,
    addr: SocketAddr,
) -> std::io::Result<()> {
    let app = router(Arc::new(AppState { aggregator }));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Web view listening");
    axum::serve(listener, app).await
}
