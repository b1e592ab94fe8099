//! A stand-in search endpoint to point load tests at.
//!
//! Every route answers `GET ...search?q=<query>`; the path decides how it behaves.
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand::Rng;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Number of requests served, across all routes.
#[derive(Clone, Debug, Default)]
pub struct Hits(Arc<AtomicU64>);

impl Hits {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Read and reset.
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }

    fn bump(&self) {
        counter!("mock-service.hits").increment(1);
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

pub fn router(hits: Hits) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/delay/ms/:delay_ms/search", get(delay))
        .route("/status/:code/search", get(status))
        .route("/flaky/:percent/search", get(flaky))
        .with_state(hits)
        .layer(TraceLayer::new_for_http())
}

/// A mock service running in the background, for tests.
pub struct MockService {
    pub addr: SocketAddr,
    pub hits: Hits,
    handle: JoinHandle<()>,
}

impl MockService {
    /// Serve on a free local port.
    pub async fn spawn() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Hits::default();
        let app = router(hits.clone());
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("Mock service failed: {err}");
            }
        });
        Ok(Self { addr, hits, handle })
    }

    /// Base URL of `route`, e.g. `url("/delay/ms/10/search")`.
    pub fn url(&self, route: &str) -> String {
        format!("http://{}{route}", self.addr)
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[debug_handler]
async fn search(State(hits): State<Hits>, Query(query): Query<SearchQuery>) -> String {
    hits.bump();
    results(query)
}

#[debug_handler]
async fn delay(
    State(hits): State<Hits>,
    Path(delay_ms): Path<u64>,
    Query(query): Query<SearchQuery>,
) -> String {
    hits.bump();
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    results(query)
}

#[debug_handler]
async fn status(State(hits): State<Hits>, Path(code): Path<u16>) -> StatusCode {
    hits.bump();
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

#[debug_handler]
async fn flaky(
    State(hits): State<Hits>,
    Path(percent): Path<u32>,
    Query(query): Query<SearchQuery>,
) -> Result<String, StatusCode> {
    hits.bump();
    if rand::thread_rng().gen_range(0..100) < percent {
        debug!("Failing on purpose.");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(results(query))
}

fn results(query: SearchQuery) -> String {
    format!("Results for {}", query.q.as_deref().unwrap_or(""))
}
