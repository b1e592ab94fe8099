use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::{router, Hits};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=info,tower_http=info")
        .init();

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], 8002)))
        .install()?;

    let hits = Hits::default();
    tokio::spawn(hits_per_second(hits.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], 3002));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Mock search service on {}.", listener.local_addr()?);
    axum::serve(listener, router(hits)).await?;
    Ok(())
}

async fn hits_per_second(hits: Hits) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let count = hits.take();
        if count > 0 {
            info!("{count} requests/s");
        }
    }
}
