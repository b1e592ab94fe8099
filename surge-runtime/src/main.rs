use surge_runtime::SurgeRuntime;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "surge=info,surge_runtime=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();

    SurgeRuntime::new().with_args().run().await?;
    Ok(())
}
