//! Default surge runtime
//!
//! Builds the orchestrator with the HTTP issuer and the search target selector, then serves
//! it over HTTP and WebSocket on a single port.
use crate::{error::RuntimeError, issuer::HttpIssuer, server::SurgeServer};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use surge::{Orchestrator, OrchestratorSettings, SearchTargets};
use surge_core::DEFAULT_PORT;
#[allow(unused)]
use tracing::{debug, error, info, instrument, Instrument};
use url::Url;

pub type SurgeOrchestrator = Orchestrator<HttpIssuer, SearchTargets>;

pub const DEFAULT_TARGET: &str = "https://www.bing.com/search";

#[derive(Parser, Debug)]
#[command(version, about = "Synthetic search load generator")]
pub struct SurgeCli {
    /// Port for the HTTP and WebSocket server.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Base URL each generated search query is appended to.
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    target: Url,

    /// Bound on a single request, e.g. `10s` or `500ms`.
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    request_timeout: Duration,

    /// Minimum spacing between live updates. `0s` sends every change.
    #[arg(long, default_value = "100ms", value_parser = humantime::parse_duration)]
    publish_interval: Duration,

    /// Expose Prometheus metrics on this port.
    #[cfg(feature = "metrics")]
    #[arg(long)]
    metrics_port: Option<u16>,
}

/// Default surge runtime.
///
/// # Example
///
/// ```no_run
/// use surge_runtime::SurgeRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     SurgeRuntime::new()
///         .with_args()
///         .run()
///         .await
///         .unwrap();
/// }
/// ```
pub struct SurgeRuntime {
    port: u16,
    target: Option<Url>,
    settings: OrchestratorSettings,
    #[cfg(feature = "metrics")]
    metrics_port: Option<u16>,
}

impl Default for SurgeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SurgeRuntime {
    pub fn new() -> Self {
        SurgeRuntime {
            port: DEFAULT_PORT,
            target: None,
            settings: OrchestratorSettings::default(),
            #[cfg(feature = "metrics")]
            metrics_port: None,
        }
    }

    /// Use the default CLI arguments.
    ///
    /// `-p`, `--port` to set a custom port number (default `5000`)
    ///
    /// `-t`, `--target` to point the searches at another base URL
    ///
    /// `--request-timeout`, `--publish-interval` take human readable durations
    ///
    /// # Example
    /// ```ignore
    /// $ surge -p 8080 -t http://localhost:3002/search --request-timeout 2s
    /// ```
    pub fn with_args(self) -> Self {
        self.cli(SurgeCli::parse())
    }

    pub fn cli(mut self, args: SurgeCli) -> Self {
        self.port = args.port;
        self.target = Some(args.target);
        self.settings = self
            .settings
            .request_timeout(args.request_timeout)
            .publish_interval(args.publish_interval);
        #[cfg(feature = "metrics")]
        {
            self.metrics_port = args.metrics_port;
        }
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn target(mut self, target: Url) -> Self {
        self.target = Some(target);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings = self.settings.request_timeout(timeout);
        self
    }

    pub fn publish_interval(mut self, interval: Duration) -> Self {
        self.settings = self.settings.publish_interval(interval);
        self
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    pub fn orchestrator(&self) -> Result<SurgeOrchestrator, RuntimeError> {
        let target = match &self.target {
            Some(target) => target.clone(),
            None => Url::parse(DEFAULT_TARGET)?,
        };
        Ok(Orchestrator::with_settings(
            HttpIssuer::new()?,
            SearchTargets::new(target),
            self.settings.clone(),
        ))
    }

    /// Bind the listening socket without serving yet. Port `0` picks a free port.
    pub async fn bind(self) -> Result<SurgeServer, RuntimeError> {
        let orchestrator = self.orchestrator()?;
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        Ok(SurgeServer::bind(addr, orchestrator).await?)
    }

    #[instrument(name = "surge", skip_all, fields(port = self.port))]
    pub async fn run(self) -> Result<(), RuntimeError> {
        #[cfg(feature = "metrics")]
        if let Some(port) = self.metrics_port {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
                .install()?;
            info!("Prometheus metrics on port {port}.");
        }

        let server = self.bind().await?;
        info!("Listening on {}.", server.local_addr()?);
        server.serve().await?;
        Ok(())
    }
}
