use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use surge::StartError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Failed to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid target URL: {0}")]
    Target(#[from] url::ParseError),

    #[cfg(feature = "metrics")]
    #[error("Failed to install the Prometheus exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub(crate) enum HandlerError {
    #[error("{0}")]
    Start(#[from] StartError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        use HandlerError::*;
        let status = match &self {
            Start(StartError::InvalidConfig(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Start(StartError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            Start(StartError::ChannelClosed) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
