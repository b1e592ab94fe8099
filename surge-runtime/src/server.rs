use crate::{
    error::{HandlerError, ServerError},
    message::{ClientMessage, ServerMessage, StartResponse, StatusResponse, StopResponse},
    runtime::SurgeOrchestrator,
};
use axum::{
    extract::{
        connect_info::ConnectInfo,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, State,
    },
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use surge::{RunEvent, StateSummary};
use surge_core::{RunConfig, RunId};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::time::timeout;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

/// A bound listener plus the routes, ready to serve.
pub struct SurgeServer {
    listener: TcpListener,
    app: Router,
    orchestrator: SurgeOrchestrator,
}

impl SurgeServer {
    pub async fn bind(
        addr: SocketAddr,
        orchestrator: SurgeOrchestrator,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            app: router(orchestrator.clone()),
            orchestrator,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn orchestrator(&self) -> &SurgeOrchestrator {
        &self.orchestrator
    }

    /// Serve until Ctrl-C. A run still in progress at shutdown is stopped.
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for Ctrl-C: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `signal` resolves, then stop the live run and wait for its terminal
    /// event so the actors wind down instead of being dropped with the runtime.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let orchestrator = self.orchestrator;
        let stopper = orchestrator.clone();
        debug!("Axum server starting up...");
        axum::serve(
            self.listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            signal.await;
            info!("Shutting down.");
            stopper.stop();
        })
        .await?;

        drain(&orchestrator).await;
        Ok(())
    }
}

/// Wait, bounded by one request timeout plus a grace second, for the live run to end.
async fn drain(orchestrator: &SurgeOrchestrator) {
    let mut events = orchestrator.subscribe();
    let StateSummary::Running { run_id, .. } = orchestrator.status() else {
        return;
    };
    orchestrator.stop();

    let bound = orchestrator.settings().request_timeout + Duration::from_secs(1);
    match timeout(bound, finished(&mut events, run_id)).await {
        Ok(()) => info!(%run_id, "Run wound down."),
        Err(_) => warn!(%run_id, "Run still winding down after {bound:?}, exiting anyway."),
    }
}

async fn finished(events: &mut Receiver<RunEvent>, run_id: RunId) {
    loop {
        match events.recv().await {
            Ok(RunEvent::Finished { run_id: ended, .. }) if ended == run_id => return,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return,
        }
    }
}

pub fn router(orchestrator: SurgeOrchestrator) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route("/ws", get(ws))
        .with_state(orchestrator)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[instrument(skip_all)]
async fn start(
    State(orchestrator): State<SurgeOrchestrator>,
    Json(config): Json<RunConfig>,
) -> Result<(StatusCode, Json<StartResponse>), HandlerError> {
    let run_id = orchestrator.start(config)?;
    Ok((StatusCode::ACCEPTED, Json(StartResponse { run_id })))
}

#[instrument(skip_all)]
async fn stop(State(orchestrator): State<SurgeOrchestrator>) -> (StatusCode, Json<StopResponse>) {
    let stopped = orchestrator.stop();
    (StatusCode::ACCEPTED, Json(StopResponse { stopped }))
}

async fn status(State(orchestrator): State<SurgeOrchestrator>) -> Json<StatusResponse> {
    Json(orchestrator.status().into())
}

async fn ws(
    State(orchestrator): State<SurgeOrchestrator>,
    connection_info: ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, orchestrator, connection_info.0))
}

#[instrument(name = "ws", skip(socket, orchestrator))]
async fn handle_ws(socket: WebSocket, orchestrator: SurgeOrchestrator, addr: SocketAddr) {
    debug!("Client connected.");
    let mut events = orchestrator.subscribe();
    let mut feed = ClientFeed::default();
    let (mut sink, mut stream) = socket.split();

    // A client joining mid-run first learns which run is live and where it stands.
    if let StateSummary::Running {
        run_id, snapshot, ..
    } = orchestrator.status()
    {
        let catch_up = [
            ServerMessage::TestStarted { run_id },
            ServerMessage::TestUpdate {
                run_id,
                data: snapshot,
            },
        ];
        for message in catch_up {
            if feed.admit(&message) && !push(&mut sink, &message).await {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_client_text(&orchestrator, &text) {
                        if !push(&mut sink, &reply).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!("WebSocket error: {err}");
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    let message = ServerMessage::from(event);
                    if feed.admit(&message) && !push(&mut sink, &message).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Client is slow, skipped {skipped} events.");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!("Client disconnected.");
}

/// What one socket has been sent so far.
///
/// The catch-up is read from the live aggregate after subscribing, so events already
/// queued on the receiver can repeat its `test_started` or carry older totals. A client
/// sees one start per run and totals that never decrease.
#[derive(Debug, Default)]
struct ClientFeed {
    run_id: Option<RunId>,
    forwarded: u64,
    ended: bool,
}

impl ClientFeed {
    fn admit(&mut self, message: &ServerMessage) -> bool {
        let (run_id, total) = match message {
            ServerMessage::TestRejected { .. } => return true,
            ServerMessage::TestStarted { run_id } => (*run_id, None),
            ServerMessage::TestUpdate { run_id, data }
            | ServerMessage::TestComplete { run_id, data }
            | ServerMessage::TestStopped { run_id, data }
            | ServerMessage::TestFailed { run_id, data, .. } => {
                (*run_id, Some(data.total_requests))
            }
        };

        if self.run_id != Some(run_id) {
            self.run_id = Some(run_id);
            self.forwarded = 0;
            self.ended = false;
        } else if self.ended {
            return false;
        } else if !message.is_terminal() && total.map_or(true, |total| total < self.forwarded) {
            return false;
        }

        if let Some(total) = total {
            self.forwarded = total;
        }
        self.ended = message.is_terminal();
        true
    }
}

/// Act on one client frame. Returns a reply meant for this client only.
fn handle_client_text(orchestrator: &SurgeOrchestrator, text: &str) -> Option<ServerMessage> {
    match ClientMessage::from_text(text) {
        Ok(ClientMessage::StartTest { data }) => match orchestrator.start(data) {
            Ok(_) => None,
            Err(err) => {
                warn!("Start rejected: {err}");
                Some(ServerMessage::TestRejected {
                    reason: err.to_string(),
                })
            }
        },
        Ok(ClientMessage::StopTest) => {
            orchestrator.stop();
            None
        }
        Err(err) => {
            warn!("Ignoring malformed message: {err}");
            None
        }
    }
}

async fn push(sink: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let text = match message.to_text() {
        Ok(text) => text,
        Err(err) => {
            error!("Failed to encode {message:?}: {err}");
            return true;
        }
    };
    sink.send(Message::Text(text)).await.is_ok()
}
