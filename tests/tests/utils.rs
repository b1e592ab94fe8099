use futures::{SinkExt, StreamExt};
use mock_service::MockService;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use surge_runtime::message::{ClientMessage, ServerMessage};
use surge_runtime::SurgeRuntime;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing_subscriber::FmtSubscriber;

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter("surge=debug,surge_runtime=debug,mock_service=debug")
            .try_init();
    });
}

/// A surge server on a free port, searching against `route` of its own mock service.
#[allow(unused)]
pub struct Harness {
    pub addr: SocketAddr,
    pub mock: MockService,
}

#[allow(unused)]
impl Harness {
    pub async fn start(route: &str) -> Self {
        Self::with(route, |runtime| runtime).await
    }

    pub async fn with(route: &str, tweak: impl FnOnce(SurgeRuntime) -> SurgeRuntime) -> Self {
        init();
        let mock = MockService::spawn().await.unwrap();
        let runtime = SurgeRuntime::new()
            .port(0)
            .target(mock.url(route).parse().unwrap())
            .request_timeout(Duration::from_secs(1))
            .publish_interval(Duration::from_millis(10));

        let server = tweak(runtime).bind().await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(server.serve());

        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
            mock,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn connect(&self) -> Socket {
        let (socket, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .unwrap();
        socket
    }
}

#[allow(unused)]
pub async fn send(socket: &mut Socket, message: &ClientMessage) {
    socket
        .send(Message::Text(message.to_text().unwrap()))
        .await
        .unwrap();
}

#[allow(unused)]
pub async fn send_raw(socket: &mut Socket, text: &str) {
    socket.send(Message::Text(text.to_string())).await.unwrap();
}

/// Next server message, skipping control frames.
#[allow(unused)]
pub async fn next(socket: &mut Socket) -> ServerMessage {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return ServerMessage::from_text(&text).unwrap(),
            Some(Ok(_)) => {}
            other => panic!("Socket ended unexpectedly: {other:?}"),
        }
    }
}

/// Messages up to and including the terminal one.
#[allow(unused)]
pub async fn until_terminal(socket: &mut Socket) -> Vec<ServerMessage> {
    let mut seen = vec![];
    loop {
        let message = next(socket).await;
        let done = message.is_terminal();
        seen.push(message);
        if done {
            return seen;
        }
    }
}
