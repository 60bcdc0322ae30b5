use async_trait::async_trait;
use countdown_core::models::{PushConfig, TimerPayload};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::codec::{connect_error_message, encode_message, EnginePacket, SocketPacket};
use super::{JoinRequest, PushConnection, PushEvent, PushTransport, TransportError};
use super::{JOIN_EVENT, UPDATE_EVENT};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_BUFFER: usize = 64;

/// Socket.IO client over a plain websocket, no long-polling fallback.
#[derive(Debug, Clone)]
pub struct SocketIoTransport {
    url: String,
    path: String,
    connect_timeout: Duration,
}

impl SocketIoTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: "/socket.io".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &PushConfig) -> Self {
        Self {
            url: config.url.clone(),
            path: config.path.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Websocket endpoint. `http(s)` base URLs are mapped to `ws(s)`.
    pub fn endpoint(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };

        let path = self.path.trim_end_matches('/');
        format!("{}{}/?EIO=4&transport=websocket", base, path)
    }

    async fn handshake(&self, join: &JoinRequest) -> Result<WsStream, TransportError> {
        let endpoint = self.endpoint();
        tracing::debug!("Connecting push channel to {}", endpoint);

        let (mut ws, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        // Engine.IO open
        loop {
            match EnginePacket::decode(&next_text(&mut ws).await?)? {
                EnginePacket::Open(info) => {
                    tracing::debug!(
                        "Engine.IO session {} (ping interval {}ms)",
                        info.sid,
                        info.ping_interval
                    );
                    break;
                }
                EnginePacket::Close => return Err(TransportError::ConnectionClosed),
                _ => {}
            }
        }

        send_text(&mut ws, encode_message(&SocketPacket::Connect(None))).await?;

        // Socket.IO connect ack
        loop {
            match EnginePacket::decode(&next_text(&mut ws).await?)? {
                EnginePacket::Ping(data) => {
                    send_text(&mut ws, EnginePacket::Pong(data).encode()).await?;
                }
                EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                    SocketPacket::Connect(_) => break,
                    SocketPacket::ConnectError(data) => {
                        return Err(TransportError::Rejected(connect_error_message(&data)));
                    }
                    SocketPacket::Disconnect => return Err(TransportError::ConnectionClosed),
                    _ => {}
                },
                EnginePacket::Close => return Err(TransportError::ConnectionClosed),
                _ => {}
            }
        }

        let payload = serde_json::to_value(join)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        send_text(&mut ws, encode_message(&SocketPacket::event(JOIN_EVENT, payload))).await?;

        tracing::info!(
            "Joined push updates for timer {} in project {}",
            join.timer_id,
            join.project_id
        );
        Ok(ws)
    }
}

#[async_trait]
impl PushTransport for SocketIoTransport {
    async fn connect(&self, join: &JoinRequest) -> Result<PushConnection, TransportError> {
        let ws = tokio::time::timeout(self.connect_timeout, self.handshake(join))
            .await
            .map_err(|_| TransportError::Timeout)??;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(read_loop(ws, tx));

        Ok(PushConnection::new(rx, Some(task)))
    }
}

async fn next_text(ws: &mut WsStream) -> Result<String, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::ConnectionClosed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::ConnectionFailed(e.to_string())),
        }
    }
}

async fn send_text(ws: &mut WsStream, text: String) -> Result<(), TransportError> {
    ws.send(Message::Text(text))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))
}

/// Forward `timer_update` events until the socket goes away or the
/// receiving side is closed.
async fn read_loop(ws: WsStream, events: mpsc::Sender<PushEvent>) {
    let (mut sink, mut stream) = ws.split();

    let reason = loop {
        let frame = match stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => break "connection closed".to_string(),
            Some(Ok(_)) => continue,
            Some(Err(e)) => break e.to_string(),
        };

        let packet = match EnginePacket::decode(&frame) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!("Ignoring undecodable push frame: {}", e);
                continue;
            }
        };

        match packet {
            EnginePacket::Ping(data) => {
                let pong = Message::Text(EnginePacket::Pong(data).encode());
                if let Err(e) = sink.send(pong).await {
                    break e.to_string();
                }
            }
            EnginePacket::Message(data) => match SocketPacket::decode(&data) {
                Ok(SocketPacket::Event { name, args, .. }) if name == UPDATE_EVENT => {
                    let Some(first) = args.into_iter().next() else {
                        tracing::warn!("timer_update without payload");
                        continue;
                    };
                    match serde_json::from_value::<TimerPayload>(first) {
                        Ok(payload) => {
                            if events.send(PushEvent::TimerUpdate(payload)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!("Ignoring malformed timer_update: {}", e),
                    }
                }
                Ok(SocketPacket::Event { name, .. }) => {
                    tracing::debug!("Ignoring push event {}", name);
                }
                Ok(SocketPacket::Disconnect) => break "disconnected by server".to_string(),
                Ok(SocketPacket::ConnectError(data)) => break connect_error_message(&data),
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring undecodable push packet: {}", e),
            },
            EnginePacket::Close => break "closed by server".to_string(),
            _ => {}
        }
    };

    tracing::warn!("Push channel ended: {}", reason);
    let _ = events.send(PushEvent::Disconnected(reason)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let transport = SocketIoTransport::new("ws://localhost:5000/");
        assert_eq!(
            transport.endpoint(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_endpoint_maps_http_schemes() {
        let transport = SocketIoTransport::new("https://timers.example.com").with_path("/io/");
        assert_eq!(
            transport.endpoint(),
            "wss://timers.example.com/io/?EIO=4&transport=websocket"
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let transport = SocketIoTransport::new("ws://127.0.0.1:1")
            .with_connect_timeout(Duration::from_secs(2));
        let join = JoinRequest::new("1".into(), "7".into());

        let err = transport.connect(&join).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionFailed(_) | TransportError::Timeout
        ));
    }
}
