//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/ws`. Clients subscribe to topics and
//! receive a `{"topic": ...}` frame whenever the hub publishes on one.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hub::FanoutHub;
use crate::subscriptions::{ClientMessage, ClientSubscriptions, Notification, ServerMessage, Topic};

type SharedSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

pub struct WebSocketServer {
    pub port: u16,
    pub hub: Arc<FanoutHub>,
}

impl WebSocketServer {
    pub fn new(port: u16, hub: Arc<FanoutHub>) -> Self {
        Self { port, hub }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .with_state(self.hub.clone())
    }

    /// Bind `0.0.0.0:port` and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("WebSocket server listening on {}", addr);
        self.serve(listener, shutdown).await
    }

    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<FanoutHub>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// One connection: read client requests, keep one forwarder task per
/// subscribed topic, abort them all on disconnect.
async fn handle_socket(socket: WebSocket, hub: Arc<FanoutHub>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: SharedSink = Arc::new(Mutex::new(ws_sender));

    let mut client_subs = ClientSubscriptions::new();
    let mut forwarders: HashMap<Topic, JoinHandle<()>> = HashMap::new();

    debug!("New WebSocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_text_message(&text, &hub, &mut client_subs, &mut forwarders, &ws_sender)
                    .await;
            }
            Message::Close(_) => break,
            Message::Ping(data) => {
                let _ = ws_sender.lock().await.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    for (_, handle) in forwarders.drain() {
        handle.abort();
    }
    debug!("WebSocket client disconnected");
}

async fn handle_text_message(
    text: &str,
    hub: &FanoutHub,
    client_subs: &mut ClientSubscriptions,
    forwarders: &mut HashMap<Topic, JoinHandle<()>>,
    ws_sender: &SharedSink,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            let reply = ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            };
            send_json(ws_sender, &reply).await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Subscribe { topic } => {
            if client_subs.subscribe(topic) {
                // Subscribe before acking so nothing published after the ack is missed.
                let rx = hub.receiver(topic);
                let handle = tokio::spawn(forward_notifications(rx, ws_sender.clone(), topic));
                forwarders.insert(topic, handle);
                debug!("Client subscribed to {}", topic);
            }
            let ack = ServerMessage::Ack {
                action: "subscribe".to_string(),
                topic,
            };
            send_json(ws_sender, &ack).await;
        }
        ClientMessage::Unsubscribe { topic } => {
            let reply = if client_subs.unsubscribe(&topic) {
                if let Some(handle) = forwarders.remove(&topic) {
                    handle.abort();
                }
                ServerMessage::Ack {
                    action: "unsubscribe".to_string(),
                    topic,
                }
            } else {
                ServerMessage::Error {
                    message: format!("Not subscribed to {}", topic),
                }
            };
            send_json(ws_sender, &reply).await;
        }
        ClientMessage::Ping => {
            send_json(ws_sender, &ServerMessage::Pong).await;
        }
    }
}

async fn forward_notifications(mut rx: broadcast::Receiver<Topic>, ws_sender: SharedSink, topic: Topic) {
    loop {
        match rx.recv().await {
            Ok(topic) => {
                if !send_json(&ws_sender, &Notification { topic }).await {
                    break;
                }
            }
            // Notifications carry no payload, so one frame covers the gap.
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Client lagged behind by {} notifications on {}", n, topic);
                if !send_json(&ws_sender, &Notification { topic }).await {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Returns `false` once the client is gone.
async fn send_json<T: Serialize>(ws_sender: &SharedSink, msg: &T) -> bool {
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode WebSocket message: {}", e);
            return true;
        }
    };
    ws_sender.lock().await.send(Message::Text(text)).await.is_ok()
}
