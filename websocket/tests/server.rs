use std::sync::Arc;
use std::time::Duration;

use agora_websocket::{FanoutHub, Notifier, Topic, WebSocketServer};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

async fn start(hub: Arc<FanoutHub>) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = WebSocketServer::new(addr.port(), hub);
    tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stop_rx.await;
            })
            .await
            .unwrap();
    });
    (format!("ws://{addr}/ws"), stop_tx)
}

async fn next_json<S>(read: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let next = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    });
    next.await.expect("no frame within 5s")
}

#[tokio::test]
async fn subscribed_client_receives_content_free_frames() {
    let hub = Arc::new(FanoutHub::default());
    let (url, _stop) = start(hub.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.unwrap();
    let (mut write, mut read) = ws.split();

    write
        .send(Message::Text(json!({"action": "subscribe", "topic": "votes"}).to_string()))
        .await
        .unwrap();
    assert_eq!(
        next_json(&mut read).await,
        json!({"type": "ack", "action": "subscribe", "topic": "votes"})
    );

    hub.publish(Topic::Lifecycle);
    hub.publish(Topic::Votes);
    assert_eq!(next_json(&mut read).await, json!({"topic": "votes"}));
}

#[tokio::test]
async fn unsubscribe_and_errors_are_acknowledged() {
    let hub = Arc::new(FanoutHub::default());
    let (url, _stop) = start(hub).await;

    let (ws, _) = connect_async(url.as_str()).await.unwrap();
    let (mut write, mut read) = ws.split();

    write
        .send(Message::Text(json!({"action": "unsubscribe", "topic": "lifecycle"}).to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut read).await["type"], "error");

    write.send(Message::Text("garbage".into())).await.unwrap();
    assert_eq!(next_json(&mut read).await["type"], "error");

    write
        .send(Message::Text(json!({"action": "ping"}).to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut read).await, json!({"type": "pong"}));
}
