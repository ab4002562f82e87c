//! The relay client seam and its websocket implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agora_events::{RawEvent, SignedEvent};
use agora_types::{EventId, PublicKey};
use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::frame::{ClientFrame, Filter, RelayFrame};

/// A relay's acknowledgement of a published event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub id: EventId,
    pub message: String,
}

/// The event store the engine reads votes from and publishes votes to.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Every stored event of `kinds`, optionally restricted to `authors`.
    async fn fetch(
        &self,
        kinds: &[u16],
        authors: Option<&[PublicKey]>,
    ) -> Result<Vec<RawEvent>, RelayError>;

    async fn publish(&self, event: &SignedEvent) -> Result<Ack, RelayError>;
}

/// Relay client over a websocket. Each call opens its own connection.
pub struct WsRelay {
    url: String,
    timeout: Duration,
    next_sub: AtomicU64,
}

impl WsRelay {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            next_sub: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn subscription_id(&self) -> String {
        format!("agora-{}", self.next_sub.fetch_add(1, Ordering::Relaxed))
    }

    async fn fetch_inner(&self, sub_id: &str, filter: &Filter) -> Result<Vec<RawEvent>, RelayError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| RelayError::Unavailable(format!("connect to {}: {e}", self.url)))?;
        let (mut write, mut read) = stream.split();

        send(&mut write, ClientFrame::Req { sub_id, filter }).await?;
        let events = collect_until_eose(&mut read, sub_id).await?;

        if let Err(e) = send(&mut write, ClientFrame::Close { sub_id }).await {
            debug!(sub_id, error = %e, "failed to close subscription");
        }
        let _ = write.close().await;
        Ok(events)
    }

    async fn publish_inner(&self, event: &SignedEvent) -> Result<Ack, RelayError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| RelayError::Unavailable(format!("connect to {}: {e}", self.url)))?;
        let (mut write, mut read) = stream.split();

        send(&mut write, ClientFrame::Event(event)).await?;
        let ack = await_ok(&mut read, event.id).await;
        let _ = write.close().await;
        ack
    }
}

#[async_trait]
impl Relay for WsRelay {
    async fn fetch(
        &self,
        kinds: &[u16],
        authors: Option<&[PublicKey]>,
    ) -> Result<Vec<RawEvent>, RelayError> {
        let sub_id = self.subscription_id();
        let filter = Filter {
            kinds: kinds.to_vec(),
            authors: authors.map(<[PublicKey]>::to_vec),
        };
        let result = tokio::time::timeout(self.timeout, self.fetch_inner(&sub_id, &filter))
            .await
            .map_err(|_| {
                RelayError::Unavailable(format!("no EOSE within {}s", self.timeout.as_secs_f32()))
            })
            .and_then(|r| r);

        match &result {
            Ok(events) => debug!(sub_id = %sub_id, count = events.len(), "fetched events"),
            Err(e) => warn!(sub_id = %sub_id, error = %e, "fetch failed"),
        }
        result
    }

    async fn publish(&self, event: &SignedEvent) -> Result<Ack, RelayError> {
        let result = tokio::time::timeout(self.timeout, self.publish_inner(event))
            .await
            .map_err(|_| {
                RelayError::Unavailable(format!("no OK within {}s", self.timeout.as_secs_f32()))
            })
            .and_then(|r| r);

        match &result {
            Ok(_) => info!(id = %event.id, kind = event.kind, "event published"),
            Err(e) => warn!(id = %event.id, error = %e, "publish failed"),
        }
        result
    }
}

async fn send<S>(write: &mut S, frame: ClientFrame<'_>) -> Result<(), RelayError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    write
        .send(Message::Text(frame.to_json()))
        .await
        .map_err(|e| RelayError::Unavailable(format!("send: {e}")))
}

/// Next text frame, parsed. Malformed frames and notices are skipped here.
async fn next_frame<S>(read: &mut S) -> Result<RelayFrame, RelayError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = read.next().await {
        let text = match msg.map_err(|e| RelayError::Unavailable(format!("receive: {e}")))? {
            Message::Text(text) => text,
            Message::Close(_) => {
                return Err(RelayError::Unavailable("relay closed the connection".into()))
            }
            _ => continue,
        };
        match RelayFrame::parse(&text) {
            Ok(RelayFrame::Notice(notice)) => warn!(%notice, "relay notice"),
            Ok(frame) => return Ok(frame),
            Err(e) => warn!(error = %e, "skipping malformed relay frame"),
        }
    }
    Err(RelayError::Unavailable("connection ended".into()))
}

async fn collect_until_eose<S>(read: &mut S, sub_id: &str) -> Result<Vec<RawEvent>, RelayError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut events = Vec::new();
    loop {
        match next_frame(read).await? {
            RelayFrame::Event { sub_id: s, event } if s == sub_id => events.push(event),
            RelayFrame::Eose { sub_id: s } if s == sub_id => return Ok(events),
            RelayFrame::Closed { sub_id: s, reason } if s == sub_id => {
                return Err(RelayError::Unavailable(format!("subscription closed: {reason}")))
            }
            RelayFrame::Error(reason) => return Err(RelayError::Unavailable(reason)),
            other => debug!(?other, "ignoring frame"),
        }
    }
}

async fn await_ok<S>(read: &mut S, id: EventId) -> Result<Ack, RelayError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match next_frame(read).await? {
            RelayFrame::Ok {
                id: acked,
                accepted,
                message,
            } if acked == id => {
                return if accepted {
                    Ok(Ack { id, message })
                } else {
                    Err(RelayError::Rejected {
                        id,
                        reason: message,
                    })
                };
            }
            RelayFrame::Error(reason) => return Err(RelayError::Unavailable(reason)),
            other => debug!(?other, "ignoring frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_ids_are_unique_per_client() {
        let relay = WsRelay::new("ws://127.0.0.1:1", Duration::from_secs(1));
        let a = relay.subscription_id();
        let b = relay.subscription_id();
        assert_ne!(a, b);
        assert!(a.starts_with("agora-"));
    }
}
