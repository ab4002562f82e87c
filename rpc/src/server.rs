//! Axum-based RPC server.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agora_engine::{Engine, EngineError, ViewerSession};
use agora_types::PublicKey;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::handlers;

pub type SharedState = Arc<RpcState>;

type SharedSession = Arc<tokio::sync::Mutex<ViewerSession>>;

struct SessionSlot {
    session: SharedSession,
    last_used: u64,
}

#[derive(Default)]
struct Sessions {
    slots: HashMap<PublicKey, SessionSlot>,
    uses: u64,
}

/// The engine plus one refresh session per viewer, so each keeps its own
/// last-known-good standings across requests.
///
/// At most `capacity` sessions are kept; opening one more drops the least
/// recently used. A dropped viewer's next refresh starts without a board.
pub struct RpcState {
    pub engine: Arc<Engine>,
    capacity: usize,
    sessions: Mutex<Sessions>,
}

impl RpcState {
    pub fn new(engine: Arc<Engine>, capacity: usize) -> Self {
        Self {
            engine,
            capacity: capacity.max(1),
            sessions: Mutex::new(Sessions::default()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().slots.len()
    }

    pub(crate) fn session_for(
        &self,
        caller: Option<PublicKey>,
    ) -> Result<SharedSession, EngineError> {
        let Some(viewer) = caller else {
            return Err(EngineError::Unauthorized);
        };
        let mut sessions = self.lock();
        sessions.uses += 1;
        let now = sessions.uses;
        if let Some(slot) = sessions.slots.get_mut(&viewer) {
            slot.last_used = now;
            return Ok(slot.session.clone());
        }

        let session = Arc::new(tokio::sync::Mutex::new(self.engine.session(Some(&viewer))?));
        if sessions.slots.len() >= self.capacity {
            let oldest = sessions
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                sessions.slots.remove(&oldest);
                debug!(evicted = %oldest, "viewer session dropped");
            }
        }
        sessions.slots.insert(
            viewer,
            SessionSlot {
                session: session.clone(),
                last_used: now,
            },
        );
        debug!(%viewer, sessions = sessions.slots.len(), "viewer session opened");
        Ok(session)
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// All routes. Handlers that key on the origin need the connection's peer
/// address, so serve this with `into_make_service_with_connect_info`.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/election", get(handlers::election))
        .route("/standings", get(handlers::standings))
        .route("/votes/draft", post(handlers::draft_vote))
        .route("/votes", post(handlers::publish_vote))
        .route("/auth/login", post(handlers::login))
        .route("/admin/voters/:pubkey/log", get(handlers::voter_log))
        .route("/admin/voting", put(handlers::set_voting))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: SharedState,
}

impl RpcServer {
    pub fn new(port: u16, engine: Arc<Engine>, max_sessions: usize) -> Self {
        Self {
            port,
            state: Arc::new(RpcState::new(engine, max_sessions)),
        }
    }

    /// Bind `0.0.0.0:port` and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("RPC server listening on {}", addr);
        self.serve(listener, shutdown).await
    }

    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(
            listener,
            router(self.state.clone()).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }
}
