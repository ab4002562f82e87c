//! RPC request handlers.

use std::net::SocketAddr;

use agora_engine::{ElectionSummary, Role, StandingsView, VoterLogEntry, VotingState};
use agora_events::{SignedEvent, UnsignedEvent};
use agora_types::{EventId, PublicKey};
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::server::SharedState;

/// Header carrying the authenticated caller's hex pubkey, set by the
/// session layer in front of this server.
pub const CALLER_HEADER: &str = "x-agora-pubkey";

/// The caller named by [`CALLER_HEADER`], if any.
pub struct Caller(pub Option<PublicKey>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(CALLER_HEADER) else {
            return Ok(Caller(None));
        };
        let hex = value
            .to_str()
            .map_err(|_| RpcError::InvalidRequest(format!("{CALLER_HEADER} is not ASCII")))?;
        PublicKey::from_hex(hex)
            .map(|key| Caller(Some(key)))
            .map_err(|e| RpcError::InvalidRequest(format!("{CALLER_HEADER}: {e}")))
    }
}

// ── Election ─────────────────────────────────────────────────────────────

/// GET /election
pub async fn election(State(state): State<SharedState>) -> Json<ElectionSummary> {
    Json(state.engine.summary())
}

/// GET /standings
pub async fn standings(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> Result<Json<StandingsView>, RpcError> {
    let session = state.session_for(caller)?;
    let mut session = session.lock().await;
    Ok(Json(session.refresh().await?))
}

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DraftRequest {
    pub candidate: PublicKey,
    pub position: String,
}

/// POST /votes/draft
pub async fn draft_vote(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Caller(caller): Caller,
    Json(req): Json<DraftRequest>,
) -> Result<Json<UnsignedEvent>, RpcError> {
    let draft = state
        .engine
        .prepare_vote(peer.ip(), caller.as_ref(), req.candidate, &req.position)?;
    Ok(Json(draft))
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub id: EventId,
    pub message: String,
}

/// POST /votes
pub async fn publish_vote(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Caller(caller): Caller,
    Json(event): Json<SignedEvent>,
) -> Result<Json<PublishResponse>, RpcError> {
    let ack = state
        .engine
        .publish_signed(peer.ip(), caller.as_ref(), event)
        .await?;
    Ok(Json(PublishResponse {
        id: ack.id,
        message: ack.message,
    }))
}

// ── Auth ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub pubkey: PublicKey,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub role: Role,
}

/// POST /auth/login
pub async fn login(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, RpcError> {
    let role = state.engine.login(peer.ip(), Some(&req.pubkey))?;
    Ok(Json(LoginResponse { role }))
}

// ── Admin ────────────────────────────────────────────────────────────────

/// GET /admin/voters/:pubkey/log
pub async fn voter_log(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    Path(pubkey): Path<String>,
) -> Result<Json<Vec<VoterLogEntry>>, RpcError> {
    let voter = PublicKey::from_hex(&pubkey)
        .map_err(|e| RpcError::InvalidRequest(format!("voter pubkey: {e}")))?;
    Ok(Json(state.engine.voter_log(caller.as_ref(), &voter).await?))
}

#[derive(Deserialize)]
pub struct VotingSwitchRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct VotingSwitchResponse {
    pub state: VotingState,
}

/// PUT /admin/voting
pub async fn set_voting(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    Json(req): Json<VotingSwitchRequest>,
) -> Result<Json<VotingSwitchResponse>, RpcError> {
    let voting = state.engine.set_voting_enabled(caller.as_ref(), req.enabled)?;
    Ok(Json(VotingSwitchResponse { state: voting }))
}
