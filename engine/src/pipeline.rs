//! Per-viewer refresh: fetch → parse → resolve → standings.
//!
//! Each [`ViewerSession`] keeps the last board it resolved successfully. A
//! relay outage then degrades to stale standings plus the error, never to
//! an empty page. Sessions share nothing with each other.

use std::sync::Arc;

use agora_events::parse_votes;
use agora_tally::{resolve, standings, PositionStanding, ResolvedBallots};
use agora_types::{PublicKey, Timestamp};
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::EngineError;

/// Resolved ballots and when they were fetched.
#[derive(Clone, Debug)]
pub struct Board {
    pub ballots: ResolvedBallots,
    pub fetched_at: Timestamp,
    /// Events the relay returned that could not be read as votes.
    pub malformed: usize,
}

/// What a viewer is shown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StandingsView {
    pub positions: Vec<PositionStanding>,
    pub fetched_at: Timestamp,
    /// The relay could not be reached; these are the last standings that
    /// could be computed.
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ViewerSession {
    engine: Arc<Engine>,
    viewer: Option<PublicKey>,
    board: Option<Board>,
}

impl ViewerSession {
    pub fn new(engine: Arc<Engine>, viewer: Option<PublicKey>) -> Self {
        Self {
            engine,
            viewer,
            board: None,
        }
    }

    pub fn viewer(&self) -> Option<&PublicKey> {
        self.viewer.as_ref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Fetch and recompute. On `RelayUnavailable` with a previous board,
    /// returns that board's standings marked stale instead of failing.
    pub async fn refresh(&mut self) -> Result<StandingsView, EngineError> {
        match self.fetch_board().await {
            Ok(board) => {
                let view = self.view(&board, None);
                self.board = Some(board);
                Ok(view)
            }
            Err(EngineError::RelayUnavailable(reason)) => match &self.board {
                Some(board) => {
                    warn!(%reason, fetched_at = %board.fetched_at, "relay unavailable, serving last known standings");
                    Ok(self.view(board, Some(reason)))
                }
                None => Err(EngineError::RelayUnavailable(reason)),
            },
            Err(e) => Err(e),
        }
    }

    /// Standings from the last successful refresh, without fetching.
    pub fn last_known(&self) -> Option<StandingsView> {
        self.board.as_ref().map(|board| self.view(board, None))
    }

    async fn fetch_board(&self) -> Result<Board, EngineError> {
        let engine = &self.engine;
        let raw = engine.relay.fetch(&engine.kinds.all(), None).await?;
        let parsed = parse_votes(&raw);
        if !parsed.rejected.is_empty() {
            warn!(count = parsed.rejected.len(), "ignoring malformed vote events");
        }
        let ballots = resolve(&parsed.votes, &engine.election, &engine.kinds);
        debug!(
            events = raw.len(),
            ballots = ballots.len(),
            "board refreshed"
        );
        Ok(Board {
            ballots,
            fetched_at: engine.clock.now(),
            malformed: parsed.rejected.len(),
        })
    }

    fn view(&self, board: &Board, error: Option<String>) -> StandingsView {
        let positions = standings(
            &board.ballots,
            self.engine.directory.as_ref(),
            &self.engine.election,
            self.viewer.as_ref(),
        );
        StandingsView {
            positions,
            fetched_at: board.fetched_at,
            stale: error.is_some(),
            error,
        }
    }
}
