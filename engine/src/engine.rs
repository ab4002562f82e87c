//! The engine: one election, its collaborators, and the admin views.

use std::net::IpAddr;
use std::sync::Arc;

use agora_events::{parse_votes, VoteEvent};
use agora_relay::Relay;
use agora_tally::{resolve, Directory};
use agora_types::{Clock, Election, EventKinds, PublicKey};
use agora_websocket::{Notifier, Topic};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::access::{AccessControl, RateLimiter, Role};
use crate::config::EngineConfig;
use crate::lifecycle::{spawn_periodic_check, LifecycleGate, VotingState};
use crate::pipeline::ViewerSession;
use crate::EngineError;

/// Everything the engine reaches outside itself.
pub struct EngineParts {
    pub relay: Arc<dyn Relay>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub directory: Arc<dyn Directory>,
}

/// Public view of the election, as served to any caller.
#[derive(Clone, Debug, Serialize)]
pub struct ElectionSummary {
    #[serde(flatten)]
    pub election: Election,
    pub state: VotingState,
}

/// One entry of an admin's per-voter log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoterLogEntry {
    pub event: VoteEvent,
    /// Part of the voter's resolved ballot, as opposed to superseded,
    /// repeated, or outside the rules.
    pub counted: bool,
}

pub struct Engine {
    pub(crate) election: Election,
    pub(crate) kinds: EventKinds,
    pub(crate) relay: Arc<dyn Relay>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) gate: Arc<LifecycleGate>,
    pub(crate) access: AccessControl,
    pub(crate) submissions: RateLimiter,
    pub(crate) logins: RateLimiter,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        election: Election,
        parts: EngineParts,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        election
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let gate = Arc::new(LifecycleGate::new(
            election.end_time,
            config.voting_enabled,
            parts.clock.clone(),
            parts.notifier.clone(),
        ));
        let access = AccessControl::new(
            config.admin_keys()?,
            config.qualifying_tiers.iter().cloned(),
            parts.directory.clone(),
        );

        info!(
            year = election.year,
            positions = election.positions.len(),
            end_time = %election.end_time,
            "engine ready"
        );

        Ok(Self {
            kinds: config.kinds(),
            submissions: RateLimiter::new("submissions", config.submission_limit, parts.clock.clone()),
            logins: RateLimiter::new("logins", config.login_limit, parts.clock.clone()),
            election,
            relay: parts.relay,
            notifier: parts.notifier,
            clock: parts.clock,
            directory: parts.directory,
            gate,
            access,
        })
    }

    pub fn election(&self) -> &Election {
        &self.election
    }

    pub fn kinds(&self) -> EventKinds {
        self.kinds
    }

    pub fn state(&self) -> VotingState {
        self.gate.state()
    }

    pub fn summary(&self) -> ElectionSummary {
        ElectionSummary {
            election: self.election.clone(),
            state: self.state(),
        }
    }

    pub fn role(&self, caller: Option<&PublicKey>) -> Role {
        self.access.role(caller)
    }

    /// Budgeted per origin. Anonymous callers are refused.
    pub fn login(&self, origin: IpAddr, caller: Option<&PublicKey>) -> Result<Role, EngineError> {
        self.logins.check(origin)?;
        let role = self.access.role(caller);
        if role == Role::Anonymous {
            return Err(EngineError::Unauthorized);
        }
        info!(%origin, ?role, "login");
        Ok(role)
    }

    /// A refresh pipeline for an authenticated viewer.
    pub fn session(self: &Arc<Self>, caller: Option<&PublicKey>) -> Result<ViewerSession, EngineError> {
        let viewer = self.access.require_voter(caller)?;
        Ok(ViewerSession::new(self.clone(), Some(viewer)))
    }

    /// Every vote event `voter` authored, newest first, including ones that
    /// no longer count.
    pub async fn voter_log(
        &self,
        caller: Option<&PublicKey>,
        voter: &PublicKey,
    ) -> Result<Vec<VoterLogEntry>, EngineError> {
        self.access.require_admin(caller)?;

        let raw = self
            .relay
            .fetch(&self.kinds.all(), Some(std::slice::from_ref(voter)))
            .await?;
        let parsed = parse_votes(&raw);
        if !parsed.rejected.is_empty() {
            warn!(%voter, rejected = parsed.rejected.len(), "voter has malformed vote events");
        }
        let mut events: Vec<VoteEvent> = parsed
            .votes
            .into_iter()
            .filter(|v| v.voter == *voter)
            .collect();
        let counted = resolve(&events, &self.election, &self.kinds).events();

        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        events.dedup_by(|a, b| a.id == b.id);
        Ok(events
            .into_iter()
            .map(|event| VoterLogEntry {
                counted: counted.iter().any(|c| c.id == event.id),
                event,
            })
            .collect())
    }

    /// The admin voting switch. Turning voting off is final.
    pub fn set_voting_enabled(
        &self,
        caller: Option<&PublicKey>,
        enabled: bool,
    ) -> Result<VotingState, EngineError> {
        let admin = self.access.require_admin(caller)?;
        let state = self.gate.set_enabled(enabled)?;
        info!(%admin, enabled, ?state, "voting switch changed");
        Ok(state)
    }

    /// Every `recheck_interval`: latch the gate, sweep idle rate-limit
    /// windows, and nudge viewers to refresh in case a push was missed.
    pub fn spawn_periodic_check(
        self: &Arc<Self>,
        interval: std::time::Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let engine = self.clone();
        spawn_periodic_check(self.gate.clone(), interval, shutdown, move |_| {
            engine.submissions.sweep();
            engine.logins.sweep();
            engine.notifier.publish(Topic::Votes);
        })
    }
}
