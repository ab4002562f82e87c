//! Vote submission: checks, draft, signature, publish, fanout.
//!
//! Checks run cheapest-first and all before anything leaves the process:
//! attempt budget, caller identity, lifecycle gate, eligibility, then the
//! ballot itself. Only a signed event identical to the draft is published,
//! and every accepted publish is followed by a [`Topic::Votes`] notification.

use std::net::IpAddr;

use agora_events::{SignedEvent, Signer, UnsignedEvent, VoteChoice};
use agora_relay::Ack;
use agora_tally::{build_draft, VoteIntent};
use agora_types::{EventId, Position, PublicKey};
use agora_websocket::Topic;
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::EngineError;

/// How an interactive submission ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Submission {
    Published { id: EventId },
    /// The voter declined to sign. Nothing was sent to the relay.
    Cancelled,
}

impl Engine {
    /// Run the whole flow with an in-process signer.
    pub async fn submit_vote(
        &self,
        origin: IpAddr,
        caller: Option<&PublicKey>,
        candidate: PublicKey,
        position: &str,
        signer: &dyn Signer,
    ) -> Result<Submission, EngineError> {
        let draft = self.prepare_vote(origin, caller, candidate, position)?;

        let Some(signed) = signer.sign(draft.clone()).await else {
            info!(voter = %draft.pubkey, position, "vote cancelled by signer");
            return Ok(Submission::Cancelled);
        };
        if signed.to_unsigned() != draft || signed.verify_id().is_err() {
            return Err(EngineError::SignerMismatch);
        }

        let ack = self.publish_and_notify(&signed).await?;
        Ok(Submission::Published { id: ack.id })
    }

    /// Check everything and return the draft to be signed elsewhere.
    pub fn prepare_vote(
        &self,
        origin: IpAddr,
        caller: Option<&PublicKey>,
        candidate: PublicKey,
        position: &str,
    ) -> Result<UnsignedEvent, EngineError> {
        self.submissions.check(origin)?;
        let voter = self.access.require_voter(caller)?;
        self.gate.ensure_open()?;
        self.access.ensure_eligible(&voter)?;
        let intent = self.intent(voter, candidate, position)?;

        let draft = build_draft(&intent, &self.kinds, self.clock.now());
        debug!(%voter, position, kind = draft.kind, "vote drafted");
        Ok(draft)
    }

    /// Publish an event signed outside the process.
    ///
    /// The event must be exactly what [`prepare_vote`](Self::prepare_vote)
    /// would have drafted for the caller at its `created_at`. Draws on the
    /// same per-origin budget as drafting.
    pub async fn publish_signed(
        &self,
        origin: IpAddr,
        caller: Option<&PublicKey>,
        event: SignedEvent,
    ) -> Result<Ack, EngineError> {
        self.submissions.check(origin)?;
        let voter = self.access.require_voter(caller)?;
        if event.pubkey != voter {
            return Err(EngineError::Unauthorized);
        }
        self.gate.ensure_open()?;
        self.access.ensure_eligible(&voter)?;
        event.verify_id()?;

        let choice = VoteChoice::parse(&event.content)?;
        let intent = self.intent(voter, choice.candidate, &choice.position)?;
        let expected = build_draft(&intent, &self.kinds, event.created_at);
        if event.to_unsigned() != expected {
            return Err(EngineError::InvalidEvent(
                "event is not a well-formed vote for this election".into(),
            ));
        }
        if !self.election.in_window(event.created_at) || event.created_at > self.clock.now() {
            return Err(EngineError::InvalidEvent(format!(
                "created_at {} is outside the voting window",
                event.created_at
            )));
        }

        self.publish_and_notify(&event).await
    }

    fn intent(
        &self,
        voter: PublicKey,
        candidate: PublicKey,
        position: &str,
    ) -> Result<VoteIntent, EngineError> {
        let Position {
            cardinality,
            candidates,
            ..
        } = self
            .election
            .position(position)
            .ok_or_else(|| EngineError::UnknownPosition(position.to_string()))?;
        if !candidates.contains(&candidate) {
            return Err(EngineError::UnknownCandidate {
                position: position.to_string(),
                candidate,
            });
        }
        Ok(VoteIntent {
            voter,
            year: self.election.year,
            candidate,
            position: position.to_string(),
            cardinality: *cardinality,
        })
    }

    async fn publish_and_notify(&self, event: &SignedEvent) -> Result<Ack, EngineError> {
        let ack = self.relay.publish(event).await?;
        info!(id = %ack.id, voter = %event.pubkey, "vote published");
        self.notifier.publish(Topic::Votes);
        Ok(ack)
    }
}

