//! The election's Open → Closed gate.
//!
//! Voting closes once `now >= end_time` or the administrative switch is
//! turned off. The transition happens at most once and is never undone; it
//! is observed lazily by whichever check runs first and announced on
//! [`Topic::Lifecycle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agora_types::{Clock, Timestamp};
use agora_websocket::{Notifier, Topic};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingState {
    Open,
    Closed,
}

pub struct LifecycleGate {
    end_time: Timestamp,
    enabled: AtomicBool,
    closed: AtomicBool,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl LifecycleGate {
    pub fn new(
        end_time: Timestamp,
        voting_enabled: bool,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            end_time,
            enabled: AtomicBool::new(voting_enabled),
            closed: AtomicBool::new(false),
            clock,
            notifier,
        }
    }

    /// Current state, latching the close if its condition now holds.
    pub fn state(&self) -> VotingState {
        if self.closed.load(Ordering::SeqCst) {
            return VotingState::Closed;
        }
        let now = self.clock.now();
        let past_deadline = now >= self.end_time;
        if !past_deadline && self.enabled.load(Ordering::SeqCst) {
            return VotingState::Open;
        }
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!(
                %now,
                end_time = %self.end_time,
                past_deadline,
                "voting closed"
            );
            self.notifier.publish(Topic::Lifecycle);
        }
        VotingState::Closed
    }

    pub fn ensure_open(&self) -> Result<(), EngineError> {
        match self.state() {
            VotingState::Open => Ok(()),
            VotingState::Closed => Err(EngineError::VotingClosed),
        }
    }

    /// Flip the administrative switch. Disabling closes voting for good;
    /// enabling a closed election is refused.
    pub fn set_enabled(&self, enabled: bool) -> Result<VotingState, EngineError> {
        if enabled {
            return match self.state() {
                VotingState::Open => Ok(VotingState::Open),
                VotingState::Closed => Err(EngineError::VotingClosed),
            };
        }
        self.enabled.store(false, Ordering::SeqCst);
        Ok(self.state())
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }
}

/// Re-check `gate` every `interval` until `shutdown` fires, handing each
/// tick's state to `on_tick`.
///
/// The first check runs one interval after spawning.
pub fn spawn_periodic_check<F>(
    gate: Arc<LifecycleGate>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
    on_tick: F,
) -> JoinHandle<()>
where
    F: Fn(VotingState) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let state = gate.state();
                    debug!(?state, "periodic lifecycle check");
                    on_tick(state);
                }
                _ = shutdown.recv() => {
                    debug!("periodic lifecycle check stopped");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullClock, NullNotifier};
    use std::sync::atomic::AtomicUsize;

    fn gate(now: u64, enabled: bool) -> (LifecycleGate, Arc<NullClock>, Arc<NullNotifier>) {
        let clock = Arc::new(NullClock::new(now));
        let notifier = Arc::new(NullNotifier::new());
        let gate = LifecycleGate::new(
            Timestamp::new(1_000),
            enabled,
            clock.clone(),
            notifier.clone(),
        );
        (gate, clock, notifier)
    }

    #[test]
    fn open_before_deadline() {
        let (gate, _, notifier) = gate(999, true);
        assert_eq!(gate.state(), VotingState::Open);
        assert!(gate.ensure_open().is_ok());
        assert!(notifier.published().is_empty());
    }

    #[test]
    fn closes_at_deadline_and_announces_once() {
        let (gate, clock, notifier) = gate(999, true);
        clock.set(1_000);
        assert_eq!(gate.ensure_open(), Err(EngineError::VotingClosed));
        assert_eq!(gate.state(), VotingState::Closed);
        assert_eq!(notifier.count(Topic::Lifecycle), 1);
    }

    #[test]
    fn close_is_irreversible() {
        let (gate, clock, _) = gate(1_000, true);
        assert_eq!(gate.state(), VotingState::Closed);
        // Even a clock that goes backwards cannot reopen it.
        clock.set(10);
        assert_eq!(gate.state(), VotingState::Closed);
        assert_eq!(gate.set_enabled(true), Err(EngineError::VotingClosed));
    }

    #[test]
    fn disabled_switch_closes() {
        let (gate, _, notifier) = gate(10, false);
        assert_eq!(gate.state(), VotingState::Closed);
        assert_eq!(notifier.count(Topic::Lifecycle), 1);
    }

    #[test]
    fn admin_disable_closes_for_good() {
        let (gate, _, notifier) = gate(10, true);
        assert_eq!(gate.set_enabled(true), Ok(VotingState::Open));
        assert_eq!(gate.set_enabled(false), Ok(VotingState::Closed));
        assert_eq!(gate.set_enabled(true), Err(EngineError::VotingClosed));
        assert_eq!(notifier.count(Topic::Lifecycle), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_check_observes_deadline() {
        let (gate, clock, notifier) = gate(10, true);
        let gate = Arc::new(gate);
        let ticks = Arc::new(AtomicUsize::new(0));
        let (stop_tx, stop_rx) = broadcast::channel(1);

        let counter = ticks.clone();
        let handle = spawn_periodic_check(gate.clone(), Duration::from_secs(600), stop_rx, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(601)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(notifier.published().is_empty());

        clock.set(1_000);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.count(Topic::Lifecycle), 1);

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
