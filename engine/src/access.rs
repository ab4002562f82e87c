//! Who may see and do what, and how often.
//!
//! Roles come from the admin allow-list; eligibility comes from the member
//! directory's tier. Attempts are budgeted per origin with fixed windows so
//! an abusive client is turned away before any draft is built or the relay
//! is touched.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use agora_tally::Directory;
use agora_types::{Clock, PublicKey, Timestamp};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::LimitConfig;
use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Voter,
    Admin,
}

pub struct AccessControl {
    admins: HashSet<PublicKey>,
    qualifying_tiers: HashSet<String>,
    directory: Arc<dyn Directory>,
}

impl AccessControl {
    pub fn new(
        admins: impl IntoIterator<Item = PublicKey>,
        qualifying_tiers: impl IntoIterator<Item = String>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            qualifying_tiers: qualifying_tiers.into_iter().collect(),
            directory,
        }
    }

    pub fn role(&self, caller: Option<&PublicKey>) -> Role {
        match caller {
            None => Role::Anonymous,
            Some(key) if self.admins.contains(key) => Role::Admin,
            Some(_) => Role::Voter,
        }
    }

    /// The caller's key, or `Unauthorized` for anonymous callers.
    pub fn require_voter(&self, caller: Option<&PublicKey>) -> Result<PublicKey, EngineError> {
        caller.copied().ok_or(EngineError::Unauthorized)
    }

    pub fn require_admin(&self, caller: Option<&PublicKey>) -> Result<PublicKey, EngineError> {
        match (self.role(caller), caller) {
            (Role::Admin, Some(key)) => Ok(*key),
            _ => Err(EngineError::Unauthorized),
        }
    }

    pub fn is_eligible(&self, voter: &PublicKey) -> bool {
        self.directory
            .tier(voter)
            .map_or(false, |tier| self.qualifying_tiers.contains(&tier))
    }

    pub fn ensure_eligible(&self, voter: &PublicKey) -> Result<(), EngineError> {
        if self.is_eligible(voter) {
            Ok(())
        } else {
            debug!(%voter, "ineligible voter");
            Err(EngineError::Ineligible)
        }
    }
}

/// Attempts from one origin in the current window.
struct Window {
    started: Timestamp,
    attempts: u32,
}

struct LimiterInner {
    windows: HashMap<IpAddr, Window>,
    last_sweep: Timestamp,
}

/// Per-origin fixed-window attempt counter.
///
/// An origin gets `max_attempts` within `window_secs` of its first attempt;
/// the window then resets. Expired windows are swept at most once per window
/// length, on the next check.
pub struct RateLimiter {
    name: &'static str,
    limit: LimitConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<LimiterInner>,
}

impl RateLimiter {
    pub fn new(name: &'static str, limit: LimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            name,
            limit,
            clock,
            inner: Mutex::new(LimiterInner {
                windows: HashMap::new(),
                last_sweep: now,
            }),
        }
    }

    /// Count one attempt from `origin`, or refuse it once the budget is spent.
    pub fn check(&self, origin: IpAddr) -> Result<(), EngineError> {
        let now = self.clock.now();
        let window_secs = self.limit.window_secs;
        let mut inner = self.lock();

        if inner.last_sweep.has_expired(window_secs, now) {
            sweep(&mut inner.windows, window_secs, now);
            inner.last_sweep = now;
        }

        let window = inner.windows.entry(origin).or_insert(Window {
            started: now,
            attempts: 0,
        });
        if window.started.has_expired(window_secs, now) {
            window.started = now;
            window.attempts = 0;
        }
        if window.attempts >= self.limit.max_attempts {
            let retry_after_secs = window_secs.saturating_sub(window.started.elapsed_since(now));
            warn!(limiter = self.name, %origin, retry_after_secs, "attempt budget exhausted");
            return Err(EngineError::TooManyAttempts { retry_after_secs });
        }
        window.attempts += 1;
        Ok(())
    }

    /// Drop windows that have run out. Also happens lazily inside [`check`](Self::check).
    pub fn sweep(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        sweep(&mut inner.windows, self.limit.window_secs, now);
        inner.last_sweep = now;
    }

    pub fn tracked_origins(&self) -> usize {
        self.lock().windows.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LimiterInner> {
        // The counters stay consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn sweep(windows: &mut HashMap<IpAddr, Window>, window_secs: u64, now: Timestamp) {
    let before = windows.len();
    windows.retain(|_, w| !w.started.has_expired(window_secs, now));
    let dropped = before - windows.len();
    if dropped > 0 {
        debug!(dropped, "swept idle rate-limit windows");
    }
}
