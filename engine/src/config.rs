//! Engine configuration with TOML file support.
//!
//! Two files: the engine config ([`EngineConfig`]) and the election file
//! ([`ElectionFile`]) it points to, which carries the ballot, candidate
//! profiles and the member directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use agora_tally::{Member, Profile, StaticDirectory};
use agora_types::{
    Election, EventKinds, Position, PublicKey, Timestamp, DEFAULT_MULTI_SEAT_KIND,
    DEFAULT_SINGLE_SEAT_KIND,
};

use crate::logging::LogFormat;
use crate::EngineError;

/// A fixed-window attempt budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
        }
    }
}

/// Configuration for an Agora engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Websocket URL of the event relay.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Upper bound on one relay fetch or publish.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How often the lifecycle gate is re-checked and viewers nudged.
    #[serde(default = "default_recheck_interval_secs")]
    pub recheck_interval_secs: u64,

    /// Administrative voting switch. `false` closes voting for good.
    #[serde(default = "default_true")]
    pub voting_enabled: bool,

    #[serde(default = "default_single_seat_kind")]
    pub single_seat_kind: u16,

    #[serde(default = "default_multi_seat_kind")]
    pub multi_seat_kind: u16,

    #[serde(default)]
    pub submission_limit: LimitConfig,

    #[serde(default)]
    pub login_limit: LimitConfig,

    /// Hex public keys allowed into the admin views.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Membership tiers that may vote.
    #[serde(default = "default_qualifying_tiers")]
    pub qualifying_tiers: Vec<String>,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// Viewer sessions the HTTP API keeps at once. The least recently used
    /// one is dropped to make room.
    #[serde(default = "default_max_viewer_sessions")]
    pub max_viewer_sessions: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_election_file")]
    pub election_file: PathBuf,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_relay_url() -> String {
    "ws://127.0.0.1:7777".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_recheck_interval_secs() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_single_seat_kind() -> u16 {
    DEFAULT_SINGLE_SEAT_KIND
}

fn default_multi_seat_kind() -> u16 {
    DEFAULT_MULTI_SEAT_KIND
}

fn default_max_attempts() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    900
}

fn default_qualifying_tiers() -> Vec<String> {
    vec!["full".to_string()]
}

fn default_rpc_port() -> u16 {
    7080
}

fn default_ws_port() -> u16 {
    7081
}

fn default_max_viewer_sessions() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_election_file() -> PathBuf {
    PathBuf::from("election.toml")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn kinds(&self) -> EventKinds {
        EventKinds {
            single_seat: self.single_seat_kind,
            multi_seat: self.multi_seat_kind,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }

    pub fn admin_keys(&self) -> Result<Vec<PublicKey>, EngineError> {
        self.admins
            .iter()
            .map(|hex| {
                PublicKey::from_hex(hex)
                    .map_err(|e| EngineError::Config(format!("admin key {hex:?}: {e}")))
            })
            .collect()
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.single_seat_kind == self.multi_seat_kind {
            return Err(EngineError::Config(
                "single_seat_kind and multi_seat_kind must differ".into(),
            ));
        }
        for (name, limit) in [
            ("submission_limit", self.submission_limit),
            ("login_limit", self.login_limit),
        ] {
            if limit.max_attempts == 0 || limit.window_secs == 0 {
                return Err(EngineError::Config(format!(
                    "{name} needs a non-zero max_attempts and window_secs"
                )));
            }
        }
        if self.max_viewer_sessions == 0 {
            return Err(EngineError::Config(
                "max_viewer_sessions must be non-zero".into(),
            ));
        }
        if self.recheck_interval_secs == 0 || self.fetch_timeout_secs == 0 {
            return Err(EngineError::Config(
                "fetch_timeout_secs and recheck_interval_secs must be non-zero".into(),
            ));
        }
        self.admin_keys().map(|_| ())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            recheck_interval_secs: default_recheck_interval_secs(),
            voting_enabled: default_true(),
            single_seat_kind: default_single_seat_kind(),
            multi_seat_kind: default_multi_seat_kind(),
            submission_limit: LimitConfig::default(),
            login_limit: LimitConfig::default(),
            admins: Vec::new(),
            qualifying_tiers: default_qualifying_tiers(),
            rpc_port: default_rpc_port(),
            websocket_port: default_ws_port(),
            max_viewer_sessions: default_max_viewer_sessions(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            election_file: default_election_file(),
        }
    }
}

/// The election file: ballot, candidate profiles and member directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionFile {
    pub year: u32,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    pub end_time: Timestamp,
    pub positions: Vec<Position>,
    #[serde(default)]
    pub candidates: Vec<Profile>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl ElectionFile {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let file: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        file.election()
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(file)
    }

    pub fn election(&self) -> Election {
        Election {
            year: self.year,
            start_time: self.start_time,
            end_time: self.end_time,
            positions: self.positions.clone(),
        }
    }

    pub fn directory(&self) -> StaticDirectory {
        StaticDirectory::from_entries(self.candidates.clone(), self.members.clone())
    }
}
