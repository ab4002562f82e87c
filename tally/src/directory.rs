//! Candidate profiles and membership tiers.
//!
//! The association's member directory is an external collaborator; the
//! engine only ever reads from it, by public key.

use agora_types::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display data for a directory entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub pubkey: PublicKey,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A member and their association tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub pubkey: PublicKey,
    pub tier: String,
}

/// Read-only lookups by public key. An unknown key is valid and yields `None`.
pub trait Directory: Send + Sync {
    fn profile(&self, pubkey: &PublicKey) -> Option<Profile>;

    /// The member's association tier, if they are a member at all.
    fn tier(&self, pubkey: &PublicKey) -> Option<String>;
}

/// A directory held in memory, typically loaded from the election file.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    profiles: HashMap<PublicKey, Profile>,
    tiers: HashMap<PublicKey, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(
        profiles: impl IntoIterator<Item = Profile>,
        members: impl IntoIterator<Item = Member>,
    ) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.pubkey, p)).collect(),
            tiers: members.into_iter().map(|m| (m.pubkey, m.tier)).collect(),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.insert(profile.pubkey, profile);
        self
    }

    pub fn with_member(mut self, pubkey: PublicKey, tier: impl Into<String>) -> Self {
        self.tiers.insert(pubkey, tier.into());
        self
    }

    pub fn member_count(&self) -> usize {
        self.tiers.len()
    }
}

impl Directory for StaticDirectory {
    fn profile(&self, pubkey: &PublicKey) -> Option<Profile> {
        self.profiles.get(pubkey).cloned()
    }

    fn tier(&self, pubkey: &PublicKey) -> Option<String> {
        self.tiers.get(pubkey).cloned()
    }
}
