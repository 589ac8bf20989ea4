//! Profile persistence
//!
//! Only three things outlive a session: the high score, the best combo ever
//! reached, and the set of unlocked upgrade keys. Everything else is
//! rebuilt when a run starts.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Data carried between sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub high_score: u32,
    /// Best combo ever reached
    #[serde(default)]
    pub max_combo: u32,
    /// Unlocked upgrade keys (sorted for stable output)
    #[serde(default)]
    pub upgrades: BTreeSet<String>,
}

impl Profile {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a profile from disk; a missing file is a fresh profile
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No profile at {}, starting fresh", path.display());
            return Ok(Self::default());
        }
        let profile = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!(
            "Loaded profile (high score {}, {} upgrades)",
            profile.high_score,
            profile.upgrades.len()
        );
        Ok(profile)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Profile saved to {}", path.as_ref().display());
        Ok(())
    }
}
