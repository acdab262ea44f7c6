//! Full-state snapshots of the voting engine.
//!
//! A snapshot is plain JSON. On disk it lives at `<dir>/state.json` and is
//! replaced atomically (write to a temp file, then rename).

use std::fs;
use std::path::{Path, PathBuf};

use quadvote_ledger::CreditLedger;
use quadvote_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::proposal::ProposalRegistry;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const STATE_FILE: &str = "state.json";

/// Everything needed to rebuild a [`crate::VotingEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub version: u32,
    pub owner: Address,
    pub ledger: CreditLedger,
    pub proposals: ProposalRegistry,
}

impl GovernanceSnapshot {
    /// Reject snapshots that could not have been produced by the engine.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(GovernanceError::Snapshot(format!(
                "unsupported version {}, expected {}",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.ledger.owner() != self.owner {
            return Err(GovernanceError::Snapshot(
                "ledger owner does not match engine owner".to_string(),
            ));
        }
        if !self.ledger.is_consistent() {
            return Err(GovernanceError::Snapshot(
                "total supply does not match balances".to_string(),
            ));
        }
        if !self.proposals.is_consistent() {
            return Err(GovernanceError::Snapshot(
                "proposal tallies do not match vote records".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, GovernanceError> {
        serde_json::to_string_pretty(self).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, GovernanceError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Path of the state file inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(STATE_FILE)
    }

    /// Write the snapshot to `<dir>/state.json`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, GovernanceError> {
        fs::create_dir_all(dir).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;

        let json = self.to_json()?;
        let file = Self::path_in(dir);
        let tmp = dir.join(format!("{}.tmp", STATE_FILE));
        fs::write(&tmp, json).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        fs::rename(&tmp, &file).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;

        tracing::debug!("State persisted to {:?}", file);
        Ok(file)
    }

    /// Read `<dir>/state.json`, or `None` if it does not exist.
    pub fn load(dir: &Path) -> Result<Option<Self>, GovernanceError> {
        let file = Self::path_in(dir);
        if !file.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&file).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        Self::from_json(&json).map(Some)
    }
}
