//! Proposal lifecycle management.
//!
//! A proposal is Active from creation until its expiration time and Closed
//! from then on. Closure is never stored: it is derived from the current time
//! on every query, so no scheduler is needed to close proposals.

use std::collections::BTreeMap;

use quadvote_types::{Address, Credits, Timestamp, VotingPower};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::voting::voting_power;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Voting is open
    Active,
    /// Expiration time reached
    Closed,
}

impl ProposalStatus {
    /// Numeric status code (Active = 0, Closed = 1).
    pub fn code(&self) -> u8 {
        match self {
            ProposalStatus::Active => 0,
            ProposalStatus::Closed => 1,
        }
    }

    /// Check if voting is still possible.
    pub fn can_vote(&self) -> bool {
        matches!(self, ProposalStatus::Active)
    }
}

/// Vote support options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteSupport {
    /// Vote in favor
    For,
    /// Vote against
    Against,
}

impl From<bool> for VoteSupport {
    fn from(support: bool) -> Self {
        if support {
            VoteSupport::For
        } else {
            VoteSupport::Against
        }
    }
}

impl VoteSupport {
    pub fn is_for(&self) -> bool {
        matches!(self, VoteSupport::For)
    }
}

/// Accumulated voting power on each side of a proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: VotingPower,
    pub no: VotingPower,
}

impl Tally {
    /// Add `power` to the side chosen by `support`.
    pub fn checked_add(&self, support: VoteSupport, power: VotingPower) -> Option<Tally> {
        let mut next = *self;
        match support {
            VoteSupport::For => next.yes = self.yes.checked_add(power)?,
            VoteSupport::Against => next.no = self.no.checked_add(power)?,
        }
        Some(next)
    }

    /// Total power on both sides.
    pub fn total(&self) -> Option<VotingPower> {
        self.yes.checked_add(self.no)
    }
}

/// An immutable record of one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub proposal_id: u64,
    pub voter: Address,
    /// Credits debited from the voter
    pub credits: Credits,
    /// floor(sqrt(credits))
    pub power: VotingPower,
    pub support: VoteSupport,
    pub cast_at: Timestamp,
}

/// A vote that passed every proposal-side check and is waiting for the
/// ledger debit before it can be committed.
#[derive(Debug, Clone)]
pub struct PendingVote {
    record: VoteRecord,
    tally: Tally,
}

impl PendingVote {
    pub fn record(&self) -> &VoteRecord {
        &self.record
    }
}

/// A time-bounded decision item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential ID, starting at 1
    pub id: u64,
    /// Owner account that created the proposal
    pub creator: Address,
    pub description: String,
    pub created_at: Timestamp,
    /// created_at + duration_minutes * 60
    pub expires_at: Timestamp,
    tally: Tally,
    votes: BTreeMap<Address, VoteRecord>,
}

impl Proposal {
    /// Create a new proposal open for `duration_minutes` from `now`.
    pub fn new(
        id: u64,
        creator: Address,
        description: String,
        now: Timestamp,
        duration_minutes: u64,
    ) -> Result<Self, GovernanceError> {
        if duration_minutes == 0 {
            return Err(GovernanceError::InvalidDuration(duration_minutes));
        }
        let expires_at = now
            .checked_add_minutes(duration_minutes)
            .ok_or(GovernanceError::InvalidDuration(duration_minutes))?;

        Ok(Self {
            id,
            creator,
            description,
            created_at: now,
            expires_at,
            tally: Tally::default(),
            votes: BTreeMap::new(),
        })
    }

    /// Status as observed at `now`.
    pub fn status(&self, now: Timestamp) -> ProposalStatus {
        if self.expires_at.has_passed(now) {
            ProposalStatus::Closed
        } else {
            ProposalStatus::Active
        }
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Check if voter has voted.
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn vote_of(&self, voter: &Address) -> Option<&VoteRecord> {
        self.votes.get(voter)
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn votes(&self) -> impl Iterator<Item = &VoteRecord> {
        self.votes.values()
    }

    /// Validate a vote without changing anything.
    ///
    /// Checks run in a fixed order: closed, duplicate, zero credits, tally
    /// overflow. The caller is expected to debit the voter and then pass the
    /// result to [`Proposal::commit_vote`].
    pub fn prepare_vote(
        &self,
        voter: Address,
        credits: Credits,
        support: VoteSupport,
        now: Timestamp,
    ) -> Result<PendingVote, GovernanceError> {
        if !self.status(now).can_vote() {
            return Err(GovernanceError::ProposalClosed(self.id));
        }

        if self.has_voted(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        if credits.is_zero() {
            return Err(GovernanceError::InvalidCredits);
        }

        let power = voting_power(credits);
        let tally = self.tally.checked_add(support, power).ok_or_else(|| {
            GovernanceError::Overflow(format!("tally of proposal {}", self.id))
        })?;

        Ok(PendingVote {
            record: VoteRecord {
                proposal_id: self.id,
                voter,
                credits,
                power,
                support,
                cast_at: now,
            },
            tally,
        })
    }

    /// Apply a vote produced by [`Proposal::prepare_vote`]. Infallible.
    pub fn commit_vote(&mut self, pending: PendingVote) -> VoteRecord {
        let record = pending.record;
        self.tally = pending.tally;
        self.votes.insert(record.voter, record.clone());
        record
    }

    /// Recompute the tally from the vote records.
    pub fn recount(&self) -> Option<Tally> {
        self.votes
            .values()
            .try_fold(Tally::default(), |t, v| t.checked_add(v.support, v.power))
    }
}

/// Proposal registry managing all proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<u64, Proposal>,
    next_id: u64,
}

impl ProposalRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a new proposal and return its ID.
    pub fn create_proposal(
        &mut self,
        creator: Address,
        description: String,
        now: Timestamp,
        duration_minutes: u64,
    ) -> Result<u64, GovernanceError> {
        let id = self.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| GovernanceError::Overflow("proposal id".to_string()))?;

        let proposal = Proposal::new(id, creator, description, now, duration_minutes)?;

        self.proposals.insert(id, proposal);
        self.next_id = next_id;
        Ok(id)
    }

    /// Get a proposal.
    pub fn get(&self, id: u64) -> Result<&Proposal, GovernanceError> {
        self.proposals.get(&id).ok_or(GovernanceError::NotFound(id))
    }

    /// Get a proposal mutably.
    pub fn get_mut(&mut self, id: u64) -> Result<&mut Proposal, GovernanceError> {
        self.proposals.get_mut(&id).ok_or(GovernanceError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// ID the next proposal will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Proposals still open at `now`, in ID order.
    pub fn active(&self, now: Timestamp) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|p| p.status(now).can_vote())
            .collect()
    }

    /// Structural checks used when loading a registry from outside.
    pub fn is_consistent(&self) -> bool {
        self.proposals.iter().all(|(id, p)| {
            *id == p.id
                && *id < self.next_id
                && p.votes.iter().all(|(voter, v)| {
                    *voter == v.voter
                        && v.proposal_id == p.id
                        && v.power == voting_power(v.credits)
                })
                && p.recount() == Some(p.tally)
        })
    }
}

impl Default for ProposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}
