//! The voting engine: proposals, quadratic vote casting and tallying on top
//! of the credit ledger.
//!
//! All state lives behind a single `RwLock`. Mutations (`mint`,
//! `create_proposal`, `cast_vote`) hold the write lock from first check to
//! last write, which makes each of them one indivisible step. Queries share
//! the read lock and never observe a half-applied mutation.

use std::sync::Arc;

use parking_lot::RwLock;
use quadvote_ledger::CreditLedger;
use quadvote_types::{Address, Credits, Timestamp};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::GovernanceError;
use crate::events::{EventBus, EventObserver, GovernanceEvent};
use crate::outcome::{ProposalOutcome, TallyRule};
use crate::proposal::{Proposal, ProposalRegistry, ProposalStatus, Tally, VoteRecord, VoteSupport};
use crate::snapshot::{GovernanceSnapshot, SNAPSHOT_VERSION};

#[derive(Debug)]
struct EngineState {
    ledger: CreditLedger,
    proposals: ProposalRegistry,
}

/// Quadratic voting engine.
///
/// Shareable across threads behind an `Arc`.
pub struct VotingEngine {
    owner: Address,
    state: RwLock<EngineState>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl VotingEngine {
    /// Create an empty engine. `owner` is the only account allowed to mint
    /// credits and create proposals.
    pub fn new(owner: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            owner,
            state: RwLock::new(EngineState {
                ledger: CreditLedger::new(owner),
                proposals: ProposalRegistry::new(),
            }),
            clock,
            events: EventBus::default(),
        }
    }

    /// Create an empty engine that reads the wall clock.
    pub fn with_system_clock(owner: Address) -> Self {
        Self::new(owner, Arc::new(SystemClock))
    }

    /// Rebuild an engine from a snapshot.
    pub fn from_snapshot(
        snapshot: GovernanceSnapshot,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GovernanceError> {
        snapshot.validate()?;
        info!(
            owner = %snapshot.owner,
            proposals = snapshot.proposals.len(),
            accounts = snapshot.ledger.account_count(),
            "Restoring governance state"
        );
        Ok(Self {
            owner: snapshot.owner,
            state: RwLock::new(EngineState {
                ledger: snapshot.ledger,
                proposals: snapshot.proposals,
            }),
            clock,
            events: EventBus::default(),
        })
    }

    /// Capture the full state.
    pub fn snapshot(&self) -> GovernanceSnapshot {
        let state = self.state.read();
        GovernanceSnapshot {
            version: SNAPSHOT_VERSION,
            owner: self.owner,
            ledger: state.ledger.clone(),
            proposals: state.proposals.clone(),
        }
    }

    /// Register an observer for proposal and vote events.
    pub fn subscribe(&self, observer: Arc<dyn EventObserver>) {
        self.events.subscribe(observer);
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), GovernanceError> {
        if caller != self.owner {
            warn!(caller = %caller, "Rejected privileged call from non-owner");
            return Err(GovernanceError::Unauthorized(caller));
        }
        Ok(())
    }

    // ----- Credit ledger -----

    /// Mint `amount` credits to `target`. Owner only. Returns the new balance.
    pub fn mint(
        &self,
        caller: Address,
        target: Address,
        amount: Credits,
    ) -> Result<Credits, GovernanceError> {
        let mut state = self.state.write();
        Ok(state.ledger.mint(caller, target, amount)?)
    }

    pub fn balance_of(&self, account: &Address) -> Credits {
        self.state.read().ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> Credits {
        self.state.read().ledger.total_supply()
    }

    // ----- Proposals -----

    /// Open a proposal for `duration_minutes`. Owner only. Returns its ID.
    pub fn create_proposal(
        &self,
        caller: Address,
        description: impl Into<String>,
        duration_minutes: u64,
    ) -> Result<u64, GovernanceError> {
        self.ensure_owner(caller)?;

        let mut state = self.state.write();
        let now = self.clock.now();
        let id = state
            .proposals
            .create_proposal(caller, description.into(), now, duration_minutes)?;
        let expires_at = state.proposals.get(id)?.expires_at;

        info!(proposal_id = id, %expires_at, "Proposal created");
        self.events.emit(GovernanceEvent::ProposalCreated {
            proposal_id: id,
            creator: caller,
            expires_at,
        });
        Ok(id)
    }

    pub fn get_proposal_status(&self, proposal_id: u64) -> Result<ProposalStatus, GovernanceError> {
        let state = self.state.read();
        let now = self.clock.now();
        Ok(state.proposals.get(proposal_id)?.status(now))
    }

    pub fn get_proposal_expiration_time(&self, proposal_id: u64) -> Result<Timestamp, GovernanceError> {
        Ok(self.state.read().proposals.get(proposal_id)?.expires_at)
    }

    /// A copy of the proposal, including its vote records.
    pub fn proposal(&self, proposal_id: u64) -> Result<Proposal, GovernanceError> {
        Ok(self.state.read().proposals.get(proposal_id)?.clone())
    }

    pub fn proposal_count(&self) -> usize {
        self.state.read().proposals.len()
    }

    /// IDs of proposals still open for voting.
    pub fn active_proposals(&self) -> Vec<u64> {
        let state = self.state.read();
        let now = self.clock.now();
        state.proposals.active(now).into_iter().map(|p| p.id).collect()
    }

    // ----- Voting -----

    /// Commit `credits` from `caller` to a vote on `proposal_id`.
    ///
    /// Voting power is floor(sqrt(credits)); the full `credits` amount is
    /// debited. Fails, without changing anything, with `NotFound`,
    /// `ProposalClosed`, `AlreadyVoted`, `InvalidCredits`, `Overflow` or
    /// `InsufficientBalance`, checked in that order.
    pub fn cast_vote(
        &self,
        caller: Address,
        proposal_id: u64,
        credits: Credits,
        support: VoteSupport,
    ) -> Result<VoteRecord, GovernanceError> {
        let mut guard = self.state.write();
        let now = self.clock.now();
        let EngineState { ledger, proposals } = &mut *guard;

        let proposal = proposals.get_mut(proposal_id)?;
        let pending = proposal.prepare_vote(caller, credits, support, now)?;
        ledger.debit(caller, credits)?;
        let record = proposal.commit_vote(pending);

        info!(
            proposal_id,
            voter = %caller,
            support = ?support,
            credits = credits.raw(),
            power = record.power.raw(),
            "Vote cast"
        );
        self.events.emit(GovernanceEvent::VoteCast {
            proposal_id,
            voter: caller,
            support,
            power: record.power,
            credits,
        });
        Ok(record)
    }

    /// Current (yes, no) voting power.
    pub fn count_votes(&self, proposal_id: u64) -> Result<Tally, GovernanceError> {
        Ok(self.state.read().proposals.get(proposal_id)?.tally())
    }

    pub fn has_voted(&self, proposal_id: u64, voter: &Address) -> Result<bool, GovernanceError> {
        Ok(self.state.read().proposals.get(proposal_id)?.has_voted(voter))
    }

    pub fn vote_record(
        &self,
        proposal_id: u64,
        voter: &Address,
    ) -> Result<Option<VoteRecord>, GovernanceError> {
        Ok(self
            .state
            .read()
            .proposals
            .get(proposal_id)?
            .vote_of(voter)
            .cloned())
    }

    /// Apply `rule` to a closed proposal; `Pending` while it is still active.
    pub fn outcome(
        &self,
        proposal_id: u64,
        rule: &dyn TallyRule,
    ) -> Result<ProposalOutcome, GovernanceError> {
        let state = self.state.read();
        let now = self.clock.now();
        let proposal = state.proposals.get(proposal_id)?;

        let outcome = match proposal.status(now) {
            ProposalStatus::Active => ProposalOutcome::Pending,
            ProposalStatus::Closed => rule.decide(&proposal.tally()),
        };
        debug!(proposal_id, outcome = ?outcome, "Outcome evaluated");
        Ok(outcome)
    }
}

impl std::fmt::Debug for VotingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VotingEngine")
            .field("owner", &self.owner)
            .field("state", &*self.state.read())
            .field("events", &self.events)
            .finish()
    }
}
