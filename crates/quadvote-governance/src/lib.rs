//! Quadvote Governance - Quadratic voting over a credit ledger.
//!
//! This crate provides:
//! - Proposal lifecycle with time-derived closure
//! - Quadratic vote casting: power = floor(sqrt(credits))
//! - Vote tallying and an extension point for outcome rules
//! - Vote and proposal notifications for external observers
//! - Full-state snapshots

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod outcome;
pub mod proposal;
pub mod snapshot;
pub mod voting;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::VotingEngine;
pub use error::GovernanceError;
pub use events::{ChannelObserver, EventObserver, GovernanceEvent};
pub use outcome::{ProposalOutcome, SimpleMajority, TallyRule};
pub use proposal::{Proposal, ProposalStatus, Tally, VoteRecord, VoteSupport};
pub use snapshot::GovernanceSnapshot;
pub use voting::{integer_sqrt, voting_power};
