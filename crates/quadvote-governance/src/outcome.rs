//! Outcome resolution.
//!
//! The engine only tallies. Deciding what a tally means is left to a
//! [`TallyRule`] supplied by the host; [`SimpleMajority`] is the bundled rule
//! and assumes no quorum.

use serde::Serialize;

use crate::proposal::Tally;

/// Result of applying a rule to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalOutcome {
    /// Voting still open
    Pending,
    Passed,
    Rejected,
    Tied,
}

/// Turns a final tally into an outcome.
pub trait TallyRule {
    fn decide(&self, tally: &Tally) -> ProposalOutcome;
}

/// More yes power than no power passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleMajority;

impl TallyRule for SimpleMajority {
    fn decide(&self, tally: &Tally) -> ProposalOutcome {
        match tally.yes.cmp(&tally.no) {
            std::cmp::Ordering::Greater => ProposalOutcome::Passed,
            std::cmp::Ordering::Less => ProposalOutcome::Rejected,
            std::cmp::Ordering::Equal => ProposalOutcome::Tied,
        }
    }
}
