//! JSON request handling.
//!
//! Each input line is one JSON object tagged by `"method"`, with an optional
//! `"id"` echoed back in the response:
//!
//! ```text
//! {"id":1,"method":"cast_vote","caller":"qv1...","proposal_id":1,"credits":16,"support":true}
//! {"id":1,"ok":true,"result":{"proposal_id":1,"power":4,"credits":16,"excess_credits":0,"balance":84}}
//! ```

use quadvote_governance::voting::excess_credits;
use quadvote_governance::{
    GovernanceError, Proposal, ProposalOutcome, ProposalStatus, SimpleMajority, Tally,
    VoteSupport, VotingEngine,
};
use quadvote_types::{Address, Credits, Timestamp, VotingPower};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Mint {
        caller: Address,
        target: Address,
        amount: Credits,
    },
    BalanceOf {
        account: Address,
    },
    TotalSupply,
    CreateProposal {
        caller: Address,
        description: String,
        duration_minutes: u64,
    },
    ProposalStatus {
        proposal_id: u64,
    },
    ProposalExpiration {
        proposal_id: u64,
    },
    Proposal {
        proposal_id: u64,
    },
    ActiveProposals,
    CastVote {
        caller: Address,
        proposal_id: u64,
        credits: Credits,
        support: bool,
    },
    CountVotes {
        proposal_id: u64,
    },
    HasVoted {
        proposal_id: u64,
        voter: Address,
    },
    Outcome {
        proposal_id: u64,
    },
}

impl Request {
    /// Whether a successful call changes engine state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Request::Mint { .. } | Request::CreateProposal { .. } | Request::CastVote { .. }
        )
    }
}

/// Result payload of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Balance {
        balance: Credits,
    },
    Supply {
        total_supply: Credits,
    },
    Created {
        proposal_id: u64,
        expires_at: Timestamp,
    },
    Status {
        status: ProposalStatus,
        code: u8,
    },
    Expiration {
        expires_at: Timestamp,
    },
    Proposal(Box<Proposal>),
    Active {
        proposals: Vec<u64>,
    },
    Vote {
        proposal_id: u64,
        power: VotingPower,
        credits: Credits,
        excess_credits: Credits,
        balance: Credits,
    },
    Tally(Tally),
    HasVoted {
        has_voted: bool,
    },
    Outcome {
        outcome: ProposalOutcome,
    },
}

/// Why a line could not be answered.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Governance(#[from] GovernanceError),
}

/// One output line.
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub id: Value,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: Value, reply: Reply) -> Self {
        Self { id, ok: true, result: Some(reply), error: None }
    }

    pub fn failure(id: Value, error: &CommandError) -> Self {
        Self { id, ok: false, result: None, error: Some(error.to_string()) }
    }

    /// Serialize to a single JSON line.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"ok":false,"error":"Failed to encode response: {}"}}"#, e)
        })
    }
}

/// Fields shared by every request line.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Value,
    method: Option<String>,
}

#[derive(Deserialize)]
struct MintParams {
    caller: Address,
    target: Address,
    amount: Credits,
}

#[derive(Deserialize)]
struct AccountParams {
    account: Address,
}

#[derive(Deserialize)]
struct CreateParams {
    caller: Address,
    description: String,
    duration_minutes: u64,
}

#[derive(Deserialize)]
struct ProposalParams {
    proposal_id: u64,
}

#[derive(Deserialize)]
struct VoteParams {
    caller: Address,
    proposal_id: u64,
    credits: Credits,
    support: bool,
}

#[derive(Deserialize)]
struct HasVotedParams {
    proposal_id: u64,
    voter: Address,
}

/// Decode method parameters straight from the line. Going through a
/// buffered `Value` would cap numbers at 64 bits.
fn params<T: DeserializeOwned>(line: &str) -> Result<T, CommandError> {
    serde_json::from_str(line).map_err(|e| CommandError::Malformed(e.to_string()))
}

fn decode(method: &str, line: &str) -> Result<Request, CommandError> {
    let request = match method {
        "mint" => {
            let MintParams { caller, target, amount } = params(line)?;
            Request::Mint { caller, target, amount }
        }
        "balance_of" => {
            let AccountParams { account } = params(line)?;
            Request::BalanceOf { account }
        }
        "total_supply" => Request::TotalSupply,
        "create_proposal" => {
            let CreateParams { caller, description, duration_minutes } = params(line)?;
            Request::CreateProposal { caller, description, duration_minutes }
        }
        "proposal_status" => Request::ProposalStatus {
            proposal_id: params::<ProposalParams>(line)?.proposal_id,
        },
        "proposal_expiration" => Request::ProposalExpiration {
            proposal_id: params::<ProposalParams>(line)?.proposal_id,
        },
        "proposal" => Request::Proposal {
            proposal_id: params::<ProposalParams>(line)?.proposal_id,
        },
        "active_proposals" => Request::ActiveProposals,
        "cast_vote" => {
            let VoteParams { caller, proposal_id, credits, support } = params(line)?;
            Request::CastVote { caller, proposal_id, credits, support }
        }
        "count_votes" => Request::CountVotes {
            proposal_id: params::<ProposalParams>(line)?.proposal_id,
        },
        "has_voted" => {
            let HasVotedParams { proposal_id, voter } = params(line)?;
            Request::HasVoted { proposal_id, voter }
        }
        "outcome" => Request::Outcome {
            proposal_id: params::<ProposalParams>(line)?.proposal_id,
        },
        other => return Err(CommandError::Malformed(format!("unknown method `{}`", other))),
    };
    Ok(request)
}

/// Split a raw line into its request ID and the request itself.
pub fn parse_line(line: &str) -> (Value, Result<Request, CommandError>) {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(e) => return (Value::Null, Err(CommandError::Malformed(e.to_string()))),
    };
    let request = match envelope.method {
        Some(method) => decode(&method, line),
        None => Err(CommandError::Malformed("missing field `method`".to_string())),
    };
    (envelope.id, request)
}

/// Run one request against the engine.
pub fn execute(engine: &VotingEngine, request: Request) -> Result<Reply, GovernanceError> {
    let reply = match request {
        Request::Mint { caller, target, amount } => Reply::Balance {
            balance: engine.mint(caller, target, amount)?,
        },
        Request::BalanceOf { account } => Reply::Balance {
            balance: engine.balance_of(&account),
        },
        Request::TotalSupply => Reply::Supply {
            total_supply: engine.total_supply(),
        },
        Request::CreateProposal { caller, description, duration_minutes } => {
            let proposal_id = engine.create_proposal(caller, description, duration_minutes)?;
            Reply::Created {
                proposal_id,
                expires_at: engine.get_proposal_expiration_time(proposal_id)?,
            }
        }
        Request::ProposalStatus { proposal_id } => {
            let status = engine.get_proposal_status(proposal_id)?;
            Reply::Status { status, code: status.code() }
        }
        Request::ProposalExpiration { proposal_id } => Reply::Expiration {
            expires_at: engine.get_proposal_expiration_time(proposal_id)?,
        },
        Request::Proposal { proposal_id } => Reply::Proposal(Box::new(engine.proposal(proposal_id)?)),
        Request::ActiveProposals => Reply::Active {
            proposals: engine.active_proposals(),
        },
        Request::CastVote { caller, proposal_id, credits, support } => {
            let record = engine.cast_vote(caller, proposal_id, credits, VoteSupport::from(support))?;
            Reply::Vote {
                proposal_id,
                power: record.power,
                credits: record.credits,
                excess_credits: excess_credits(record.credits),
                balance: engine.balance_of(&caller),
            }
        }
        Request::CountVotes { proposal_id } => Reply::Tally(engine.count_votes(proposal_id)?),
        Request::HasVoted { proposal_id, voter } => Reply::HasVoted {
            has_voted: engine.has_voted(proposal_id, &voter)?,
        },
        Request::Outcome { proposal_id } => Reply::Outcome {
            outcome: engine.outcome(proposal_id, &SimpleMajority)?,
        },
    };
    Ok(reply)
}

/// Parse, execute and answer one input line. The flag is true when the call
/// changed engine state.
pub fn handle_line(engine: &VotingEngine, line: &str) -> (Response, bool) {
    let (id, request) = parse_line(line);
    let request = match request {
        Ok(request) => request,
        Err(e) => return (Response::failure(id, &e), false),
    };

    let mutating = request.is_mutating();
    match execute(engine, request) {
        Ok(reply) => (Response::success(id, reply), mutating),
        Err(e) => (Response::failure(id, &CommandError::from(e)), false),
    }
}
