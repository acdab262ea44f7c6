//! End-to-end scenarios for the voting engine.

use std::sync::Arc;
use std::thread;

use quadvote_governance::{
    ChannelObserver, GovernanceError, GovernanceEvent, ManualClock, ProposalStatus, Tally,
    VoteSupport, VotingEngine,
};
use quadvote_types::{Address, Credits, Timestamp, VotingPower};

const T: u64 = 1_559_295_500;

fn owner() -> Address {
    Address::from_seed(b"owner")
}

fn voter(name: &str) -> Address {
    Address::from_seed(name.as_bytes())
}

fn setup() -> (Arc<VotingEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T));
    let engine = Arc::new(VotingEngine::new(owner(), clock.clone()));
    (engine, clock)
}

#[test]
fn test_mint_vote_and_double_vote() {
    let (engine, _) = setup();
    let b = voter("b");

    engine.mint(owner(), b, Credits::new(100)).unwrap();
    let p = engine.create_proposal(owner(), "proposal description", 10).unwrap();

    engine.cast_vote(b, p, Credits::new(16), VoteSupport::from(true)).unwrap();
    assert_eq!(engine.balance_of(&b), Credits::new(84));
    assert_eq!(
        engine.count_votes(p).unwrap(),
        Tally { yes: VotingPower::new(4), no: VotingPower::ZERO }
    );

    assert_eq!(
        engine.cast_vote(b, p, Credits::new(16), VoteSupport::from(true)),
        Err(GovernanceError::AlreadyVoted)
    );
}

#[test]
fn test_expiration_boundary() {
    let (engine, clock) = setup();
    let p = engine.create_proposal(owner(), "x", 1).unwrap();

    assert_eq!(engine.get_proposal_expiration_time(p).unwrap(), Timestamp::new(T + 60));

    for t in [T, T + 1, T + 30, T + 59] {
        clock.set(t);
        assert_eq!(engine.get_proposal_status(p).unwrap(), ProposalStatus::Active);
    }
    for t in [T + 60, T + 61, T + 86_400] {
        clock.set(t);
        assert_eq!(engine.get_proposal_status(p).unwrap(), ProposalStatus::Closed);
    }
}

#[test]
fn test_over_budget_vote() {
    let (engine, _) = setup();
    let a = voter("a");
    engine.mint(owner(), a, Credits::new(76)).unwrap();
    let p = engine.create_proposal(owner(), "p", 10).unwrap();

    let err = engine.cast_vote(a, p, Credits::new(77), VoteSupport::Against).unwrap_err();
    assert!(matches!(err, GovernanceError::InsufficientBalance { .. }));
    assert_eq!(engine.balance_of(&a), Credits::new(76));
    assert_eq!(engine.count_votes(p).unwrap(), Tally::default());

    // The failed attempt did not use up the vote
    engine.cast_vote(a, p, Credits::new(76), VoteSupport::Against).unwrap();
    assert_eq!(engine.count_votes(p).unwrap().no, VotingPower::new(8));
}

#[test]
fn test_closed_even_for_new_voter() {
    let (engine, clock) = setup();
    let a = voter("a");
    engine.mint(owner(), a, Credits::new(100)).unwrap();
    let p = engine.create_proposal(owner(), "p", 2).unwrap();

    clock.advance(120);
    assert_eq!(
        engine.cast_vote(a, p, Credits::new(1), VoteSupport::For),
        Err(GovernanceError::ProposalClosed(p))
    );
    assert_eq!(engine.balance_of(&a), Credits::new(100));
}

#[test]
fn test_credits_spent_across_proposals() {
    let (engine, _) = setup();
    let a = voter("a");
    engine.mint(owner(), a, Credits::new(50)).unwrap();
    let p1 = engine.create_proposal(owner(), "one", 10).unwrap();
    let p2 = engine.create_proposal(owner(), "two", 10).unwrap();

    engine.cast_vote(a, p1, Credits::new(49), VoteSupport::For).unwrap();
    assert_eq!(
        engine.cast_vote(a, p2, Credits::new(2), VoteSupport::For),
        Err(GovernanceError::InsufficientBalance {
            required: Credits::new(2),
            available: Credits::new(1),
        })
    );
    engine.cast_vote(a, p2, Credits::new(1), VoteSupport::For).unwrap();

    assert_eq!(engine.balance_of(&a), Credits::ZERO);
    assert_eq!(engine.count_votes(p1).unwrap().yes, VotingPower::new(7));
    assert_eq!(engine.count_votes(p2).unwrap().yes, VotingPower::new(1));
}

#[test]
fn test_concurrent_votes_same_voter_only_one_wins() {
    let (engine, _) = setup();
    let a = voter("a");
    engine.mint(owner(), a, Credits::new(1_000)).unwrap();
    let p = engine.create_proposal(owner(), "p", 10).unwrap();

    let successes: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let engine = Arc::clone(&engine);
                s.spawn(move || engine.cast_vote(a, p, Credits::new(25), VoteSupport::For).is_ok())
            })
            .collect();
        handles.into_iter().filter_map(|h| h.join().ok()).filter(|ok| *ok).count()
    });

    assert_eq!(successes, 1);
    assert_eq!(engine.balance_of(&a), Credits::new(975));
    assert_eq!(engine.count_votes(p).unwrap().yes, VotingPower::new(5));
}

#[test]
fn test_concurrent_votes_cannot_overspend() {
    let (engine, _) = setup();
    let a = voter("a");
    engine.mint(owner(), a, Credits::new(100)).unwrap();
    let proposals: Vec<u64> = (0..8)
        .map(|i| engine.create_proposal(owner(), format!("p{}", i), 10).unwrap())
        .collect();

    // Each vote costs 30, so at most three can be paid for.
    let successes: usize = thread::scope(|s| {
        let handles: Vec<_> = proposals
            .iter()
            .map(|&p| {
                let engine = Arc::clone(&engine);
                s.spawn(move || engine.cast_vote(a, p, Credits::new(30), VoteSupport::For).is_ok())
            })
            .collect();
        handles.into_iter().filter_map(|h| h.join().ok()).filter(|ok| *ok).count()
    });

    assert_eq!(successes, 3);
    assert_eq!(engine.balance_of(&a), Credits::new(10));
}

#[test]
fn test_many_voters_tally() {
    let (engine, _) = setup();
    let (observer, mut rx) = ChannelObserver::channel();
    engine.subscribe(Arc::new(observer));
    let p = engine.create_proposal(owner(), "p", 10).unwrap();

    let mut expected = Tally::default();
    for i in 1u64..=20 {
        let v = voter(&format!("voter-{}", i));
        let credits = Credits::from(i * i + i);
        engine.mint(owner(), v, credits).unwrap();

        let support = VoteSupport::from(i % 3 != 0);
        engine.cast_vote(v, p, credits, support).unwrap();
        // floor(sqrt(i^2 + i)) == i
        expected = expected.checked_add(support, VotingPower::new(i)).unwrap();
    }
    assert_eq!(engine.count_votes(p).unwrap(), expected);

    let votes = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|e| matches!(e, GovernanceEvent::VoteCast { .. }))
        .count();
    assert_eq!(votes, 20);
}
