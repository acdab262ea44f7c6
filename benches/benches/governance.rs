use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quadvote_governance::{integer_sqrt, ManualClock, VoteSupport, VotingEngine};
use quadvote_types::{Address, Credits};

const VOTERS: u64 = 256;

fn bench_integer_sqrt(c: &mut Criterion) {
    let mut group = c.benchmark_group("integer_sqrt");
    group.bench_function("small", |b| b.iter(|| black_box(integer_sqrt(black_box(1_000_000)))));
    group.bench_function("u128_max", |b| b.iter(|| black_box(integer_sqrt(black_box(u128::MAX)))));
    group.finish();
}

fn setup() -> (VotingEngine, Vec<Address>, u64) {
    let owner = Address::from_bytes([0xaa; 20]);
    let engine = VotingEngine::new(owner, Arc::new(ManualClock::new(1_000)));
    let voters: Vec<Address> = (0..VOTERS)
        .map(|i| Address::from_seed(&i.to_le_bytes()))
        .collect();
    for voter in &voters {
        let _ = engine.mint(owner, *voter, Credits::new(10_000));
    }
    let proposal = engine.create_proposal(owner, "bench", 60).unwrap_or_default();
    (engine, voters, proposal)
}

fn bench_cast_vote(c: &mut Criterion) {
    let mut group = c.benchmark_group("cast_vote");

    group.bench_function("single", |b| {
        b.iter_batched(
            setup,
            |(engine, voters, proposal)| {
                black_box(engine.cast_vote(voters[0], proposal, Credits::new(100), VoteSupport::For))
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("all_voters", |b| {
        b.iter_batched(
            setup,
            |(engine, voters, proposal)| {
                for (i, voter) in voters.iter().enumerate() {
                    let support = VoteSupport::from(i % 2 == 0);
                    let _ = black_box(engine.cast_vote(*voter, proposal, Credits::new(100), support));
                }
                black_box(engine.count_votes(proposal))
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_integer_sqrt, bench_cast_vote);
criterion_main!(benches);
