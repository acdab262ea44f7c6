//! Quadratic voting arithmetic.
//!
//! Voting power = floor(sqrt(credits)). Everything here is exact integer
//! arithmetic so results are reproducible and auditable.

use quadvote_types::{Credits, VotingPower};

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)), which always fits in a `u64`.
pub fn integer_sqrt(n: u128) -> u64 {
    if n <= 1 {
        return n as u64;
    }

    // ceil(n / 2) without the overflow of (n + 1) / 2
    let mut x = n;
    let mut y = (n >> 1) + (n & 1);

    // Iterates stay >= floor(sqrt(n)), so x + n / x cannot overflow.
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }

    x as u64
}

/// Voting power bought by committing `credits`.
pub fn voting_power(credits: Credits) -> VotingPower {
    VotingPower::new(integer_sqrt(credits.raw()))
}

/// Credits needed to buy exactly `power` (power squared).
///
/// `(2^64 - 1)^2 < 2^128`, so the product never overflows.
pub fn quadratic_cost(power: VotingPower) -> Credits {
    let p = power.raw() as u128;
    Credits::new(p * p)
}

/// Credits in `credits` beyond the last perfect square; they are spent but
/// buy no additional power.
pub fn excess_credits(credits: Credits) -> Credits {
    let cost = quadratic_cost(voting_power(credits));
    credits.checked_sub(cost).unwrap_or(Credits::ZERO)
}
