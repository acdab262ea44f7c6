//! Credit balances keyed by account.

use std::collections::BTreeMap;

use quadvote_types::{Address, Credits};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LedgerError;

/// Per-account credit balances.
///
/// Accounts are created implicitly: an address that was never minted to has a
/// balance of zero and no entry in the map. Every mutation validates first and
/// writes second, so a failed call leaves the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedger {
    owner: Address,
    balances: BTreeMap<Address, Credits>,
    total_supply: Credits,
}

impl CreditLedger {
    /// Create an empty ledger whose minting is gated on `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            balances: BTreeMap::new(),
            total_supply: Credits::ZERO,
        }
    }

    /// The only account allowed to mint.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Credit `amount` to `target`. Returns the new balance.
    pub fn mint(
        &mut self,
        caller: Address,
        target: Address,
        amount: Credits,
    ) -> Result<Credits, LedgerError> {
        if caller != self.owner {
            warn!(caller = %caller, "Rejected mint from non-owner");
            return Err(LedgerError::Unauthorized { caller });
        }

        let balance = self
            .balance_of(&target)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { account: target })?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { account: target })?;

        self.balances.insert(target, balance);
        self.total_supply = supply;

        info!(account = %target, amount = amount.raw(), balance = balance.raw(), "Minted credits");
        Ok(balance)
    }

    /// Current balance of `account`; zero for accounts never seen.
    pub fn balance_of(&self, account: &Address) -> Credits {
        self.balances.get(account).copied().unwrap_or(Credits::ZERO)
    }

    /// Check that `account` could pay `amount` without changing anything.
    pub fn can_debit(&self, account: &Address, amount: Credits) -> Result<(), LedgerError> {
        let available = self.balance_of(account);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Remove `amount` from `account`. Returns the new balance.
    ///
    /// Callers hold `&mut self` for the whole check-and-write, so two debits on
    /// the same account can never both pass the balance check.
    pub fn debit(&mut self, account: Address, amount: Credits) -> Result<Credits, LedgerError> {
        self.can_debit(&account, amount)?;

        let available = self.balance_of(&account);
        let balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available,
            })?;
        let supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: self.total_supply,
            })?;

        self.balances.insert(account, balance);
        self.total_supply = supply;

        debug!(account = %account, amount = amount.raw(), balance = balance.raw(), "Debited credits");
        Ok(balance)
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Credits {
        self.total_supply
    }

    /// Number of accounts that have ever been minted to.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate over every known account and its balance.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Credits)> {
        self.balances.iter()
    }

    /// Whether the recorded total supply matches the sum of balances.
    ///
    /// Always true for a ledger built through `mint`/`debit`; used to reject
    /// tampered snapshots.
    pub fn is_consistent(&self) -> bool {
        self.balances
            .values()
            .try_fold(Credits::ZERO, |acc, b| acc.checked_add(*b))
            .map_or(false, |sum| sum == self.total_supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn account(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_unknown_account_has_zero_balance() {
        let ledger = CreditLedger::new(owner());
        assert_eq!(ledger.balance_of(&owner()), Credits::ZERO);
        assert_eq!(ledger.balance_of(&account(1)), Credits::ZERO);
        assert_eq!(ledger.account_count(), 0);
    }

    #[test]
    fn test_owner_can_mint() {
        let mut ledger = CreditLedger::new(owner());

        let balance = ledger.mint(owner(), account(1), Credits::new(100)).unwrap();
        assert_eq!(balance, Credits::new(100));
        assert_eq!(ledger.balance_of(&account(1)), Credits::new(100));
        assert_eq!(ledger.total_supply(), Credits::new(100));

        // Mints accumulate
        ledger.mint(owner(), account(1), Credits::new(5)).unwrap();
        assert_eq!(ledger.balance_of(&account(1)), Credits::new(105));
    }

    #[test]
    fn test_non_owner_cannot_mint() {
        let mut ledger = CreditLedger::new(owner());

        let result = ledger.mint(account(1), account(1), Credits::new(100));
        assert_eq!(result, Err(LedgerError::Unauthorized { caller: account(1) }));
        assert_eq!(ledger.balance_of(&account(1)), Credits::ZERO);
        assert_eq!(ledger.total_supply(), Credits::ZERO);
    }

    #[test]
    fn test_mint_overflow_changes_nothing() {
        let mut ledger = CreditLedger::new(owner());
        ledger.mint(owner(), account(1), Credits::MAX).unwrap();

        let before = ledger.clone();
        let result = ledger.mint(owner(), account(2), Credits::new(1));
        assert_eq!(result, Err(LedgerError::BalanceOverflow { account: account(2) }));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_debit() {
        let mut ledger = CreditLedger::new(owner());
        ledger.mint(owner(), account(1), Credits::new(100)).unwrap();

        let balance = ledger.debit(account(1), Credits::new(16)).unwrap();
        assert_eq!(balance, Credits::new(84));
        assert_eq!(ledger.total_supply(), Credits::new(84));

        // Exact balance can be spent
        ledger.debit(account(1), Credits::new(84)).unwrap();
        assert_eq!(ledger.balance_of(&account(1)), Credits::ZERO);
    }

    #[test]
    fn test_debit_insufficient_balance() {
        let mut ledger = CreditLedger::new(owner());
        ledger.mint(owner(), account(1), Credits::new(76)).unwrap();

        let before = ledger.clone();
        let result = ledger.debit(account(1), Credits::new(77));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                required: Credits::new(77),
                available: Credits::new(76),
            })
        );
        assert_eq!(ledger, before);
        assert_eq!(ledger.balance_of(&account(1)), Credits::new(76));
    }

    #[test]
    fn test_debit_unknown_account() {
        let mut ledger = CreditLedger::new(owner());
        assert!(ledger.debit(account(9), Credits::new(1)).is_err());
        // Zero debit from an empty account is allowed
        assert_eq!(ledger.debit(account(9), Credits::ZERO), Ok(Credits::ZERO));
    }

    #[test]
    fn test_can_debit_matches_debit() {
        let mut ledger = CreditLedger::new(owner());
        ledger.mint(owner(), account(1), Credits::new(10)).unwrap();

        assert!(ledger.can_debit(&account(1), Credits::new(10)).is_ok());
        assert!(ledger.can_debit(&account(1), Credits::new(11)).is_err());
        assert_eq!(ledger.balance_of(&account(1)), Credits::new(10));
    }

    #[test]
    fn test_consistency_check() {
        let mut ledger = CreditLedger::new(owner());
        ledger.mint(owner(), account(1), Credits::new(10)).unwrap();
        ledger.mint(owner(), account(2), Credits::new(20)).unwrap();
        ledger.debit(account(2), Credits::new(5)).unwrap();
        assert!(ledger.is_consistent());

        let mut json: serde_json::Value = serde_json::to_value(&ledger).unwrap();
        json["total_supply"] = serde_json::json!(999);
        let tampered: CreditLedger = serde_json::from_value(json).unwrap();
        assert!(!tampered.is_consistent());
    }
}
