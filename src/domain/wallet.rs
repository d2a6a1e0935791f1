//! Prepaid wallet — per-VID non-negative balance.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient funds")]
    InsufficientFunds,
}

/// Shared, reference-counted wallet.
pub type SharedWallet = Arc<Wallet>;

pub struct Wallet {
    balances: DashMap<String, Decimal>,
}

impl Wallet {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    pub fn shared() -> SharedWallet {
        Arc::new(Self::new())
    }

    /// Current balance for `vid`, defaulting to zero if unknown.
    pub fn balance(&self, vid: &str) -> Decimal {
        self.balances.get(vid).map(|b| *b).unwrap_or(Decimal::ZERO)
    }

    /// Add `amount` to the balance, returning the new total.
    pub fn top_up(&self, vid: &str, amount: Decimal) -> Decimal {
        let mut entry = self.balances.entry(vid.to_string()).or_insert(Decimal::ZERO);
        *entry += amount;
        *entry
    }

    /// Subtract `amount`, failing atomically if it would go negative.
    pub fn deduct(&self, vid: &str, amount: Decimal) -> Result<Decimal, WalletError> {
        let mut entry = self.balances.entry(vid.to_string()).or_insert(Decimal::ZERO);
        if amount > *entry {
            return Err(WalletError::InsufficientFunds);
        }
        *entry -= amount;
        Ok(*entry)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unknown_vid_defaults_to_zero() {
        let wallet = Wallet::new();
        assert_eq!(wallet.balance("VID:0000000001"), Decimal::ZERO);
    }

    #[test]
    fn top_up_then_balance() {
        let wallet = Wallet::new();
        wallet.top_up("VID:0000000001", dec!(10));
        assert_eq!(wallet.balance("VID:0000000001"), dec!(10));
    }

    #[test]
    fn deduct_never_goes_negative() {
        let wallet = Wallet::new();
        wallet.top_up("VID:0000000001", dec!(5));
        let err = wallet.deduct("VID:0000000001", dec!(10)).unwrap_err();
        assert_eq!(err, WalletError::InsufficientFunds);
        assert_eq!(wallet.balance("VID:0000000001"), dec!(5));
    }

    #[test]
    fn successful_deduct_updates_balance() {
        let wallet = Wallet::new();
        wallet.top_up("VID:0000000001", dec!(10));
        let remaining = wallet.deduct("VID:0000000001", dec!(4)).unwrap();
        assert_eq!(remaining, dec!(6));
        assert_eq!(wallet.balance("VID:0000000001"), dec!(6));
    }
}
