//! Credit account state machine.
//!
//! An account tracks the spendable balance, the outstanding spend (the
//! ceiling for refunds), and the last refill period so periodic grants are
//! idempotent.

use crate::error::{CreditError, CreditResult, LedgerInconsistency};
use commio_types::UserId;
use serde::{Deserialize, Serialize};

/// One user's vote-credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    /// Account owner.
    user: UserId,
    /// Spendable credits. Never negative by construction.
    balance: u64,
    /// Credits spent and not yet refunded. Refunds clamp against this.
    outstanding: u64,
    /// Period index of the last applied refill.
    last_refill: Option<u64>,
}

/// Result of a refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundOutcome {
    /// Credits actually returned to the balance.
    pub refunded: u64,
    /// Present when the request exceeded the outstanding spend.
    pub inconsistency: Option<LedgerInconsistency>,
}

/// Result of a periodic refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    /// The grant was applied.
    Granted,
    /// This period was already granted; nothing changed.
    AlreadyGranted,
}

impl CreditAccount {
    /// Create an account with an initial grant.
    pub fn new(user: UserId, initial_balance: u64) -> Self {
        Self {
            user,
            balance: initial_balance,
            outstanding: 0,
            last_refill: None,
        }
    }

    /// Account owner.
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Current spendable balance.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Credits spent and not yet refunded.
    pub fn outstanding(&self) -> u64 {
        self.outstanding
    }

    /// Debit the balance.
    ///
    /// Fails with [`CreditError::InsufficientCredits`] when the balance
    /// cannot cover the amount; the account is left unchanged on failure.
    pub fn spend(&mut self, amount: u64) -> CreditResult<()> {
        if amount > self.balance {
            return Err(CreditError::InsufficientCredits {
                user: self.user,
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.outstanding += amount;
        Ok(())
    }

    /// Credit back a prior spend.
    ///
    /// The refund is clamped at the outstanding spend; a request beyond the
    /// ceiling returns a [`LedgerInconsistency`] report alongside the
    /// clamped amount.
    pub fn refund(&mut self, amount: u64) -> RefundOutcome {
        let refundable = self.outstanding;
        let refunded = amount.min(refundable);
        self.balance += refunded;
        self.outstanding -= refunded;

        let inconsistency = (amount > refundable).then(|| LedgerInconsistency {
            user: self.user,
            requested: amount,
            refundable,
        });

        RefundOutcome {
            refunded,
            inconsistency,
        }
    }

    /// Apply a periodic grant, keyed by refill period.
    ///
    /// A repeated grant for the same period is a no-op, so retried refill
    /// jobs cannot double-credit an account.
    pub fn refill(&mut self, amount: u64, period: u64) -> RefillOutcome {
        if self.last_refill == Some(period) {
            return RefillOutcome::AlreadyGranted;
        }
        self.balance += amount;
        self.last_refill = Some(period);
        RefillOutcome::Granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_account(balance: u64) -> CreditAccount {
        CreditAccount::new(UserId(1), balance)
    }

    #[test]
    fn test_spend_debits_balance() {
        let mut account = make_account(10);
        account.spend(4).expect("spend");

        assert_eq!(account.balance(), 6);
        assert_eq!(account.outstanding(), 4);
    }

    #[test]
    fn test_spend_insufficient_rejected() {
        let mut account = make_account(3);
        let err = account.spend(4).unwrap_err();

        assert_eq!(
            err,
            CreditError::InsufficientCredits {
                user: UserId(1),
                needed: 4,
                available: 3,
            }
        );
        // Unchanged on failure
        assert_eq!(account.balance(), 3);
        assert_eq!(account.outstanding(), 0);
    }

    #[test]
    fn test_refund_returns_spent_credits() {
        let mut account = make_account(10);
        account.spend(9).expect("spend");

        let outcome = account.refund(9);
        assert_eq!(outcome.refunded, 9);
        assert!(outcome.inconsistency.is_none());
        assert_eq!(account.balance(), 10);
    }

    #[test]
    fn test_refund_clamped_at_outstanding() {
        let mut account = make_account(10);
        account.spend(4).expect("spend");

        let outcome = account.refund(9);
        assert_eq!(outcome.refunded, 4);
        let report = outcome.inconsistency.expect("inconsistency");
        assert_eq!(report.requested, 9);
        assert_eq!(report.refundable, 4);
        assert_eq!(account.balance(), 10);
        assert_eq!(account.outstanding(), 0);
    }

    #[test]
    fn test_refill_idempotent_per_period() {
        let mut account = make_account(0);

        assert_eq!(account.refill(25, 7), RefillOutcome::Granted);
        assert_eq!(account.refill(25, 7), RefillOutcome::AlreadyGranted);
        assert_eq!(account.balance(), 25);

        assert_eq!(account.refill(25, 8), RefillOutcome::Granted);
        assert_eq!(account.balance(), 50);
    }

    #[test]
    fn test_balance_conserved_across_sequences() {
        // Refunds can never exceed spends, so balance tracks a simple model:
        // initial + refills + refunds - successful spends, always >= 0.
        let mut account = make_account(5);
        let mut model: i128 = 5;
        let ops: &[(&str, u64)] = &[
            ("spend", 3),
            ("refund", 10),
            ("spend", 9),
            ("refill", 4),
            ("spend", 2),
            ("refund", 1),
            ("refund", 50),
        ];

        for (i, (op, amount)) in ops.iter().enumerate() {
            match *op {
                "spend" => {
                    if account.spend(*amount).is_ok() {
                        model -= *amount as i128;
                    }
                }
                "refund" => {
                    model += account.refund(*amount).refunded as i128;
                }
                "refill" => {
                    if account.refill(*amount, i as u64) == RefillOutcome::Granted {
                        model += *amount as i128;
                    }
                }
                _ => unreachable!(),
            }
            assert!(model >= 0);
            assert_eq!(account.balance() as i128, model);
        }
    }
}
