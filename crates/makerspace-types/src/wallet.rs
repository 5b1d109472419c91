//! Member wallet

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, UserId, WalletError};

/// Prepaid balance a member draws pay-per-use charges from
///
/// The balance is never negative; construction and deserialization both
/// reject one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WalletRecord")]
pub struct UserWallet {
    user_id: UserId,
    balance: Decimal,
    currency: Currency,
}

impl UserWallet {
    /// Create a wallet
    pub fn new(user_id: UserId, balance: Decimal, currency: Currency) -> Result<Self, WalletError> {
        if balance < Decimal::ZERO {
            return Err(WalletError::NegativeBalance);
        }
        Ok(Self {
            user_id,
            balance,
            currency,
        })
    }

    /// Owner of the wallet
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Currency of the balance
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Whether the balance covers `amount` in `currency`
    ///
    /// A balance in another currency never covers the amount.
    pub fn covers(&self, amount: Decimal, currency: &Currency) -> bool {
        &self.currency == currency && self.balance >= amount
    }
}

#[derive(Deserialize)]
struct WalletRecord {
    user_id: UserId,
    balance: Decimal,
    #[serde(default)]
    currency: Currency,
}

impl TryFrom<WalletRecord> for UserWallet {
    type Error = WalletError;

    fn try_from(record: WalletRecord) -> Result<Self, Self::Error> {
        Self::new(record.user_id, record.balance, record.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_balance_rejected() {
        assert_eq!(
            UserWallet::new(UserId::new(), dec!(-0.01), Currency::default()),
            Err(WalletError::NegativeBalance)
        );
    }

    #[test]
    fn test_covers_same_currency() {
        let wallet = UserWallet::new(UserId::new(), dec!(225), Currency::default()).unwrap();
        assert!(wallet.covers(dec!(225), &Currency::default()));
        assert!(!wallet.covers(dec!(225.01), &Currency::default()));
    }

    #[test]
    fn test_covers_rejects_other_currency() {
        let wallet = UserWallet::new(UserId::new(), dec!(1000), Currency::default()).unwrap();
        let usd = Currency::new("USD").unwrap();
        assert!(!wallet.covers(dec!(1), &usd));
    }

    #[test]
    fn test_deserialize_rejects_negative_balance() {
        let json = format!(
            r#"{{"user_id": "{}", "balance": "-5", "currency": "INR"}}"#,
            UserId::new()
        );
        assert!(serde_json::from_str::<UserWallet>(&json).is_err());
    }
}
