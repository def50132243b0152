use rust_decimal::Decimal;
use thiserror::Error;

use crate::record::Record;

pub const ID_LEN: usize = 8;
pub const PIN_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid ID")]
    InvalidId,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Invalid balance")]
    InvalidBalance,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("deposit amount must not be negative: {0}")]
    NegativeDeposit(Decimal),
    #[error("withdrawal amount must be positive: {0}")]
    NonPositiveWithdrawal(Decimal),
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("deposit of {requested} would overflow balance {balance}")]
    BalanceOverflow { balance: Decimal, requested: Decimal },
}

/// A single ledger entry.
///
/// Fields that fail validation are left unset (empty id or pin, zero balance)
/// instead of rejecting the whole account. An account with an unset id or pin
/// can never be matched by a lookup with non-empty credentials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    id: String,
    pin: String,
    balance: Decimal,
}

impl Account {
    /// Builds an account, logging every field that failed validation.
    pub fn new(id: &str, pin: &str, balance: Decimal) -> Self {
        Self::logged(id, pin, Some(balance))
    }

    /// Like [`Account::new`]; a balance the source could not represent is
    /// treated as invalid.
    pub fn from_record(record: &Record) -> Self {
        Self::logged(&record.id, &record.pin, record.balance)
    }

    /// Validates each field independently and returns the violations alongside
    /// the (possibly partially unset) account.
    pub fn validated(id: &str, pin: &str, balance: Decimal) -> (Self, Vec<ValidationError>) {
        Self::validate_fields(id, pin, Some(balance))
    }

    fn logged(id: &str, pin: &str, balance: Option<Decimal>) -> Self {
        let (account, errors) = Self::validate_fields(id, pin, balance);
        for err in &errors {
            tracing::warn!(id, "{}!", err);
        }
        account
    }

    fn validate_fields(
        id: &str,
        pin: &str,
        balance: Option<Decimal>,
    ) -> (Self, Vec<ValidationError>) {
        let mut account = Account::default();
        let mut errors = Vec::new();

        // Length in bytes
        if id.len() == ID_LEN {
            account.id = id.to_string();
        } else {
            errors.push(ValidationError::InvalidId);
        }

        if pin.len() == PIN_LEN && pin.chars().all(|c| c.is_ascii_digit()) {
            account.pin = pin.to_string();
        } else {
            errors.push(ValidationError::InvalidPin);
        }

        match balance {
            Some(balance) if balance >= Decimal::ZERO => account.balance = balance,
            _ => errors.push(ValidationError::InvalidBalance),
        }

        (account, errors)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_unset(&self) -> bool {
        self.id.is_empty()
    }

    pub fn matches(&self, id: &str, pin: &str) -> bool {
        self.id == id && self.pin == pin
    }

    /// Zero is accepted; returns the new balance.
    pub fn deposit(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::NegativeDeposit(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow {
                balance: self.balance,
                requested: amount,
            })?;
        Ok(self.balance)
    }

    /// Zero is rejected, as is anything above the current balance.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::NonPositiveWithdrawal(amount));
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    pub fn display_balance(&self) -> String {
        format!("Balance: ${:.2}", self.balance)
    }
}
