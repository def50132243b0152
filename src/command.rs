use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginCommand {
    Quit,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCommand {
    Withdraw,
    Deposit,
    Balance,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unrecognized command {0}")]
    Unrecognized(String),
    #[error("Invalid amount {0}")]
    InvalidAmount(String),
}

impl FromStr for LoginCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Q" => Ok(LoginCommand::Quit),
            "L" => Ok(LoginCommand::Login),
            _ => Err(CommandError::Unrecognized(s.to_string())),
        }
    }
}

impl FromStr for TransactionCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "W" => Ok(TransactionCommand::Withdraw),
            "D" => Ok(TransactionCommand::Deposit),
            "B" => Ok(TransactionCommand::Balance),
            "Q" => Ok(TransactionCommand::Quit),
            _ => Err(CommandError::Unrecognized(s.to_string())),
        }
    }
}

pub fn parse_amount(token: &str) -> Result<Decimal, CommandError> {
    Decimal::from_str(token).map_err(|_| CommandError::InvalidAmount(token.to_string()))
}
