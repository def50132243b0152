use std::mem;

use rust_decimal::Decimal;

use crate::{
    account::AccountError,
    command::{CommandError, LoginCommand, TransactionCommand, parse_amount},
    ledger::Ledger,
};

pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Normal,
    AttemptsExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticating {
    AwaitingId,
    AwaitingPin { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Withdraw,
    Deposit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    LoggedOut,
    Authenticating(Authenticating),
    /// `account` indexes into the ledger; `pending` is set while an amount is
    /// expected.
    InSession {
        account: usize,
        pending: Option<Pending>,
    },
    Terminated(Outcome),
}

/// The input the session expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    LoginMenu,
    AccountId,
    Pin,
    TransactionMenu,
    WithdrawAmount,
    DepositAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Goodbye,
    AccountFound,
    NoMatch { remaining: u8 },
    AttemptsExhausted,
    Withdrawn { balance: Decimal },
    Deposited { balance: Decimal },
    Rejected(AccountError),
    Balance(String),
    InvalidAmount(String),
    Unrecognized(String),
}

/// Login and transaction loops of the ATM as a token-driven state machine.
///
/// The session performs no I/O: a driver asks for the current [`Prompt`], reads
/// one token, and passes it to [`Session::handle`], rendering the returned
/// events however it likes.
pub struct Session<'a> {
    ledger: &'a mut Ledger,
    state: State,
    attempts: u8,
    max_attempts: u8,
}

impl<'a> Session<'a> {
    pub fn new(ledger: &'a mut Ledger) -> Self {
        Self::with_max_attempts(ledger, DEFAULT_MAX_ATTEMPTS)
    }

    /// A limit of zero is treated as one.
    pub fn with_max_attempts(ledger: &'a mut Ledger, max_attempts: u8) -> Self {
        Session {
            ledger,
            state: State::LoggedOut,
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            State::Terminated(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn prompt(&self) -> Option<Prompt> {
        match &self.state {
            State::LoggedOut => Some(Prompt::LoginMenu),
            State::Authenticating(Authenticating::AwaitingId) => Some(Prompt::AccountId),
            State::Authenticating(Authenticating::AwaitingPin { .. }) => Some(Prompt::Pin),
            State::InSession { pending: None, .. } => Some(Prompt::TransactionMenu),
            State::InSession {
                pending: Some(Pending::Withdraw),
                ..
            } => Some(Prompt::WithdrawAmount),
            State::InSession {
                pending: Some(Pending::Deposit),
                ..
            } => Some(Prompt::DepositAmount),
            State::Terminated(_) => None,
        }
    }

    /// Applies one input token. Tokens received after termination are ignored.
    pub fn handle(&mut self, token: &str) -> Vec<Event> {
        let state = mem::replace(&mut self.state, State::LoggedOut);
        let (next, events) = match state {
            State::LoggedOut => self.login_menu(token),
            State::Authenticating(Authenticating::AwaitingId) => (
                State::Authenticating(Authenticating::AwaitingPin {
                    id: token.to_string(),
                }),
                vec![],
            ),
            State::Authenticating(Authenticating::AwaitingPin { id }) => {
                self.authenticate(&id, token)
            }
            State::InSession {
                account,
                pending: None,
            } => self.transaction_menu(account, token),
            State::InSession {
                account,
                pending: Some(pending),
            } => self.transact(account, pending, token),
            terminated @ State::Terminated(_) => (terminated, vec![]),
        };
        self.state = next;
        events
    }

    fn login_menu(&mut self, token: &str) -> (State, Vec<Event>) {
        match token.parse::<LoginCommand>() {
            Ok(LoginCommand::Quit) => (State::Terminated(Outcome::Normal), vec![Event::Goodbye]),
            Ok(LoginCommand::Login) => (State::Authenticating(Authenticating::AwaitingId), vec![]),
            Err(err) => (State::LoggedOut, vec![unrecognized(err)]),
        }
    }

    fn authenticate(&mut self, id: &str, pin: &str) -> (State, Vec<Event>) {
        if let Some(account) = self.ledger.position(id, pin) {
            tracing::info!(id, "login succeeded");
            self.attempts = 0;
            return (
                State::InSession {
                    account,
                    pending: None,
                },
                vec![Event::AccountFound],
            );
        }

        self.attempts += 1;
        let remaining = self.max_attempts.saturating_sub(self.attempts);
        tracing::warn!(id, attempts = self.attempts, remaining, "login failed");
        if remaining == 0 {
            (
                State::Terminated(Outcome::AttemptsExhausted),
                vec![Event::NoMatch { remaining }, Event::AttemptsExhausted],
            )
        } else {
            (State::LoggedOut, vec![Event::NoMatch { remaining }])
        }
    }

    fn transaction_menu(&mut self, account: usize, token: &str) -> (State, Vec<Event>) {
        let in_session = |pending| State::InSession { account, pending };
        match token.parse::<TransactionCommand>() {
            Ok(TransactionCommand::Withdraw) => (in_session(Some(Pending::Withdraw)), vec![]),
            Ok(TransactionCommand::Deposit) => (in_session(Some(Pending::Deposit)), vec![]),
            Ok(TransactionCommand::Balance) => match self.ledger.account(account) {
                Some(acct) => (in_session(None), vec![Event::Balance(acct.display_balance())]),
                None => missing_account(account),
            },
            Ok(TransactionCommand::Quit) => (State::LoggedOut, vec![Event::Goodbye]),
            Err(err) => (in_session(None), vec![unrecognized(err)]),
        }
    }

    fn transact(&mut self, account: usize, pending: Pending, token: &str) -> (State, Vec<Event>) {
        let next = State::InSession {
            account,
            pending: None,
        };
        let amount = match parse_amount(token) {
            Ok(amount) => amount,
            Err(_) => return (next, vec![Event::InvalidAmount(token.to_string())]),
        };
        let Some(acct) = self.ledger.account_mut(account) else {
            return missing_account(account);
        };

        let result = match pending {
            Pending::Withdraw => acct.withdraw(amount).map(|balance| Event::Withdrawn { balance }),
            Pending::Deposit => acct.deposit(amount).map(|balance| Event::Deposited { balance }),
        };
        let event = match result {
            Ok(event) => {
                tracing::debug!(id = acct.id(), ?pending, %amount, "transaction applied");
                event
            }
            Err(err) => {
                tracing::debug!(id = acct.id(), ?pending, %amount, %err, "transaction rejected");
                Event::Rejected(err)
            }
        };
        (next, vec![event])
    }
}

fn missing_account(account: usize) -> (State, Vec<Event>) {
    tracing::error!(account, "authenticated account missing from ledger");
    (State::LoggedOut, vec![])
}

fn unrecognized(err: CommandError) -> Event {
    match err {
        CommandError::Unrecognized(token) | CommandError::InvalidAmount(token) => {
            Event::Unrecognized(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TokenRecords;

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.load(TokenRecords::new(
            "12345678 1234 100.0\nA0000002 5678 50.0\n",
        ));
        ledger
    }

    fn feed(session: &mut Session, tokens: &[&str]) -> Vec<Event> {
        tokens.iter().flat_map(|token| session.handle(token)).collect()
    }

    #[test]
    fn test_session_creation() {
        let mut ledger = ledger();
        let session = Session::new(&mut ledger);
        assert_eq!(session.state(), &State::LoggedOut);
        assert_eq!(session.prompt(), Some(Prompt::LoginMenu));
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.outcome(), None);
    }

    #[test]
    fn test_quit_from_login_menu() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        assert_eq!(session.handle("Q"), vec![Event::Goodbye]);
        assert_eq!(session.outcome(), Some(Outcome::Normal));
        assert_eq!(session.prompt(), None);
        // Further input is ignored
        assert!(session.handle("L").is_empty());
        assert_eq!(session.outcome(), Some(Outcome::Normal));
    }

    #[test]
    fn test_login_prompts() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        assert!(session.handle("L").is_empty());
        assert_eq!(session.prompt(), Some(Prompt::AccountId));
        assert!(session.handle("12345678").is_empty());
        assert_eq!(session.prompt(), Some(Prompt::Pin));
        assert_eq!(
            session.state(),
            &State::Authenticating(Authenticating::AwaitingPin {
                id: "12345678".to_string()
            })
        );
        assert_eq!(session.handle("1234"), vec![Event::AccountFound]);
        assert_eq!(
            session.state(),
            &State::InSession {
                account: 0,
                pending: None
            }
        );
        assert_eq!(session.prompt(), Some(Prompt::TransactionMenu));
    }

    #[test]
    fn test_attempts_exhausted() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        let events = feed(
            &mut session,
            &["L", "12345678", "0000", "L", "A0000002", "1234", "L", "nobody", "9999"],
        );
        assert_eq!(
            events,
            vec![
                Event::NoMatch { remaining: 2 },
                Event::NoMatch { remaining: 1 },
                Event::NoMatch { remaining: 0 },
                Event::AttemptsExhausted,
            ]
        );
        assert_eq!(session.attempts(), 3);
        assert_eq!(session.outcome(), Some(Outcome::AttemptsExhausted));
    }

    #[test]
    fn test_successful_login_resets_attempts() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        feed(&mut session, &["L", "12345678", "9999"]);
        assert_eq!(session.attempts(), 1);
        assert_eq!(session.state(), &State::LoggedOut);

        assert_eq!(
            feed(&mut session, &["L", "12345678", "1234"]),
            vec![Event::AccountFound]
        );
        assert_eq!(session.attempts(), 0);

        // Two more failures after logging out are not fatal
        feed(&mut session, &["Q", "L", "x", "y", "L", "x", "y"]);
        assert_eq!(session.attempts(), 2);
        assert_eq!(session.outcome(), None);
    }

    #[test]
    fn test_custom_attempt_limit() {
        let mut ledger = ledger();
        let mut session = Session::with_max_attempts(&mut ledger, 1);
        assert_eq!(
            feed(&mut session, &["L", "bad", "bad"]),
            vec![Event::NoMatch { remaining: 0 }, Event::AttemptsExhausted]
        );
        assert_eq!(session.outcome(), Some(Outcome::AttemptsExhausted));
    }

    #[test]
    fn test_unrecognized_commands() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        assert_eq!(session.handle("l"), vec![Event::Unrecognized("l".to_string())]);
        assert_eq!(session.state(), &State::LoggedOut);
        assert_eq!(session.attempts(), 0);

        feed(&mut session, &["L", "12345678", "1234"]);
        assert_eq!(session.handle("X"), vec![Event::Unrecognized("X".to_string())]);
        assert_eq!(session.prompt(), Some(Prompt::TransactionMenu));
    }

    #[test]
    fn test_transactions() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        feed(&mut session, &["L", "12345678", "1234"]);

        assert!(session.handle("W").is_empty());
        assert_eq!(session.prompt(), Some(Prompt::WithdrawAmount));
        assert_eq!(
            session.handle("150.0"),
            vec![Event::Rejected(AccountError::InsufficientFunds {
                balance: Decimal::new(100, 0),
                requested: Decimal::new(150, 0),
            })]
        );
        assert_eq!(
            feed(&mut session, &["W", "40.0"]),
            vec![Event::Withdrawn {
                balance: Decimal::new(60, 0)
            }]
        );
        assert_eq!(
            feed(&mut session, &["D", "10.0"]),
            vec![Event::Deposited {
                balance: Decimal::new(70, 0)
            }]
        );
        assert_eq!(
            session.handle("B"),
            vec![Event::Balance("Balance: $70.00".to_string())]
        );
        assert_eq!(session.prompt(), Some(Prompt::TransactionMenu));
    }

    #[test]
    fn test_rejected_and_invalid_amounts() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        feed(&mut session, &["L", "12345678", "1234"]);

        assert_eq!(
            feed(&mut session, &["W", "0"]),
            vec![Event::Rejected(AccountError::NonPositiveWithdrawal(
                Decimal::ZERO
            ))]
        );
        assert_eq!(
            feed(&mut session, &["D", "-5"]),
            vec![Event::Rejected(AccountError::NegativeDeposit(Decimal::new(
                -5, 0
            )))]
        );
        assert_eq!(
            feed(&mut session, &["D", "0"]),
            vec![Event::Deposited {
                balance: Decimal::new(100, 0)
            }]
        );
        assert_eq!(
            feed(&mut session, &["W", "lots"]),
            vec![Event::InvalidAmount("lots".to_string())]
        );
        assert_eq!(session.prompt(), Some(Prompt::TransactionMenu));
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);
        feed(&mut session, &["L", "12345678", "1234"]);

        assert_eq!(
            feed(&mut session, &["D", "79228162514264337593543950335"]),
            vec![Event::Rejected(AccountError::BalanceOverflow {
                balance: Decimal::new(100, 0),
                requested: Decimal::MAX,
            })]
        );
        assert_eq!(session.prompt(), Some(Prompt::TransactionMenu));
        assert_eq!(
            session.handle("B"),
            vec![Event::Balance("Balance: $100.00".to_string())]
        );
    }

    #[test]
    fn test_missing_account_logs_out() {
        let mut ledger = ledger();
        let mut session = Session::new(&mut ledger);

        session.state = State::InSession {
            account: 9,
            pending: None,
        };
        assert!(session.handle("B").is_empty());
        assert_eq!(session.state(), &State::LoggedOut);

        session.state = State::InSession {
            account: 9,
            pending: Some(Pending::Deposit),
        };
        assert!(session.handle("10").is_empty());
        assert_eq!(session.state(), &State::LoggedOut);
    }

    #[test]
    fn test_quit_returns_to_login_and_keeps_balances() {
        let mut ledger = ledger();
        {
            let mut session = Session::new(&mut ledger);
            feed(&mut session, &["L", "A0000002", "5678", "W", "20"]);
            assert_eq!(session.handle("Q"), vec![Event::Goodbye]);
            assert_eq!(session.state(), &State::LoggedOut);
            assert_eq!(session.outcome(), None);

            feed(&mut session, &["L", "A0000002", "5678"]);
            assert_eq!(
                session.handle("B"),
                vec![Event::Balance("Balance: $30.00".to_string())]
            );
            feed(&mut session, &["Q", "Q"]);
            assert_eq!(session.outcome(), Some(Outcome::Normal));
        }
        assert_eq!(
            ledger.lookup("A0000002", "5678").unwrap().balance(),
            Decimal::new(30, 0)
        );
    }
}
