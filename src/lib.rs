//! Single-user ATM simulator over an in-memory account ledger.
//!
//! Accounts are loaded from a flat file into a [`Ledger`], then a [`Session`]
//! runs the login and transaction loops. Nothing is written back to storage.

pub mod account;
pub mod command;
pub mod console;
pub mod ledger;
pub mod record;
pub mod session;

pub use account::{Account, AccountError, ValidationError};
pub use console::Console;
pub use ledger::{Ledger, LoadReport};
pub use record::{Record, RecordError, TokenRecords, csv_records};
pub use session::{DEFAULT_MAX_ATTEMPTS, Event, Outcome, Prompt, Session, State};
