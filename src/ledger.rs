use std::io::Write;

use anyhow::Result;
use csv::Writer;

use crate::{
    account::Account,
    record::{Record, RecordError},
};

/// Ordered, append-only collection of accounts. Duplicate ids are allowed and
/// the first match in insertion order wins.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: Vec<Account>,
}

#[derive(Debug)]
pub struct LoadReport {
    pub loaded: usize,
    /// The record that ended loading early, if any.
    pub stopped_by: Option<RecordError>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            accounts: Vec::new(),
        }
    }

    /// Appends one account per record until the source is exhausted or yields an
    /// error. Accounts loaded before the error are kept.
    pub fn load<I>(&mut self, records: I) -> LoadReport
    where
        I: IntoIterator<Item = Result<Record, RecordError>>,
    {
        let mut loaded = 0;
        for rec in records {
            match rec {
                Ok(record) => {
                    self.add(Account::from_record(&record));
                    loaded += 1;
                }
                Err(err) => {
                    return LoadReport {
                        loaded,
                        stopped_by: Some(err),
                    };
                }
            }
        }
        LoadReport {
            loaded,
            stopped_by: None,
        }
    }

    pub fn add(&mut self, account: Account) {
        self.accounts.push(account);
    }

    pub fn position(&self, id: &str, pin: &str) -> Option<usize> {
        self.accounts.iter().position(|acct| acct.matches(id, pin))
    }

    pub fn lookup(&self, id: &str, pin: &str) -> Option<&Account> {
        self.position(id, pin).map(|idx| &self.accounts[idx])
    }

    pub fn account(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    pub fn account_mut(&mut self, index: usize) -> Option<&mut Account> {
        self.accounts.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    /// Writes closing balances as CSV. PINs are never included.
    pub fn write_report<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);

        writer.write_record(["id", "balance"])?;
        for acct in &self.accounts {
            writer.write_record([acct.id().to_string(), format!("{:.2}", acct.balance())])?;
        }

        writer.flush()?;
        Ok(())
    }
}
