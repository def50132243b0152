use std::{
    io::{self, Read},
    str::FromStr,
};

use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Deserializer, de};
use thiserror::Error;

/// One raw `id pin balance` entry from a ledger source, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub id: String,
    pub pin: String,
    /// `None` when the balance is a number outside the range of `Decimal`.
    #[serde(deserialize_with = "deserialize_balance")]
    pub balance: Option<Decimal>,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record {index}: balance {token:?} is not a number")]
    InvalidBalance { index: usize, token: String },
    #[error("record {index}: incomplete record at end of input")]
    Truncated { index: usize },
    #[error("malformed CSV record: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
#[error("not a finite number")]
struct NotANumber;

/// Any finite float is a well-formed balance. Exact decimal text is kept as
/// written; anything `Decimal` can't hold comes back as `None`.
fn parse_balance(token: &str) -> Result<Option<Decimal>, NotANumber> {
    let value = token.parse::<f64>().map_err(|_| NotANumber)?;
    if !value.is_finite() {
        return Err(NotANumber);
    }
    Ok(Decimal::from_str(token)
        .or_else(|_| Decimal::from_scientific(token))
        .ok()
        .or_else(|| Decimal::from_f64(value)))
}

fn deserialize_balance<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let token = String::deserialize(deserializer)?;
    parse_balance(&token)
        .map_err(|err| de::Error::custom(format!("balance {:?}: {}", token, err)))
}

/// Reads greedy whitespace-separated triples. Stops after the first triple that
/// fails to parse, so a bad record ends the stream rather than being skipped.
pub struct TokenRecords {
    tokens: std::vec::IntoIter<String>,
    index: usize,
    failed: bool,
}

impl TokenRecords {
    pub fn new(text: &str) -> Self {
        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        TokenRecords {
            tokens: tokens.into_iter(),
            index: 0,
            failed: false,
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::new(&text))
    }
}

impl Iterator for TokenRecords {
    type Item = Result<Record, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let id = self.tokens.next()?;
        self.index += 1;
        let index = self.index;

        let (Some(pin), Some(balance)) = (self.tokens.next(), self.tokens.next()) else {
            self.failed = true;
            return Some(Err(RecordError::Truncated { index }));
        };
        match parse_balance(&balance) {
            Ok(balance) => Some(Ok(Record { id, pin, balance })),
            Err(_) => {
                self.failed = true;
                Some(Err(RecordError::InvalidBalance {
                    index,
                    token: balance,
                }))
            }
        }
    }
}

/// Reads `id,pin,balance` rows (with header) through serde.
pub fn csv_records<R: Read>(reader: R) -> impl Iterator<Item = Result<Record, RecordError>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_deserialize::<Record>()
        .map(|rec| rec.map_err(RecordError::from))
}
