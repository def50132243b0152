use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use atm_simulator::{Console, Ledger, Outcome, Session, TokenRecords, csv_records};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Whitespace-separated `id pin balance` triples
    Tokens,
    /// CSV with an `id,pin,balance` header
    Csv,
}

#[derive(Debug, Parser)]
pub struct Args {
    /// File containing account information; prompted for when omitted
    #[clap(value_parser)]
    accounts: Option<PathBuf>,

    /// Layout of the account file
    #[clap(long, value_enum, default_value_t = Format::Tokens)]
    format: Format,

    /// Failed logins allowed before the program shuts down
    #[clap(long, default_value_t = atm_simulator::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u8,

    /// Print closing balances as CSV when the program ends
    #[clap(long)]
    report: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "atm_simulator=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    if args.max_attempts == 0 {
        bail!("--max-attempts must be at least 1");
    }

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());

    let path = match args.accounts {
        Some(path) => path,
        None => match console.ask_path()? {
            Some(path) => PathBuf::from(path),
            None => bail!("no account file given"),
        },
    };

    let mut ledger = load_ledger(&path, args.format)?;
    let outcome = {
        let mut session = Session::with_max_attempts(&mut ledger, args.max_attempts);
        console.run(&mut session)?
    };

    match outcome {
        Outcome::Normal => println!("Normal Exit"),
        Outcome::AttemptsExhausted => println!("Account not found - system shutting down"),
    }

    if args.report {
        ledger.write_report(io::stdout())?;
    }

    Ok(match outcome {
        Outcome::Normal => ExitCode::SUCCESS,
        Outcome::AttemptsExhausted => ExitCode::FAILURE,
    })
}

fn load_ledger(path: &Path, format: Format) -> Result<Ledger> {
    let file = File::open(path)
        .with_context(|| format!("failed to open account file {}", path.display()))?;

    let mut ledger = Ledger::new();
    let report = match format {
        Format::Tokens => ledger.load(
            TokenRecords::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to read account file {}", path.display()))?,
        ),
        Format::Csv => ledger.load(csv_records(BufReader::new(file))),
    };

    if let Some(err) = &report.stopped_by {
        tracing::warn!("stopped loading accounts: {}", err);
    }
    tracing::info!(loaded = report.loaded, path = %path.display(), "accounts loaded");
    Ok(ledger)
}
