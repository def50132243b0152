use std::{
    collections::VecDeque,
    io::{BufRead, Write},
};

use anyhow::Result;

use crate::session::{Event, Outcome, Prompt, Session};

/// Interactive text front end for a [`Session`].
///
/// Input is consumed one whitespace-separated token at a time, so several
/// answers may be typed on one line.
pub struct Console<R, W> {
    input: R,
    output: W,
    pending: VecDeque<String>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console {
            input,
            output,
            pending: VecDeque::new(),
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Returns `None` once input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
        Ok(self.pending.pop_front())
    }

    pub fn ask_path(&mut self) -> Result<Option<String>> {
        write!(self.output, "Enter path for account information: ")?;
        self.output.flush()?;
        self.next_token()
    }

    /// Drives the session until it terminates. Running out of input while the
    /// session is still live counts as a normal quit.
    pub fn run(&mut self, session: &mut Session) -> Result<Outcome> {
        while let Some(prompt) = session.prompt() {
            self.show_prompt(prompt)?;
            let Some(token) = self.next_token()? else {
                tracing::warn!("input closed before the session ended");
                writeln!(self.output)?;
                return Ok(Outcome::Normal);
            };
            for event in session.handle(&token) {
                self.show_event(&event)?;
            }
        }
        Ok(session.outcome().unwrap_or(Outcome::Normal))
    }

    fn show_prompt(&mut self, prompt: Prompt) -> Result<()> {
        let text = match prompt {
            Prompt::LoginMenu => "Please enter your command\nQ - quit/exit\nL - login to account\n",
            Prompt::AccountId => "Please enter Account ID: ",
            Prompt::Pin => "Please enter PIN: ",
            Prompt::TransactionMenu => {
                "Please enter your selection or Q to quit.\n\
                 W - withdraw funds\n\
                 D - deposit funds\n\
                 B - check balance\n\
                 Q - quit/exit\n"
            }
            Prompt::WithdrawAmount => "Please enter the amount of withdrawal: ",
            Prompt::DepositAmount => "Please enter amount of deposit: ",
        };
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }

    fn show_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Goodbye => writeln!(self.output, "Goodbye.")?,
            Event::AccountFound => writeln!(self.output, "Account found")?,
            Event::NoMatch { remaining } => {
                writeln!(self.output, "Sorry - no match")?;
                writeln!(self.output, "Login attempts remaining: {}", remaining)?;
            }
            Event::AttemptsExhausted => {
                writeln!(self.output, "No attempt remains. Exiting program.")?
            }
            Event::Withdrawn { .. } => writeln!(self.output, "Successfully withdraw.")?,
            Event::Deposited { .. } => writeln!(self.output, "Successfully deposit.")?,
            Event::Rejected(err) => writeln!(self.output, "Error: {}", err)?,
            Event::Balance(text) => writeln!(self.output, "{}", text)?,
            Event::InvalidAmount(token) => writeln!(self.output, "Invalid amount {}", token)?,
            Event::Unrecognized(token) => writeln!(self.output, "Unrecognized command {}", token)?,
        }
        Ok(())
    }
}
