use std::io::BufRead;
use std::thread;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::slip::OutcomeRef;
use crate::workers::SlipCommand;

/// A line typed at the terminal front-end
#[derive(Debug)]
pub enum Input {
    /// Forward to the slip processor
    Slip(SlipCommand),
    /// List live matches
    Live,
    /// List outcomes priced at or below the value
    MaxPrice(f64),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("not a number: {0}")]
    NotANumber(String),
}

pub const HELP: &str = "\
pick <match> <market> <outcome>   add outcome (label or 1-based position)
remove <match> <market>           remove the match/market selection
clear                             empty the slip
stake <amount>                    set the stake
show                              list the slip and price drift
load <code>                       add a stored booking's selections at current prices
submit                            book the slip
live                              list live matches
under <price>                     list outcomes priced at or below <price>
quit";

/// Parse one input line.
///
/// Market names may contain spaces: for `pick` the market is everything
/// between the match id and the final token, for `remove` everything after
/// the match id.
pub fn parse_line(line: &str) -> Result<Input, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (command, args) = tokens.split_first().ok_or(ParseError::Empty)?;

    match command.to_lowercase().as_str() {
        "pick" | "add" => {
            if args.len() < 3 {
                return Err(ParseError::Usage("pick <match> <market> <outcome>"));
            }
            let (outcome, rest) = args.split_last().ok_or(ParseError::Empty)?;
            Ok(Input::Slip(SlipCommand::Pick {
                match_id: rest[0].to_string(),
                market: rest[1..].join(" "),
                outcome: OutcomeRef::parse(outcome),
            }))
        }
        "remove" | "rm" => {
            if args.len() < 2 {
                return Err(ParseError::Usage("remove <match> <market>"));
            }
            Ok(Input::Slip(SlipCommand::Remove {
                match_id: args[0].to_string(),
                market: args[1..].join(" "),
            }))
        }
        "clear" => Ok(Input::Slip(SlipCommand::Clear)),
        "show" | "slip" => Ok(Input::Slip(SlipCommand::Show)),
        "submit" | "book" => Ok(Input::Slip(SlipCommand::Submit { reply: None })),
        "load" => {
            let code = args.first().ok_or(ParseError::Usage("load <code>"))?;
            Ok(Input::Slip(SlipCommand::Load {
                reference: code.to_string(),
            }))
        }
        "stake" => {
            let amount = args.first().ok_or(ParseError::Usage("stake <amount>"))?;
            Ok(Input::Slip(SlipCommand::SetStake(parse_number(amount)?)))
        }
        "under" => {
            let price = args.first().ok_or(ParseError::Usage("under <price>"))?;
            Ok(Input::MaxPrice(parse_number(price)?))
        }
        "live" => Ok(Input::Live),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

/// Read lines on a dedicated OS thread.
///
/// The thread is detached: a read blocked on the terminal never holds up
/// runtime shutdown, and the thread ends at EOF or once the receiver is gone.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            };

            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Input reader finished");
    });

    rx
}

fn parse_number(s: &str) -> Result<f64, ParseError> {
    s.parse().map_err(|_| ParseError::NotANumber(s.to_string()))
}
