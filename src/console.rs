//! Line commands accepted by the interactive console.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::models::{BookSide, Side};
use crate::ticket::TicketEdit;

/// Printed by `help` and at startup.
pub const HELP: &str = "\
commands:
  use <instrument>     poll and chart another instrument
  instruments          list known instruments
  book                 show the current order book
  ask <n> | bid <n>    copy book row n (0 = best) into the ticket
  side buy|sell        set the ticket side
  qty [n]              set the quantity (no value clears it)
  price [p]            set the price (no value clears it)
  ticket               show the ticket
  submit               place the trade
  cancel               clear the ticket
  chart [n]            show the last n chart samples
  help                 show this text
  quit                 stop the session";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Use(String),
    Instruments,
    Book,
    SelectLevel(BookSide, usize),
    Edit(TicketEdit),
    Ticket,
    Submit,
    Cancel,
    Chart(Option<usize>),
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{command}`: {value:?} is not a valid number")]
    InvalidNumber {
        command: &'static str,
        value: String,
    },
    #[error("{0}")]
    InvalidSide(String),
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a [`CommandError`] for unknown commands or bad arguments.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let arg = rest.first().copied();

    let command = match head.to_ascii_lowercase().as_str() {
        "use" | "instrument" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("use"));
            }
            Command::Use(rest.join(" "))
        }
        "instruments" | "list" => Command::Instruments,
        "book" => Command::Book,
        "ask" => Command::SelectLevel(BookSide::Ask, index_arg("ask", arg)?),
        "bid" => Command::SelectLevel(BookSide::Bid, index_arg("bid", arg)?),
        "side" => {
            let raw = arg.ok_or(CommandError::MissingArgument("side"))?;
            let side = raw.parse::<Side>().map_err(CommandError::InvalidSide)?;
            Command::Edit(TicketEdit::Side(Some(side)))
        }
        "qty" | "quantity" => Command::Edit(TicketEdit::Quantity(number_arg("qty", arg)?)),
        "price" => Command::Edit(TicketEdit::Price(number_arg("price", arg)?)),
        "ticket" => Command::Ticket,
        "submit" | "confirm" => Command::Submit,
        "cancel" => Command::Cancel,
        "chart" => Command::Chart(arg.map(|raw| parse_index("chart", raw)).transpose()?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => return Err(CommandError::Unknown(head.to_string())),
    };

    Ok(Some(command))
}

fn index_arg(command: &'static str, arg: Option<&str>) -> Result<usize, CommandError> {
    parse_index(command, arg.ok_or(CommandError::MissingArgument(command))?)
}

fn parse_index(command: &'static str, raw: &str) -> Result<usize, CommandError> {
    raw.parse().map_err(|_| CommandError::InvalidNumber {
        command,
        value: raw.to_string(),
    })
}

/// An absent argument clears the field; a present one must be a finite number.
fn number_arg(command: &'static str, arg: Option<&str>) -> Result<Option<f64>, CommandError> {
    arg.map(|raw| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CommandError::InvalidNumber {
                command,
                value: raw.to_string(),
            })
    })
    .transpose()
}

/// Reads one input line, replacing invalid UTF-8 instead of failing on it.
///
/// Returns `Ok(None)` at end of input. Bytes read before the future is
/// dropped stay in `buf`, so calling again after a `select!` branch lost
/// the race resumes the same line.
///
/// # Errors
///
/// Returns the underlying I/O error if the reader fails.
pub async fn read_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let n = reader.read_until(b'\n', buf).await?;
    if n == 0 && buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    buf.clear();
    Ok(Some(line))
}
