use thiserror::Error;
use uuid::Uuid;

/// A parsed chat command. Slot arguments stay as text until the handler
/// resolves them against the current date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Book { slot: String },
    Reschedule { id: Uuid, slot: String },
    Cancel { id: Uuid },
    List,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command; try /help")]
    Empty,
    #[error("unknown command {0:?}; try /help")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid appointment id {0:?}")]
    BadId(String),
}

pub const HELP: &str = "commands: /book HH:MM | /reschedule <id> HH:MM | /cancel <id> | /list | /help";

impl Command {
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut words = text.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;
        let name = head.strip_prefix('/').unwrap_or(head).to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        match name.as_str() {
            "book" => match rest.as_slice() {
                [] => Err(CommandError::Usage("/book HH:MM")),
                slot => Ok(Command::Book { slot: slot.join(" ") }),
            },
            "reschedule" => match rest.as_slice() {
                [id, slot @ ..] if !slot.is_empty() => Ok(Command::Reschedule {
                    id: parse_id(id)?,
                    slot: slot.join(" "),
                }),
                _ => Err(CommandError::Usage("/reschedule <id> HH:MM")),
            },
            "cancel" => match rest.as_slice() {
                [id] => Ok(Command::Cancel { id: parse_id(id)? }),
                _ => Err(CommandError::Usage("/cancel <id>")),
            },
            "list" => Ok(Command::List),
            "help" | "start" => Ok(Command::Help),
            _ => Err(CommandError::Unknown(head.to_string())),
        }
    }
}

fn parse_id(text: &str) -> Result<Uuid, CommandError> {
    Uuid::parse_str(text).map_err(|_| CommandError::BadId(text.to_string()))
}
