//! Operator command parsing
//!
//! Turns a prompt line into a typed command. Room passwords follow the
//! backend's 4-digit rule; the custom `send` form takes a raw JSON payload.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while parsing a command line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for the command list.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Password must be 4 digits (1000-9999)")]
    InvalidPassword,

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),
}

/// A parsed operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Login {
        username: String,
        password: String,
        remember_me: bool,
    },
    Token {
        token: String,
    },
    Whoami,
    Connect {
        url: Option<String>,
    },
    Disconnect,
    Create {
        max_players: u32,
        bet_value: f64,
        password: Option<u16>,
    },
    Join {
        room_id: String,
        password: Option<u16>,
    },
    Leave {
        room_id: Option<String>,
    },
    Rooms,
    Room,
    Wallet,
    Deposit {
        amount: f64,
        user_id: Option<String>,
        metadata: Option<Value>,
    },
    Send {
        namespace: String,
        event: String,
        data: Value,
    },
}

impl Command {
    /// Parse a non-empty prompt line
    pub fn parse(line: &str) -> Result<Command, CommandError> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default().to_ascii_lowercase();

        match keyword.as_str() {
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "status" => Ok(Command::Status),
            "login" => {
                let username = tokens
                    .next()
                    .ok_or(CommandError::Usage("login <username> <password> [--once]"))?;
                let password = tokens
                    .next()
                    .ok_or(CommandError::Usage("login <username> <password> [--once]"))?;
                let remember_me = tokens.next() != Some("--once");
                Ok(Command::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                    remember_me,
                })
            }
            "token" => {
                let token = tokens.next().ok_or(CommandError::Usage("token <jwt>"))?;
                Ok(Command::Token {
                    token: token.to_string(),
                })
            }
            "whoami" => Ok(Command::Whoami),
            "connect" => Ok(Command::Connect {
                url: tokens.next().map(str::to_string),
            }),
            "disconnect" => Ok(Command::Disconnect),
            "create" => {
                let max_players = parse_number(
                    tokens
                        .next()
                        .ok_or(CommandError::Usage("create <max_players> <bet_value> [password]"))?,
                )?;
                let bet_value = parse_number(
                    tokens
                        .next()
                        .ok_or(CommandError::Usage("create <max_players> <bet_value> [password]"))?,
                )?;
                let password = tokens.next().map(parse_room_password).transpose()?;
                Ok(Command::Create {
                    max_players,
                    bet_value,
                    password,
                })
            }
            "join" => {
                let room_id = tokens
                    .next()
                    .ok_or(CommandError::Usage("join <room_id> [password]"))?;
                let password = tokens.next().map(parse_room_password).transpose()?;
                Ok(Command::Join {
                    room_id: room_id.to_string(),
                    password,
                })
            }
            "leave" => Ok(Command::Leave {
                room_id: tokens.next().map(str::to_string),
            }),
            "rooms" => Ok(Command::Rooms),
            "room" => Ok(Command::Room),
            "wallet" => Ok(Command::Wallet),
            "deposit" => {
                let amount = parse_number(
                    tokens
                        .next()
                        .ok_or(CommandError::Usage("deposit <amount> [user_id] [metadata-json]"))?,
                )?;

                // A third token opening a brace is the metadata payload; a
                // bare token is the user id, optionally followed by metadata.
                let mut user_id = None;
                let mut payload_start = 2;
                if let Some(token) = tokens.next() {
                    if !token.starts_with('{') {
                        user_id = Some(token.to_string());
                        payload_start = 3;
                    }
                }

                let metadata = payload_after_tokens(line, payload_start)
                    .map(|payload| {
                        serde_json::from_str(payload)
                            .map_err(|e| CommandError::InvalidJson(e.to_string()))
                    })
                    .transpose()?;

                Ok(Command::Deposit {
                    amount,
                    user_id,
                    metadata,
                })
            }
            "send" => {
                let namespace = tokens
                    .next()
                    .ok_or(CommandError::Usage("send <namespace> <event> <json>"))?
                    .to_string();
                let event = tokens
                    .next()
                    .ok_or(CommandError::Usage("send <namespace> <event> <json>"))?
                    .to_string();
                let payload = payload_after_tokens(line, 3)
                    .ok_or(CommandError::Usage("send <namespace> <event> <json>"))?;
                let data = serde_json::from_str(payload)
                    .map_err(|e| CommandError::InvalidJson(e.to_string()))?;
                Ok(Command::Send {
                    namespace,
                    event,
                    data,
                })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Parse a numeric argument
fn parse_number<T: std::str::FromStr>(token: &str) -> Result<T, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::InvalidNumber(token.to_string()))
}

/// Room passwords are 4-digit numbers, matching the backend's rule
fn parse_room_password(token: &str) -> Result<u16, CommandError> {
    let password: u16 = token.parse().map_err(|_| CommandError::InvalidPassword)?;
    if !(1000..=9999).contains(&password) {
        return Err(CommandError::InvalidPassword);
    }
    Ok(password)
}

/// The remainder of the line after `skip` whitespace-separated tokens
///
/// Keeps the payload verbatim so JSON strings with embedded spaces survive.
fn payload_after_tokens(line: &str, skip: usize) -> Option<&str> {
    let mut rest = line.trim_start();
    for _ in 0..skip {
        let idx = rest.find(char::is_whitespace)?;
        rest = rest[idx..].trim_start();
    }
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// One line per command, printed by `help`
pub const HELP_TEXT: &str = "\
Commands:
  login <username> <password> [--once]   log in and store the bearer token
  token <jwt>                            set the bearer token directly
  whoami                                 show identity claims from the token
  connect [url]                          open the WebSocket connection
  disconnect                             close the connection
  status                                 show the connection state
  create <max_players> <bet_value> [password]
                                         create a room (password makes it private)
  join <room_id> [password]              join a room
  leave [room_id]                        leave the current (or given) room
  rooms                                  list open rooms
  room                                   show the current room snapshot
  wallet                                 create the wallet balance
  deposit <amount> [user_id] [metadata-json]
                                         credit the wallet
  send <namespace> <event> <json>        send a custom request
  help                                   show this list
  quit                                   exit";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("help").unwrap(), Command::Help);
        assert_eq!(Command::parse("quit").unwrap(), Command::Quit);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
        assert_eq!(Command::parse("status").unwrap(), Command::Status);
        assert_eq!(Command::parse("rooms").unwrap(), Command::Rooms);
        assert_eq!(Command::parse("disconnect").unwrap(), Command::Disconnect);
    }

    #[test]
    fn test_parse_is_case_insensitive_on_keyword() {
        assert_eq!(Command::parse("HELP").unwrap(), Command::Help);
        assert_eq!(Command::parse("Connect").unwrap(), Command::Connect { url: None });
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(
            Command::parse("login john_doe1 Secret@123").unwrap(),
            Command::Login {
                username: "john_doe1".to_string(),
                password: "Secret@123".to_string(),
                remember_me: true,
            }
        );
        assert_eq!(
            Command::parse("login john_doe1 Secret@123 --once").unwrap(),
            Command::Login {
                username: "john_doe1".to_string(),
                password: "Secret@123".to_string(),
                remember_me: false,
            }
        );
    }

    #[test]
    fn test_parse_login_missing_arguments() {
        assert!(matches!(
            Command::parse("login john_doe1"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_connect_with_and_without_url() {
        assert_eq!(Command::parse("connect").unwrap(), Command::Connect { url: None });
        assert_eq!(
            Command::parse("connect ws://localhost:3003/ws").unwrap(),
            Command::Connect {
                url: Some("ws://localhost:3003/ws".to_string())
            }
        );
    }

    #[test]
    fn test_parse_create_public() {
        assert_eq!(
            Command::parse("create 4 1000").unwrap(),
            Command::Create {
                max_players: 4,
                bet_value: 1000.0,
                password: None,
            }
        );
    }

    #[test]
    fn test_parse_create_private() {
        assert_eq!(
            Command::parse("create 4 1000 1234").unwrap(),
            Command::Create {
                max_players: 4,
                bet_value: 1000.0,
                password: Some(1234),
            }
        );
    }

    #[test]
    fn test_parse_create_rejects_bad_password() {
        assert_eq!(
            Command::parse("create 4 1000 99"),
            Err(CommandError::InvalidPassword)
        );
        assert_eq!(
            Command::parse("create 4 1000 12345"),
            Err(CommandError::InvalidPassword)
        );
        assert_eq!(
            Command::parse("create 4 1000 abcd"),
            Err(CommandError::InvalidPassword)
        );
    }

    #[test]
    fn test_parse_create_rejects_bad_numbers() {
        assert!(matches!(
            Command::parse("create four 1000"),
            Err(CommandError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_parse_join_and_leave() {
        assert_eq!(
            Command::parse("join r-42 1234").unwrap(),
            Command::Join {
                room_id: "r-42".to_string(),
                password: Some(1234),
            }
        );
        assert_eq!(
            Command::parse("leave").unwrap(),
            Command::Leave { room_id: None }
        );
        assert_eq!(
            Command::parse("leave r-42").unwrap(),
            Command::Leave {
                room_id: Some("r-42".to_string())
            }
        );
    }

    #[test]
    fn test_parse_deposit() {
        assert_eq!(
            Command::parse("deposit 2.5").unwrap(),
            Command::Deposit {
                amount: 2.5,
                user_id: None,
                metadata: None,
            }
        );
        assert_eq!(
            Command::parse("deposit 1 u-7").unwrap(),
            Command::Deposit {
                amount: 1.0,
                user_id: Some("u-7".to_string()),
                metadata: None,
            }
        );
    }

    #[test]
    fn test_parse_deposit_with_metadata() {
        assert_eq!(
            Command::parse(r#"deposit 1 u-7 {"source": "console"}"#).unwrap(),
            Command::Deposit {
                amount: 1.0,
                user_id: Some("u-7".to_string()),
                metadata: Some(json!({ "source": "console" })),
            }
        );
        // Metadata without a user id
        assert_eq!(
            Command::parse(r#"deposit 1 {"source": "console"}"#).unwrap(),
            Command::Deposit {
                amount: 1.0,
                user_id: None,
                metadata: Some(json!({ "source": "console" })),
            }
        );
    }

    #[test]
    fn test_parse_deposit_rejects_invalid_metadata() {
        assert!(matches!(
            Command::parse("deposit 1 u-7 {oops"),
            Err(CommandError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_send_keeps_payload_verbatim() {
        let command = Command::parse(r#"send room custom_event {"note": "two  spaces"}"#).unwrap();
        assert_eq!(
            command,
            Command::Send {
                namespace: "room".to_string(),
                event: "custom_event".to_string(),
                data: json!({ "note": "two  spaces" }),
            }
        );
    }

    #[test]
    fn test_parse_send_rejects_invalid_json() {
        assert!(matches!(
            Command::parse("send room custom_event {not json}"),
            Err(CommandError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_send_requires_payload() {
        assert!(matches!(
            Command::parse("send room custom_event"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(matches!(
            Command::parse("frobnicate"),
            Err(CommandError::Unknown(_))
        ));
    }
}
