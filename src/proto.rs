//! Inbound line classification.
//!
//! A raw line becomes a [`Command`] by its leading token, matched
//! case-insensitively. Unknown tokens parse to `Ok(None)` and are dropped
//! without comment; a recognized token missing a required argument is a
//! [`ParseError`] so the dispatcher can log what was wrong.

use crate::error::ParseError;

/// The command subset understood by the dispatcher.
///
/// `WelcomeMsg` and `Motd` are synthesized into a session's inbound queue
/// right after registration; everything else arrives off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Privmsg { target: String, text: String },
    WelcomeMsg,
    Join { channel: String },
    Topic { channel: String, text: Option<String> },
    Who { channel: String },
    Names { channel: String },
    Ping { token: String },
    Quit { reason: Option<String> },
    Motd,
    Part { channel: String },
    Nick { nick: String },
}

impl Command {
    /// Classify one protocol line.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            return Ok(None);
        };

        let command = match head.to_ascii_uppercase().as_str() {
            "PRIVMSG" => {
                let target = tokens.next().ok_or(ParseError::MissingTarget)?.to_string();
                let text = line
                    .find(':')
                    .map(|at| line[at + 1..].to_string())
                    .ok_or(ParseError::MissingBody)?;
                Command::Privmsg { target, text }
            }
            "WELCOMEMSG" => Command::WelcomeMsg,
            "JOIN" => Command::Join {
                channel: channel_arg(line, "JOIN")?,
            },
            "PART" => Command::Part {
                channel: channel_arg(line, "PART")?,
            },
            "NAMES" => Command::Names {
                channel: channel_arg(line, "NAMES")?,
            },
            "WHO" => Command::Who {
                channel: channel_arg(line, "WHO")?,
            },
            "TOPIC" => {
                let channel = tokens
                    .next()
                    .ok_or(ParseError::MissingChannel("TOPIC"))?
                    .to_string();
                // Topic text keeps the original's token-join, which leaves a
                // trailing space on every stored topic.
                let text: String = tokens.map(|word| format!("{word} ")).collect();
                Command::Topic {
                    channel,
                    text: if text.is_empty() { None } else { Some(text) },
                }
            }
            "PING" => {
                let (_, token) = line.split_once(' ').ok_or(ParseError::MissingToken)?;
                Command::Ping {
                    token: token.to_string(),
                }
            }
            "QUIT" => Command::Quit {
                // The reason starts at the first colon, if any.
                reason: match line.find(':') {
                    Some(at) if at > 0 => Some(line[at + 1..].to_string()),
                    _ => None,
                },
            },
            "MOTD" => Command::Motd,
            "NICK" => {
                // Some clients prefix the new nick with a colon, some don't.
                let nick = tokens
                    .next()
                    .ok_or(ParseError::MissingNick)?
                    .replace(':', "");
                if nick.is_empty() {
                    return Err(ParseError::MissingNick);
                }
                Command::Nick { nick }
            }
            _ => return Ok(None),
        };

        Ok(Some(command))
    }
}

/// The channel argument starts at the first `#` and runs to end of line.
fn channel_arg(line: &str, command: &'static str) -> Result<String, ParseError> {
    let at = line.find('#').ok_or(ParseError::MissingChannel(command))?;
    Ok(line[at..].trim().to_string())
}
