//! Replay script parsing.
//!
//! One event per line, whitespace separated:
//!
//! ```text
//! # comment
//! enable <target>
//! disable
//! edge <from_addr> <from_size> <to_addr> <to_size>
//! net <kind> <src_addr> <dst_addr> <num_bytes>
//! packet <in|out> <old_buf_addr> <hex bytes>
//! ```
//!
//! Numbers are decimal or `0x`-prefixed hex.

use edgecov_core::{Edge, Location};

use super::error::ScriptError;
use crate::diagnostics::{Direction, NetTransfer, Packet};

/// One replayed host event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptEvent {
    Enable(String),
    Disable,
    Edge(Edge),
    NetTransfer(NetTransfer),
    Packet(Packet),
}

/// Parse a decimal or `0x`-prefixed hex number.
///
/// # Errors
///
/// Returns `ScriptError::InvalidNumber` on anything else.
pub fn parse_number(text: &str) -> Result<u64, ScriptError> {
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| ScriptError::InvalidNumber(text.to_string()))
}

fn parse_payload(text: &str) -> Result<Vec<u8>, ScriptError> {
    let invalid = || ScriptError::InvalidPayload(text.to_string());
    if text.len() % 2 != 0 || !text.is_ascii() {
        return Err(invalid());
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(|_| invalid()))
        .collect()
}

fn expect_args(
    command: &'static str,
    args: &[&str],
    expected: usize,
) -> Result<(), ScriptError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ScriptError::ArgumentCount {
            command,
            expected,
            actual: args.len(),
        })
    }
}

impl ScriptEvent {
    /// Parse one script line. Blank lines and comments yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a `ScriptError` describing the first problem on the line.
    pub fn parse(line: &str) -> Result<Option<Self>, ScriptError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let event = match command {
            "enable" => {
                expect_args("enable", &args, 1)?;
                Self::Enable(args[0].to_string())
            }
            "disable" => {
                expect_args("disable", &args, 0)?;
                Self::Disable
            }
            "edge" => {
                expect_args("edge", &args, 4)?;
                Self::Edge(Edge::new(
                    Location::new(parse_number(args[0])?, parse_number(args[1])?),
                    Location::new(parse_number(args[2])?, parse_number(args[3])?),
                ))
            }
            "net" => {
                expect_args("net", &args, 4)?;
                let kind = parse_number(args[0])?;
                let num_bytes = parse_number(args[3])?;
                Self::NetTransfer(NetTransfer {
                    kind: u32::try_from(kind)
                        .map_err(|_| ScriptError::InvalidNumber(args[0].to_string()))?,
                    src_addr: parse_number(args[1])?,
                    dst_addr: parse_number(args[2])?,
                    num_bytes: usize::try_from(num_bytes)
                        .map_err(|_| ScriptError::InvalidNumber(args[3].to_string()))?,
                })
            }
            "packet" => {
                expect_args("packet", &args, 3)?;
                let direction = match args[0] {
                    "in" => Direction::Incoming,
                    "out" => Direction::Outgoing,
                    other => return Err(ScriptError::InvalidDirection(other.to_string())),
                };
                Self::Packet(Packet {
                    direction,
                    old_buf_addr: parse_number(args[1])?,
                    bytes: parse_payload(args[2])?,
                })
            }
            other => return Err(ScriptError::UnknownCommand(other.to_string())),
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Ok(42));
        assert_eq!(parse_number("0x2A0"), Ok(0x2a0));
        assert_eq!(parse_number("0XfF"), Ok(0xff));
        assert!(parse_number("0x").is_err());
        assert!(parse_number("-1").is_err());
    }

    #[test]
    fn test_parse_edge() {
        let event = ScriptEvent::parse("  edge 0x1f 4 0x2a0 2  ").unwrap();
        assert_eq!(
            event,
            Some(ScriptEvent::Edge(Edge::new(
                Location::new(0x1f, 4),
                Location::new(0x2a0, 2)
            )))
        );
    }

    #[test]
    fn test_parse_admin_commands() {
        assert_eq!(
            ScriptEvent::parse("enable out/edges.csv").unwrap(),
            Some(ScriptEvent::Enable("out/edges.csv".to_string()))
        );
        assert_eq!(ScriptEvent::parse("disable").unwrap(), Some(ScriptEvent::Disable));
        assert_eq!(ScriptEvent::parse("# note").unwrap(), None);
        assert_eq!(ScriptEvent::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_packet() {
        let event = ScriptEvent::parse("packet in 0x8000 48690a").unwrap();
        assert_eq!(
            event,
            Some(ScriptEvent::Packet(Packet {
                direction: Direction::Incoming,
                old_buf_addr: 0x8000,
                bytes: b"Hi\n".to_vec(),
            }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ScriptEvent::parse("jump 1 2"),
            Err(ScriptError::UnknownCommand("jump".to_string()))
        );
        assert_eq!(
            ScriptEvent::parse("edge 1 2 3"),
            Err(ScriptError::ArgumentCount {
                command: "edge",
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            ScriptEvent::parse("packet sideways 0 00"),
            Err(ScriptError::InvalidDirection("sideways".to_string()))
        );
        assert_eq!(
            ScriptEvent::parse("packet out 0 abc"),
            Err(ScriptError::InvalidPayload("abc".to_string()))
        );
        assert_eq!(
            ScriptEvent::parse("net 0x100000000 0 0 1"),
            Err(ScriptError::InvalidNumber("0x100000000".to_string()))
        );
    }
}
