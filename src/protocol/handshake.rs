//! Peripheral handshake
//!
//! The first line a peripheral sends after connecting names it:
//!
//! ```text
//! Peripheral                               Host
//!   |                                        |
//!   |------- IAM:<name>\n ----------------->|  register <name>
//!   |------- <tag>:<payload>\n ------------>|  ControlEvent
//!   |<------ <command>\n -------------------|  OutboundSender
//! ```
//!
//! There is no reply to the handshake. A connection that never sends a valid
//! `IAM:` line stays unnamed and all of its lines are dropped.

use crate::error::ProtocolError;
use crate::protocol::constants::{TAG_IAM, TAG_SEPARATOR};

/// Parse a handshake line, returning the peripheral name
pub fn parse_handshake(line: &str) -> Result<&str, ProtocolError> {
    let line = line.trim();

    let name = line
        .strip_prefix(TAG_IAM)
        .and_then(|rest| rest.strip_prefix(TAG_SEPARATOR))
        .ok_or_else(|| ProtocolError::MissingHandshake(line.to_string()))?
        .trim();

    if name.is_empty() {
        return Err(ProtocolError::EmptyName);
    }

    Ok(name)
}

/// Check whether a line looks like a handshake without validating the name
pub fn is_handshake(line: &str) -> bool {
    line.trim_start()
        .strip_prefix(TAG_IAM)
        .is_some_and(|rest| rest.starts_with(TAG_SEPARATOR))
}

/// Build the handshake line a peripheral sends
pub fn handshake_line(name: &str) -> String {
    format!("{TAG_IAM}{TAG_SEPARATOR}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handshake() {
        assert_eq!(parse_handshake("IAM:BUTTON"), Ok("BUTTON"));
        assert_eq!(parse_handshake("IAM:ULTRASONIC\r"), Ok("ULTRASONIC"));
        assert_eq!(parse_handshake("  IAM: CAMERA "), Ok("CAMERA"));
    }

    #[test]
    fn test_parse_handshake_rejects_other_lines() {
        assert!(matches!(
            parse_handshake("BUTTON:PRESSED"),
            Err(ProtocolError::MissingHandshake(_))
        ));
        assert!(matches!(
            parse_handshake("IAMBUTTON"),
            Err(ProtocolError::MissingHandshake(_))
        ));
    }

    #[test]
    fn test_parse_handshake_empty_name() {
        assert_eq!(parse_handshake("IAM:"), Err(ProtocolError::EmptyName));
        assert_eq!(parse_handshake("IAM:   "), Err(ProtocolError::EmptyName));
    }

    #[test]
    fn test_is_handshake() {
        assert!(is_handshake("IAM:X"));
        assert!(is_handshake("IAM:"));
        assert!(!is_handshake("ULTRASONIC:IAM:X"));
    }

    #[test]
    fn test_handshake_line_parses_back() {
        let line = handshake_line("BUTTON");
        assert_eq!(line, "IAM:BUTTON");
        assert_eq!(parse_handshake(&line), Ok("BUTTON"));
    }
}
