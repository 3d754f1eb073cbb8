//! Structural validation of identifier strings.
//!
//! Clients only need to reject strings that cannot possibly be identifiers;
//! historical grammar quirks (old user-id character sets, room versions) are
//! the server's problem. Validation here is sigil + delimiter structure.

use crate::error::IdParseError;

fn validate_sigil_and_server(s: &str, sigil: u8) -> Result<(), IdParseError> {
    if s.is_empty() {
        return Err(IdParseError::Empty);
    }
    if s.as_bytes()[0] != sigil {
        return Err(IdParseError::MissingLeadingSigil);
    }
    // Localpart may itself contain a colon; the server name follows the
    // first one.
    match s[1..].split_once(':') {
        Some((localpart, server)) if !localpart.is_empty() && !server.is_empty() => Ok(()),
        _ => Err(IdParseError::MissingDelimiter),
    }
}

fn validate_sigil_only(s: &str, sigil: u8) -> Result<(), IdParseError> {
    if s.is_empty() {
        return Err(IdParseError::Empty);
    }
    if s.as_bytes()[0] != sigil {
        return Err(IdParseError::MissingLeadingSigil);
    }
    if s.len() == 1 {
        return Err(IdParseError::Empty);
    }
    Ok(())
}

pub fn user_id(s: &str) -> Result<(), IdParseError> {
    validate_sigil_and_server(s, b'@')
}

pub fn room_id(s: &str) -> Result<(), IdParseError> {
    validate_sigil_and_server(s, b'!')
}

/// Event IDs are fully opaque since room version 3; only the sigil is
/// structural.
pub fn event_id(s: &str) -> Result<(), IdParseError> {
    validate_sigil_only(s, b'$')
}

pub fn room_alias_id(s: &str) -> Result<(), IdParseError> {
    validate_sigil_and_server(s, b'#')
}

pub fn room_or_alias_id(s: &str) -> Result<(), IdParseError> {
    match s.as_bytes().first() {
        Some(b'!') => room_id(s),
        Some(b'#') => room_alias_id(s),
        Some(_) => Err(IdParseError::MissingLeadingSigil),
        None => Err(IdParseError::Empty),
    }
}

pub fn server_name(s: &str) -> Result<(), IdParseError> {
    if s.is_empty() {
        return Err(IdParseError::Empty);
    }
    // Hostname, optionally followed by a port. No whitespace, no path.
    if s.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(IdParseError::InvalidCharacters);
    }
    Ok(())
}

pub fn device_id(s: &str) -> Result<(), IdParseError> {
    if s.is_empty() {
        return Err(IdParseError::Empty);
    }
    Ok(())
}
