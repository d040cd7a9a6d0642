//! # Telemetry definitions
//!
//! The drone answers queries (and some commands) with short text datagrams. There is no
//! framing or tagging, so the kind of each message has to be inferred from its content:
//!
//! 1. All decimal digits - battery percentage (answer to `battery?`)
//! 2. Ends with `s` - flight time (answer to `time?`, e.g. `12s`)
//! 3. Anything else - free-form status text (`ok`, `error`, ...)
//!
//! The rules are applied in that order, the first match wins.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single classified telemetry message.
#[derive(Debug, Clone, PartialEq)]
pub enum TmMessage {
    /// Battery charge in percent.
    Battery(u8),

    /// Flight time.
    FlightTime(FlightTime),

    /// Any other response, for instance `ok` or `error`.
    Status(String),
}

/// Flight time reported by the drone.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightTime {
    /// The numeric prefix could be parsed, units are seconds.
    Seconds(f64),

    /// The message ended in `s` but the prefix wasn't numeric, the raw text is kept.
    Raw(String),
}

/// Errors which can occur while decoding a telemetry datagram.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TmParseError {
    #[error("The datagram is not valid UTF-8")]
    NonUtf8,

    #[error("The datagram is empty")]
    Empty,

    #[error("Battery value \"{0}\" is not a valid percentage")]
    InvalidBattery(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmMessage {
    /// Decode and classify a raw datagram.
    pub fn from_datagram(data: &[u8]) -> Result<Self, TmParseError> {
        let text = std::str::from_utf8(data).map_err(|_| TmParseError::NonUtf8)?;

        Self::classify(text)
    }

    /// Classify a decoded response. Surrounding whitespace is ignored.
    pub fn classify(text: &str) -> Result<Self, TmParseError> {
        let resp = text.trim();

        if resp.is_empty() {
            return Err(TmParseError::Empty);
        }

        // Battery
        if resp.chars().all(|c| c.is_ascii_digit()) {
            return match resp.parse::<u8>() {
                Ok(b) if b <= 100 => Ok(TmMessage::Battery(b)),
                _ => Err(TmParseError::InvalidBattery(resp.into())),
            };
        }

        // Flight time
        if let Some(prefix) = resp.strip_suffix('s') {
            let time = match prefix.trim().parse::<f64>() {
                Ok(s) if s.is_finite() => FlightTime::Seconds(s),
                _ => FlightTime::Raw(resp.into()),
            };
            return Ok(TmMessage::FlightTime(time));
        }

        Ok(TmMessage::Status(resp.into()))
    }
}

impl fmt::Display for FlightTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightTime::Seconds(s) => write!(f, "{}s", s),
            FlightTime::Raw(r) => write!(f, "{}", r),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(TmMessage::classify("87"), Ok(TmMessage::Battery(87)));
        assert_eq!(TmMessage::classify(" 100\r\n"), Ok(TmMessage::Battery(100)));
        assert_eq!(
            TmMessage::classify("12s"),
            Ok(TmMessage::FlightTime(FlightTime::Seconds(12.0)))
        );
        assert_eq!(TmMessage::classify("ok"), Ok(TmMessage::Status("ok".into())));
        assert_eq!(TmMessage::classify("error"), Ok(TmMessage::Status("error".into())));
    }

    #[test]
    fn test_classify_edge_cases() {
        // Ends in 's' but isn't a number, raw text is kept
        assert_eq!(
            TmMessage::classify("unknown commands"),
            Ok(TmMessage::FlightTime(FlightTime::Raw("unknown commands".into())))
        );

        // Digits first wins over the trailing 's' rule, which can't apply here anyway
        assert_eq!(TmMessage::classify("0"), Ok(TmMessage::Battery(0)));

        assert_eq!(TmMessage::classify("   "), Err(TmParseError::Empty));
        assert_eq!(
            TmMessage::classify("300"),
            Err(TmParseError::InvalidBattery("300".into()))
        );
        assert_eq!(
            TmMessage::classify("99999999999"),
            Err(TmParseError::InvalidBattery("99999999999".into()))
        );
    }

    #[test]
    fn test_from_datagram() {
        assert_eq!(TmMessage::from_datagram(b"55\r\n"), Ok(TmMessage::Battery(55)));
        assert_eq!(
            TmMessage::from_datagram(&[0xff, 0xfe, 0x00]),
            Err(TmParseError::NonUtf8)
        );
    }
}
