//! Parsed input data types.

use std::fmt;
use thiserror::Error;

/// One parsed input token.
///
/// `percent` is only meaningful for axis-type inputs; buttons ignore it.
/// `hold` and `release` are mutually exclusive by grammar construction
/// (a token carries at most one of `_` and `-`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    /// Input name, one of the console's valid inputs.
    pub name: String,
    /// `_` prefix: keep pressed past the duration window.
    pub hold: bool,
    /// `-` prefix: release instead of press.
    pub release: bool,
    /// Axis scale, 0-100.
    pub percent: u8,
    /// How long the input stays pressed.
    pub duration_ms: u64,
    /// Zero-based controller port.
    pub port: u8,
}

impl fmt::Display for ParsedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}ms", self.name, self.duration_ms)?;
        if self.percent != 100 {
            write!(f, " {}%", self.percent)?;
        }
        if self.hold {
            write!(f, " hold")?;
        }
        if self.release {
            write!(f, " release")?;
        }
        write!(f, " port {}", self.port)
    }
}

/// A fully parsed input sequence.
///
/// The outer order of `groups` is sequence-over-time; each inner group is a
/// `+`-joined cluster pressed together. `total_duration_ms` is the sum over
/// groups of each group's longest member duration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputSequence {
    pub groups: Vec<Vec<ParsedInput>>,
    pub total_duration_ms: u64,
}

impl InputSequence {
    /// Total number of inputs across all groups.
    pub fn input_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// Outcome of parsing one message.
///
/// `NotACommand` means the text does not look like a command at all and
/// should be treated as an ordinary message, not an error. `Invalid` means
/// the text structurally matched the grammar but carried a broken
/// refinement (bad percentage, trailing `+`, over-long duration, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Valid(InputSequence),
    NotACommand,
    Invalid(InvalidInput),
}

impl Parsed {
    pub fn is_valid(&self) -> bool {
        matches!(self, Parsed::Valid(_))
    }
}

/// Why a command-like message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("invalid percentage in \"{token}\" (must be 0-100)")]
    Percent { token: String },

    #[error("invalid duration in \"{token}\"")]
    Duration { token: String },

    #[error("invalid controller port in \"{token}\"")]
    Port { token: String },

    #[error("'+' at the end of an input sequence")]
    PlusAtEnd,

    #[error("input sequence exceeds the maximum duration of {max_ms}ms")]
    MaxDuration { max_ms: u64 },

    #[error("missing input name in \"{token}\"")]
    MissingName { token: String },
}
