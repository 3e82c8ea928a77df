//! Grammar-driven sequence parser.
//!
//! The parser walks every non-overlapping grammar match over the message in
//! order. A message with no matches, a gap between matches, or unmatched
//! trailing text is not a command at all (`NotACommand`); that is how real
//! commands are told apart from prose that merely contains letters matching
//! input names. Once a token has structurally matched, malformed refinements
//! (percent out of range, `+` at the end, over-long totals) are deliberate
//! but broken commands and yield `Invalid` instead.

use crate::grammar::InputGrammar;
use crate::input::{InputSequence, InvalidInput, Parsed, ParsedInput};

/// Options controlling one parse run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Controller port assigned to tokens without a `&<digits>` prefix.
    pub default_port: u8,
    /// Duration assigned to tokens without an explicit one.
    pub default_duration_ms: u64,
    /// Whether to enforce `max_duration_ms`.
    pub check_max_duration: bool,
    /// Maximum allowed total sequence duration.
    pub max_duration_ms: u64,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            default_port: 0,
            default_duration_ms: 200,
            check_max_duration: true,
            max_duration_ms: 60_000,
        }
    }
}

/// Parse a preprocessed message into an input sequence.
///
/// Deterministic given the same message, grammar, and options. The message
/// is whitespace-stripped and lowercased here as well, so callers that skip
/// preprocessing (no macros or synonyms configured) get the same result.
pub fn parse(message: &str, grammar: &InputGrammar, options: &ParserOptions) -> Parsed {
    let message: String = message
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if message.is_empty() {
        return Parsed::NotACommand;
    }

    let mut groups: Vec<Vec<ParsedInput>> = Vec::new();
    let mut current_group: Vec<ParsedInput> = Vec::new();
    let mut group_max_ms: u64 = 0;
    let mut total_ms: u64 = 0;
    let mut prev_end = 0usize;

    let mut matches = grammar.pattern().captures_iter(&message).peekable();
    if matches.peek().is_none() {
        return Parsed::NotACommand;
    }

    while let Some(caps) = matches.next() {
        let Some(whole) = caps.get(0) else {
            return Parsed::NotACommand;
        };

        // Untokenizable text between matches: an ordinary message.
        if whole.start() != prev_end {
            return Parsed::NotACommand;
        }
        prev_end = whole.end();
        let token = whole.as_str();

        let port = match caps.name("port") {
            Some(m) => match m.as_str().parse::<u8>() {
                Ok(port) => port,
                Err(_) => {
                    return Parsed::Invalid(InvalidInput::Port {
                        token: token.to_string(),
                    })
                }
            },
            None => options.default_port,
        };

        let (hold, release) = match caps.name("prefix").map(|m| m.as_str()) {
            Some("_") => (true, false),
            Some("-") => (false, true),
            _ => (false, false),
        };

        let name = match caps.name("name") {
            Some(m) if !m.as_str().is_empty() => m.as_str().to_string(),
            _ => {
                return Parsed::Invalid(InvalidInput::MissingName {
                    token: token.to_string(),
                })
            }
        };

        let percent = match caps.name("percent") {
            Some(m) => match m.as_str().parse::<u8>() {
                Ok(percent) if percent <= 100 => percent,
                _ => {
                    return Parsed::Invalid(InvalidInput::Percent {
                        token: token.to_string(),
                    })
                }
            },
            None => 100,
        };

        let duration_ms = if let Some(m) = caps.name("ms") {
            match m.as_str().parse::<u64>() {
                Ok(ms) => ms,
                Err(_) => {
                    return Parsed::Invalid(InvalidInput::Duration {
                        token: token.to_string(),
                    })
                }
            }
        } else if let Some(m) = caps.name("sec") {
            match m.as_str().parse::<u64>().ok().and_then(|s| s.checked_mul(1000)) {
                Some(ms) => ms,
                None => {
                    return Parsed::Invalid(InvalidInput::Duration {
                        token: token.to_string(),
                    })
                }
            }
        } else {
            options.default_duration_ms
        };

        let joins_next = caps.name("plus").is_some();

        group_max_ms = group_max_ms.max(duration_ms);
        current_group.push(ParsedInput {
            name,
            hold,
            release,
            percent,
            duration_ms,
            port,
        });

        if joins_next {
            if matches.peek().is_none() {
                return Parsed::Invalid(InvalidInput::PlusAtEnd);
            }
            continue;
        }

        // A token without a trailing '+' closes the simultaneous group.
        groups.push(std::mem::take(&mut current_group));
        total_ms = total_ms.saturating_add(group_max_ms);
        group_max_ms = 0;

        // Fast-fail so pathological input is bounded cheaply.
        if options.check_max_duration && total_ms > options.max_duration_ms {
            return Parsed::Invalid(InvalidInput::MaxDuration {
                max_ms: options.max_duration_ms,
            });
        }
    }

    // Matched tokens must cover the whole message.
    if prev_end != message.len() {
        return Parsed::NotACommand;
    }

    Parsed::Valid(InputSequence {
        groups,
        total_duration_ms: total_ms,
    })
}
