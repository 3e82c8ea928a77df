//! Post-parse access validation.
//!
//! Kept separate from parsing so callers can swap their own policy in: the
//! same table works for a single named input (e.g. a shortcut bound to one
//! button) or a whole parsed sequence.

use crate::input::InputSequence;
use std::collections::HashMap;
use thiserror::Error;

/// Minimum access level required per input name. Unlisted inputs require
/// level 0, i.e. anyone may use them.
#[derive(Debug, Clone, Default)]
pub struct AccessTable {
    levels: HashMap<String, u32>,
}

impl AccessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            levels: levels
                .into_iter()
                .map(|(name, level)| (name.into().to_lowercase(), level))
                .collect(),
        }
    }

    pub fn set_level(&mut self, input: impl Into<String>, level: u32) {
        self.levels.insert(input.into().to_lowercase(), level);
    }

    pub fn required_level(&self, input: &str) -> u32 {
        self.levels.get(input).copied().unwrap_or(0)
    }
}

/// A caller tried to use an input above their level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("input \"{input}\" requires access level {required} (caller has level {caller})")]
pub struct AccessError {
    pub input: String,
    pub required: u32,
    pub caller: u32,
}

/// Check a single named input against the caller's level.
pub fn check_input(caller_level: u32, input: &str, table: &AccessTable) -> Result<(), AccessError> {
    let required = table.required_level(input);
    if caller_level < required {
        return Err(AccessError {
            input: input.to_string(),
            required,
            caller: caller_level,
        });
    }
    Ok(())
}

/// Check every input in every group, short-circuiting on the first one the
/// caller may not use. Does not mutate the sequence.
pub fn check_sequence(
    caller_level: u32,
    sequence: &InputSequence,
    table: &AccessTable,
) -> Result<(), AccessError> {
    for input in sequence.groups.iter().flatten() {
        check_input(caller_level, &input.name, table)?;
    }
    Ok(())
}
