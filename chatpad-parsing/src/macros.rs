//! Macro and synonym tables.
//!
//! Both tables are read by many concurrent parses and written rarely by an
//! external management layer, so reads take a snapshot under a short lock
//! (copy-on-read). A parse that races a concurrent edit sees either the old
//! or the new definition, never a torn one.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Errors from defining a macro.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroDefError {
    #[error("macro name \"{0}\" must start with '#' followed by letters or digits")]
    InvalidName(String),

    #[error("macro arity marker in \"{0}\" must look like (*), (*,*), ...")]
    InvalidArityMarker(String),
}

/// Key for a stored macro: lowercase name (with leading `#`) plus arity.
///
/// Keying on arity makes parameterized lookup explicit: `#mash(*)` and
/// `#mash(*,*)` are distinct macros, and a same-name collision across
/// arities is impossible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacroKey {
    pub name: String,
    pub arity: usize,
}

impl MacroKey {
    /// Parse a macro name spec such as `#jump` or `#mash(*,*)`.
    pub fn parse(spec: &str) -> Result<Self, MacroDefError> {
        let spec = spec.trim().to_lowercase();

        let (name, marker) = match spec.find('(') {
            Some(open) => (&spec[..open], Some(&spec[open..])),
            None => (spec.as_str(), None),
        };

        let body = name
            .strip_prefix('#')
            .ok_or_else(|| MacroDefError::InvalidName(spec.clone()))?;
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MacroDefError::InvalidName(spec.clone()));
        }

        let arity = match marker {
            None => 0,
            Some(marker) => {
                let inner = marker
                    .strip_prefix('(')
                    .and_then(|m| m.strip_suffix(')'))
                    .ok_or_else(|| MacroDefError::InvalidArityMarker(spec.clone()))?;
                let slots: Vec<&str> = inner.split(',').collect();
                if slots.iter().any(|s| s.trim() != "*") {
                    return Err(MacroDefError::InvalidArityMarker(spec.clone()));
                }
                slots.len()
            }
        };

        Ok(Self {
            name: name.to_string(),
            arity,
        })
    }
}

impl fmt::Display for MacroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.arity > 0 {
            let slots = vec!["*"; self.arity].join(",");
            write!(f, "({slots})")?;
        }
        Ok(())
    }
}

/// Snapshot of the macro table taken at expansion time.
pub type MacroSnapshot = HashMap<MacroKey, String>;

/// Mapping from macro name (optionally parameterized) to a template string
/// containing positional placeholders (`<0>`, `<1>`, ...).
#[derive(Debug, Default)]
pub struct MacroTable {
    inner: RwLock<MacroSnapshot>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name_spec, template)` pairs.
    pub fn from_defs<I, S, T>(defs: I) -> Result<Self, MacroDefError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: Into<String>,
    {
        let table = Self::new();
        for (spec, template) in defs {
            table.insert(spec.as_ref(), template)?;
        }
        Ok(table)
    }

    /// Add or replace a macro. Returns an error only for a malformed name
    /// spec; replacing an existing definition is fine.
    pub fn insert(&self, spec: &str, template: impl Into<String>) -> Result<(), MacroDefError> {
        let key = MacroKey::parse(spec)?;
        self.inner.write().insert(key, template.into());
        Ok(())
    }

    /// Remove a macro. Returns whether it existed.
    pub fn remove(&self, spec: &str) -> Result<bool, MacroDefError> {
        let key = MacroKey::parse(spec)?;
        Ok(self.inner.write().remove(&key).is_some())
    }

    /// Copy-on-read snapshot for one expansion run.
    pub fn snapshot(&self) -> MacroSnapshot {
        self.inner.read().clone()
    }

    /// All definitions, sorted by name then arity, for display.
    pub fn entries(&self) -> Vec<(MacroKey, String)> {
        let mut entries: Vec<_> = self
            .inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Simple string-to-string replacements, scoped per console.
///
/// Kept in a `BTreeMap` so replacement order is deterministic.
#[derive(Debug, Default)]
pub struct SynonymTable {
    inner: RwLock<BTreeMap<String, String>>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let table = Self::new();
        for (from, to) in pairs {
            table.insert(from, to);
        }
        table
    }

    pub fn insert(&self, from: impl Into<String>, to: impl Into<String>) {
        self.inner
            .write()
            .insert(from.into().to_lowercase(), to.into().to_lowercase());
    }

    pub fn remove(&self, from: &str) -> bool {
        self.inner.write().remove(&from.to_lowercase()).is_some()
    }

    /// Copy-on-read snapshot, in deterministic (lexical) order.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_name() {
        let key = MacroKey::parse("#jump").unwrap();
        assert_eq!(key.name, "#jump");
        assert_eq!(key.arity, 0);
    }

    #[test]
    fn parse_parameterized_name() {
        let key = MacroKey::parse("#mashalt(*,*)").unwrap();
        assert_eq!(key.name, "#mashalt");
        assert_eq!(key.arity, 2);
    }

    #[test]
    fn parse_lowercases() {
        let key = MacroKey::parse("#Jump").unwrap();
        assert_eq!(key.name, "#jump");
    }

    #[test]
    fn reject_missing_sigil() {
        assert!(matches!(
            MacroKey::parse("jump"),
            Err(MacroDefError::InvalidName(_))
        ));
    }

    #[test]
    fn reject_bad_arity_marker() {
        assert!(matches!(
            MacroKey::parse("#mash(a)"),
            Err(MacroDefError::InvalidArityMarker(_))
        ));
        assert!(matches!(
            MacroKey::parse("#mash("),
            Err(MacroDefError::InvalidArityMarker(_))
        ));
    }

    #[test]
    fn same_name_different_arity_coexist() {
        let table = MacroTable::new();
        table.insert("#mash(*)", "[<0>17ms#17ms]*5").unwrap();
        table.insert("#mash(*,*)", "<0>17ms<1>17ms").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn display_roundtrip() {
        for spec in ["#jump", "#mash(*)", "#mashalt(*,*)"] {
            let key = MacroKey::parse(spec).unwrap();
            assert_eq!(key.to_string(), spec);
        }
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let table = MacroTable::new();
        table.insert("#jump", "left300ms y").unwrap();
        let snapshot = table.snapshot();
        table.remove("#jump").unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn synonyms_iterate_deterministically() {
        let table = SynonymTable::from_pairs([("zb", "b"), ("za", "a")]);
        let snapshot = table.snapshot();
        assert_eq!(snapshot[0].0, "za");
        assert_eq!(snapshot[1].0, "zb");
    }
}
