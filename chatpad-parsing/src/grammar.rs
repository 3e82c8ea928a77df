//! Grammar construction for a console's input token language.
//!
//! A console's grammar is a single compiled pattern recognizing one input
//! token: optional `&<digits>` controller-port prefix, optional `_`/`-`
//! hold/release modifier, exactly one input name, optional `<digits>%`
//! percentage, optional `<digits>ms`/`<digits>s` duration, and an optional
//! trailing `+` joining the token to the next one.
//!
//! Input names are alternated longest-first so that e.g. `ls1` wins over a
//! console that also defines `l`. The pattern is rebuilt only when the
//! active console changes and is otherwise reused as immutable state.

use regex::Regex;
use thiserror::Error;

/// Errors from building a console grammar.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("console has no valid inputs")]
    NoInputs,

    #[error("failed to compile input pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled token pattern for one console.
#[derive(Debug, Clone)]
pub struct InputGrammar {
    pattern: Regex,
}

impl InputGrammar {
    /// Build the grammar for a set of valid input names.
    ///
    /// Names are matched case-insensitively by lowercasing both the names
    /// and (in the parser) the message.
    pub fn build<S: AsRef<str>>(valid_inputs: &[S]) -> Result<Self, GrammarError> {
        if valid_inputs.is_empty() {
            return Err(GrammarError::NoInputs);
        }

        let mut names: Vec<String> = valid_inputs
            .iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();
        // Longest first so the alternation prefers the longest match;
        // the lexical tie-break keeps the pattern deterministic.
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();

        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(
            r"(?:&(?P<port>\d+))?(?P<prefix>[_-])?(?P<name>{alternation})(?:(?P<percent>\d+)%)?(?:(?P<ms>\d+)ms|(?P<sec>\d+)s)?(?P<plus>\+)?"
        );

        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// The compiled token pattern.
    pub(crate) fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_set_is_an_error() {
        let names: [&str; 0] = [];
        assert!(matches!(
            InputGrammar::build(&names),
            Err(GrammarError::NoInputs)
        ));
    }

    #[test]
    fn longest_name_wins() {
        let grammar = InputGrammar::build(&["l", "ls1"]).unwrap();
        let m = grammar.pattern().find("ls1").unwrap();
        assert_eq!(m.as_str(), "ls1");
    }

    #[test]
    fn names_with_regex_metacharacters_are_escaped() {
        let grammar = InputGrammar::build(&["#", ".", "a"]).unwrap();
        // "." must only match a literal dot, not any character.
        let m = grammar.pattern().find("x").map(|m| m.as_str().to_string());
        assert_eq!(m, None);
        let m = grammar.pattern().find(".").unwrap();
        assert_eq!(m.as_str(), ".");
    }

    #[test]
    fn full_token_shape_matches() {
        let grammar = InputGrammar::build(&["a", "b"]).unwrap();
        let caps = grammar.pattern().captures("&2_a50%300ms+").unwrap();
        assert_eq!(&caps["port"], "2");
        assert_eq!(&caps["prefix"], "_");
        assert_eq!(&caps["name"], "a");
        assert_eq!(&caps["percent"], "50");
        assert_eq!(&caps["ms"], "300");
        assert!(caps.name("plus").is_some());
    }

    #[test]
    fn seconds_duration_is_a_separate_capture() {
        let grammar = InputGrammar::build(&["a"]).unwrap();
        let caps = grammar.pattern().captures("a2s").unwrap();
        assert!(caps.name("ms").is_none());
        assert_eq!(&caps["sec"], "2");
    }
}
