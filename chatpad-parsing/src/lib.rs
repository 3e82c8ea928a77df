//! Input command language for text-driven game controllers
//!
//! This crate turns untrusted text such as `_a300ms+b50%500ms #17ms` into
//! structured, timed input sequences:
//!
//! - Preprocessing: `[seq]*N` repetition expansion, recursive macro
//!   substitution (`#jump`, `#mash(a)`), and per-console synonyms
//! - Grammar building: one compiled token pattern per console, derived from
//!   the console's valid input names
//! - Sequence parsing: simultaneous (`+`-joined) groups with per-input
//!   hold/release modifiers, percentages, durations, and controller ports
//! - Post-validation: per-input access levels
//!
//! Parsing is pure and deterministic given the same table snapshots; the
//! execution side lives in `chatpad-controller`.

pub mod grammar;
pub mod input;
pub mod macros;
pub mod parser;
pub mod preprocess;
pub mod validate;

pub use grammar::{GrammarError, InputGrammar};
pub use input::{InputSequence, InvalidInput, Parsed, ParsedInput};
pub use macros::{MacroDefError, MacroKey, MacroSnapshot, MacroTable, SynonymTable};
pub use parser::{parse, ParserOptions};
pub use preprocess::{expand_macros, expand_repetitions, expand_synonyms, preprocess};
pub use validate::{check_input, check_sequence, AccessError, AccessTable};
