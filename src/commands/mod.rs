//! Command handlers for the CLI application.
//!
//! - `inspect`: read-only commands (parse, expand, consoles)
//! - `macros`: macro management (list, add, remove)
//! - `run`: the interactive session driving virtual controllers

pub mod inspect;
pub mod macros;
pub mod run;

use crate::config::AppConfig;
use anyhow::anyhow;
use chatpad_controller::ConsoleDefinition;
use chatpad_parsing::{
    parse, preprocess, AccessTable, InputGrammar, MacroTable, Parsed, ParserOptions, SynonymTable,
};
use std::sync::Arc;

/// Everything needed to preprocess and parse messages for one console.
pub struct ParseContext {
    pub console: Arc<ConsoleDefinition>,
    pub grammar: InputGrammar,
    pub macros: MacroTable,
    pub synonyms: SynonymTable,
    pub options: ParserOptions,
    pub access: AccessTable,
}

impl ParseContext {
    /// Run the full text pipeline on one message.
    pub fn evaluate(&self, text: &str) -> Parsed {
        let expanded = self.expand(text);
        parse(&expanded, &self.grammar, &self.options)
    }

    /// Preprocess only (repetitions, macros, synonyms).
    pub fn expand(&self, text: &str) -> String {
        preprocess(text, &self.macros, &self.synonyms)
    }
}

/// Build a parse context for the configured (or overridden) console.
pub fn parse_context(
    config: &AppConfig,
    console_override: Option<&str>,
) -> anyhow::Result<ParseContext> {
    let name = console_override.unwrap_or(&config.console);
    let console = config.resolve_console(name).ok_or_else(|| {
        anyhow!(
            "unknown console \"{name}\" (known consoles: {})",
            config.console_names().join(", ")
        )
    })?;
    let grammar = InputGrammar::build(&console.valid_inputs())?;

    Ok(ParseContext {
        synonyms: config.synonyms_for(console.name()),
        console: Arc::new(console),
        grammar,
        macros: config.macro_table()?,
        options: config.parser_options(),
        access: config.access_table(),
    })
}
