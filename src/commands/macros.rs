//! Macro management: list, add, remove.
//!
//! Macros live in the config file; edits are written back immediately so
//! they survive across sessions.

use crate::cli::MacrosCommand;
use crate::config::AppConfig;
use chatpad_parsing::MacroKey;
use std::path::Path;

pub fn handle(
    command: MacrosCommand,
    config_path: &Path,
    mut config: AppConfig,
) -> anyhow::Result<()> {
    match command {
        MacrosCommand::List => {
            if config.macros.is_empty() {
                println!("no macros defined");
            }
            for (spec, template) in &config.macros {
                println!("{spec} -> {template}");
            }
        }

        MacrosCommand::Add { name, template } => {
            let key = MacroKey::parse(&name)?;
            config.macros.insert(key.to_string(), template.clone());
            config.save(config_path)?;
            println!("added {key} -> {template}");
        }

        MacrosCommand::Remove { name } => {
            let key = MacroKey::parse(&name)?;
            if config.macros.remove(&key.to_string()).is_some() {
                config.save(config_path)?;
                println!("removed {key}");
            } else {
                println!("no macro named {key}");
            }
        }
    }

    Ok(())
}
