//! Application configuration.
//!
//! TOML config with per-field defaults, including macro and synonym
//! definitions, per-input access levels, and custom console definitions
//! beyond the built-ins.

use anyhow::Context;
use chatpad_controller::{ConsoleDefinition, InputKind};
use chatpad_parsing::{AccessTable, MacroTable, ParserOptions, SynonymTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Active console name (built-in or defined in `[consoles]`).
    #[serde(default = "default_console")]
    pub console: String,

    /// How many virtual controllers to create.
    #[serde(default = "default_controller_count")]
    pub controller_count: usize,

    /// Controller port for tokens without a `&<digits>` prefix.
    #[serde(default)]
    pub default_port: u8,

    /// Duration for tokens without an explicit one.
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,

    /// Maximum total duration of one sequence.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Whether to enforce `max_duration_ms`.
    #[serde(default = "default_true")]
    pub check_max_duration: bool,

    /// Access level assumed for interactive sessions.
    #[serde(default)]
    pub session_level: u32,

    /// Base name for the virtual devices (port number is appended).
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Macro definitions: name spec (e.g. `"#mash(*)"`) to template.
    #[serde(default = "default_macros")]
    pub macros: BTreeMap<String, String>,

    /// Synonym replacements, scoped per console name.
    #[serde(default)]
    pub synonyms: BTreeMap<String, BTreeMap<String, String>>,

    /// Minimum access level per input name. Unlisted inputs are level 0.
    #[serde(default)]
    pub input_levels: BTreeMap<String, u32>,

    /// Custom console definitions. A custom console with a built-in's name
    /// overrides the built-in.
    #[serde(default)]
    pub consoles: BTreeMap<String, CustomConsole>,
}

/// A console defined in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomConsole {
    pub inputs: BTreeMap<String, InputKind>,
}

fn default_console() -> String {
    "snes".to_string()
}

fn default_controller_count() -> usize {
    1
}

fn default_duration_ms() -> u64 {
    200
}

fn default_max_duration_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

fn default_device_name() -> String {
    "chatpad virtual gamepad".to_string()
}

fn default_macros() -> BTreeMap<String, String> {
    BTreeMap::from([("#mash(*)".to_string(), "[<0>17ms#17ms]*5".to_string())])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            console: default_console(),
            controller_count: default_controller_count(),
            default_port: 0,
            default_duration_ms: default_duration_ms(),
            max_duration_ms: default_max_duration_ms(),
            check_max_duration: default_true(),
            session_level: 0,
            device_name: default_device_name(),
            macros: default_macros(),
            synonyms: BTreeMap::new(),
            input_levels: BTreeMap::new(),
            consoles: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatpad")
            .join("config.toml")
    }

    /// Load config from a file, or return the default if not found.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config from {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("parsing config from {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            default_port: self.default_port,
            default_duration_ms: self.default_duration_ms,
            check_max_duration: self.check_max_duration,
            max_duration_ms: self.max_duration_ms,
        }
    }

    /// Resolve a console by name: custom definitions first, then built-ins.
    pub fn resolve_console(&self, name: &str) -> Option<ConsoleDefinition> {
        let lowered = name.to_lowercase();
        if let Some(custom) = self.consoles.get(&lowered) {
            return Some(ConsoleDefinition::new(lowered, custom.inputs.clone()));
        }
        ConsoleDefinition::builtin(&lowered)
    }

    /// Every known console name: built-ins plus custom definitions.
    pub fn console_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ConsoleDefinition::builtin_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        for name in self.consoles.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort_unstable();
        names
    }

    pub fn macro_table(&self) -> anyhow::Result<MacroTable> {
        MacroTable::from_defs(self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .context("invalid macro definition in config")
    }

    pub fn synonyms_for(&self, console: &str) -> SynonymTable {
        match self.synonyms.get(console) {
            Some(pairs) => {
                SynonymTable::from_pairs(pairs.iter().map(|(k, v)| (k.clone(), v.clone())))
            }
            None => SynonymTable::new(),
        }
    }

    pub fn access_table(&self) -> AccessTable {
        AccessTable::from_levels(self.input_levels.iter().map(|(k, v)| (k.clone(), *v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.console, config.console);
        assert_eq!(parsed.macros, config.macros);
        assert_eq!(parsed.max_duration_ms, config.max_duration_ms);
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: AppConfig = toml::from_str("console = \"n64\"").unwrap();
        assert_eq!(config.console, "n64");
        assert_eq!(config.controller_count, 1);
        assert_eq!(config.default_duration_ms, 200);
        assert!(config.check_max_duration);
    }

    #[test]
    fn custom_console_overrides_builtin() {
        let config: AppConfig = toml::from_str(
            r#"
            [consoles.nes.inputs.a]
            type = "button"
            code = 999
            "#,
        )
        .unwrap();
        let console = config.resolve_console("nes").unwrap();
        assert_eq!(console.kind("a"), Some(InputKind::Button { code: 999 }));
        assert!(console.kind("b").is_none());
    }

    #[test]
    fn custom_console_appears_in_names() {
        let config: AppConfig = toml::from_str(
            r#"
            [consoles.vectrex.inputs.fire]
            type = "button"
            code = 304
            "#,
        )
        .unwrap();
        assert!(config.console_names().contains(&"vectrex".to_string()));
        assert!(config.resolve_console("vectrex").is_some());
    }

    #[test]
    fn synonyms_are_scoped_per_console() {
        let config: AppConfig = toml::from_str(
            r#"
            [synonyms.snes]
            spinjump = "_b500ms"
            "#,
        )
        .unwrap();
        assert!(!config.synonyms_for("snes").is_empty());
        assert!(config.synonyms_for("nes").is_empty());
    }
}
