//! Read-only commands: parse, expand, consoles.

use super::parse_context;
use crate::config::AppConfig;
use anyhow::anyhow;
use chatpad_parsing::Parsed;
use chatpad_controller::InputKind;

/// Parse a message and print the resulting sequence without executing it.
pub fn parse_text(
    config: &AppConfig,
    console: Option<&str>,
    text: &str,
) -> anyhow::Result<()> {
    let ctx = parse_context(config, console)?;

    let expanded = ctx.expand(text);
    if expanded != text {
        println!("expanded: {expanded}");
    }

    match ctx.evaluate(text) {
        Parsed::NotACommand => println!("not a command (would be treated as a normal message)"),
        Parsed::Invalid(error) => println!("invalid: {error}"),
        Parsed::Valid(sequence) => {
            println!(
                "valid: {} group(s), {} input(s), {}ms total",
                sequence.groups.len(),
                sequence.input_count(),
                sequence.total_duration_ms
            );
            for (i, group) in sequence.groups.iter().enumerate() {
                let rendered: Vec<String> = group.iter().map(ToString::to_string).collect();
                println!("  group {i}: {}", rendered.join(" + "));
            }
        }
    }

    Ok(())
}

/// Print a message after preprocessing only.
pub fn expand_text(
    config: &AppConfig,
    console: Option<&str>,
    text: &str,
) -> anyhow::Result<()> {
    let ctx = parse_context(config, console)?;
    println!("{}", ctx.expand(text));
    Ok(())
}

/// List known consoles, or show one console's full input table.
pub fn consoles(config: &AppConfig, name: Option<&str>) -> anyhow::Result<()> {
    let Some(name) = name else {
        for name in config.console_names() {
            println!("{name}");
        }
        return Ok(());
    };

    let console = config
        .resolve_console(name)
        .ok_or_else(|| anyhow!("unknown console \"{name}\""))?;

    println!("console {}", console.name());
    for input in console.valid_inputs() {
        let rendered = match console.kind(input) {
            Some(InputKind::Button { code }) => format!("button 0x{code:03x}"),
            Some(InputKind::Axis {
                axis,
                toward_min,
                max_percent,
            }) => {
                let end = if toward_min { "min" } else { "max" };
                format!("axis 0x{axis:02x} toward {end} (up to {max_percent}%)")
            }
            Some(InputKind::Wait) => "wait".to_string(),
            None => continue,
        };
        println!("  {input:<8} {rendered}");
    }

    Ok(())
}
