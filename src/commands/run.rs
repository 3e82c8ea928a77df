//! The interactive session: read command text from stdin, execute it on
//! virtual controllers.
//!
//! Lines starting with `!` are session commands (`!help`); anything else
//! goes through the full pipeline: preprocess, parse, access-check, submit.
//! Console switches run the drain barrier (cancel, wait for in-flight to
//! reach zero, rebuild grammar and controllers, resume) so no sequence
//! ever runs against a half-switched console.

use super::{parse_context, ParseContext};
use crate::config::AppConfig;
use chatpad_controller::{
    ConsoleDefinition, ControllerManager, DummyController, InputExecutor, UinputController,
    VirtualController,
};
use chatpad_parsing::{check_sequence, Parsed};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

pub async fn run(
    config: AppConfig,
    console_override: Option<&str>,
    dry_run: bool,
    level_override: Option<u32>,
) -> anyhow::Result<()> {
    let mut ctx = parse_context(&config, console_override)?;
    let level = level_override.unwrap_or(config.session_level);

    let manager = build_manager(&config, &ctx.console, dry_run)?;
    let mut executor = InputExecutor::new(manager, Arc::clone(&ctx.console));

    info!(
        "driving {} controller(s) for console {} (level {level}{})",
        config.controller_count,
        ctx.console.name(),
        if dry_run { ", dry run" } else { "" },
    );
    println!(
        "chatpad session on \"{}\": type input commands, !help for session commands",
        ctx.console.name()
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if handle_line(&line, &mut ctx, &mut executor, &config, level, dry_run).await? {
                    break;
                }
            }
        }
    }

    info!("shutting down, cancelling in-flight sequences");
    executor.cancel_all();
    executor.drain().await;
    if let Err(error) = executor.manager().reset_all() {
        warn!("controller reset on shutdown failed: {error}");
    }

    Ok(())
}

/// Create one controller per configured port.
fn build_manager(
    config: &AppConfig,
    console: &Arc<ConsoleDefinition>,
    dry_run: bool,
) -> anyhow::Result<Arc<ControllerManager>> {
    let mut controllers: Vec<Box<dyn VirtualController>> = Vec::new();

    for port in 0..config.controller_count {
        if dry_run {
            let (controller, _probe) = DummyController::new(Arc::clone(console));
            controllers.push(Box::new(controller));
        } else {
            let name = format!("{} {}", config.device_name, port + 1);
            let mut controller = UinputController::new(&name, Arc::clone(console))?;
            if let Some(path) = controller.device_path() {
                info!("port {port}: {name} at {}", path.display());
            }
            controllers.push(Box::new(controller));
        }
    }

    Ok(Arc::new(ControllerManager::new(controllers)))
}

/// Handle one stdin line. Returns `true` to end the session.
async fn handle_line(
    line: &str,
    ctx: &mut ParseContext,
    executor: &mut InputExecutor,
    config: &AppConfig,
    level: u32,
    dry_run: bool,
) -> anyhow::Result<bool> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }

    if let Some(rest) = line.strip_prefix('!') {
        return session_command(rest, ctx, executor, config, dry_run).await;
    }

    match ctx.evaluate(line) {
        Parsed::NotACommand => {
            // Ordinary chatter; a chat-connected frontend would just show it.
            debug!("not a command: {line}");
        }
        Parsed::Invalid(error) => {
            println!("rejected: {error}");
        }
        Parsed::Valid(sequence) => {
            if let Err(error) = check_sequence(level, &sequence, &ctx.access) {
                println!("rejected: {error}");
                return Ok(false);
            }
            match executor.submit(&sequence) {
                Ok(()) => debug!(
                    "submitted {} group(s), {}ms total",
                    sequence.groups.len(),
                    sequence.total_duration_ms
                ),
                Err(error) => println!("rejected: {error}"),
            }
        }
    }

    Ok(false)
}

/// Handle a `!`-prefixed session command. Returns `true` to end the session.
async fn session_command(
    command: &str,
    ctx: &mut ParseContext,
    executor: &mut InputExecutor,
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<bool> {
    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("help") => {
            println!("!stop            cancel everything in flight and release all inputs");
            println!("!console <name>  switch console (drains in-flight sequences first)");
            println!("!status          show session state");
            println!("!quit            end the session");
        }

        Some("stop") => {
            executor.cancel_all();
            executor.drain().await;
            executor.resume();
            println!("stopped; all inputs released");
        }

        Some("status") => {
            println!(
                "console {}, {} in flight{}",
                ctx.console.name(),
                executor.in_flight(),
                if executor.is_stopped() { ", stopped" } else { "" },
            );
        }

        Some("console") => match parts.next() {
            None => println!("usage: !console <name>"),
            Some(name) => match switch_console(name, ctx, executor, config, dry_run).await {
                Ok(()) => println!("switched to {name}"),
                Err(error) => println!("switch failed: {error}"),
            },
        },

        Some("quit") | Some("q") => return Ok(true),

        Some(other) => println!("unknown session command \"!{other}\" (try !help)"),
        None => {}
    }

    Ok(false)
}

/// The drain barrier: cancel, drain to zero in-flight, reset and rebuild
/// the controllers and grammar for the new console, then resume.
async fn switch_console(
    name: &str,
    ctx: &mut ParseContext,
    executor: &mut InputExecutor,
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    let new_ctx = parse_context(config, Some(name))?;

    executor.cancel_all();
    executor.drain().await;
    if let Err(error) = executor.manager().reset_all() {
        warn!("controller reset during console switch failed: {error}");
    }

    let manager = build_manager(config, &new_ctx.console, dry_run)?;
    executor.reconfigure(manager, Arc::clone(&new_ctx.console));
    *ctx = new_ctx;
    executor.resume();

    info!("console switched to {}", ctx.console.name());
    Ok(())
}
