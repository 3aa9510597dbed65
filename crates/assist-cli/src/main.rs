use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use assist_core::config::Config;
use assist_core::journal::ActionJournal;
use assist_core::reducer::AssistEffect;
use assist_core::state::AppState;
use assist_core::store::Store;
use serde::Serialize;

mod logging;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("assist {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "replay" => {
            let args = parse_command_args(args.collect())?;
            let config = load_config(args.config.as_deref())?;
            logging::init(&config.logging);
            let state = replay_journal(&args.input)?;
            print_json(&state)
        }
        "apply" => {
            let args = parse_command_args(args.collect())?;
            let config = load_config(args.config.as_deref())?;
            logging::init(&config.logging);
            let content = fs::read_to_string(&args.input)
                .with_context(|| format!("reading {}", args.input.display()))?;
            let mut store = Store::open(&config.journal)?;
            let effects = apply_lines(&mut store, &content)?;
            print_json(&ApplyOutput {
                state: store.state(),
                effects: &effects,
            })
        }
        _ => {
            print_help();
            bail!("unknown command: {command}")
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct CommandArgs {
    input: PathBuf,
    config: Option<PathBuf>,
}

fn parse_command_args(args: Vec<String>) -> anyhow::Result<CommandArgs> {
    let mut input = None;
    let mut config = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--config requires a path");
                };
                config = Some(PathBuf::from(value));
                i += 2;
            }
            other if other.starts_with("--") => {
                bail!("unsupported argument: {other}");
            }
            other => {
                if input.is_some() {
                    bail!("unexpected argument: {other}");
                }
                input = Some(PathBuf::from(other));
                i += 1;
            }
        }
    }
    let Some(input) = input else {
        bail!("missing input file");
    };
    Ok(CommandArgs { input, config })
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path).with_context(|| format!("loading {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            Config::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        _ => Ok(Config::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("assist").join("config.yaml"))
}

fn replay_journal(path: &Path) -> anyhow::Result<AppState> {
    if !path.exists() {
        bail!("journal not found: {}", path.display());
    }
    let journal = ActionJournal::open(path)?;
    let state = journal.restore()?;
    tracing::info!(seq = journal.last_seq(), "replayed journal");
    Ok(state)
}

/// Dispatches one wire action per non-empty line, collecting every effect.
fn apply_lines(store: &mut Store, content: &str) -> anyhow::Result<Vec<AssistEffect>> {
    let mut effects = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid JSON", line_no + 1))?;
        let produced = store
            .dispatch_value(value)
            .with_context(|| format!("line {}", line_no + 1))?;
        effects.extend(produced);
    }
    Ok(effects)
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
    state: &'a AppState,
    effects: &'a [AssistEffect],
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_help() {
    println!("assist {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  assist replay JOURNAL [--config PATH]");
    println!("  assist apply ACTIONS [--config PATH]");
    println!("  assist --help");
    println!("  assist --version");
}
