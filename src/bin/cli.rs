//! Scpilot CLI - Command-line interface
//!
//! Inspect catalogs, encode and decode SCP lines, and drive a console from
//! scripts: monitor notifications, set parameters and record macros.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use scpilot_core::cli::{print_exit_codes, CliResult, ExitCodes};
use scpilot_core::{
    record_button, tokenize, AppConfig, Catalog, CommandOptions, CommandPrefix, CommandValue,
    ConsoleFamily, MacroSignal, Observation, ScpEngine, Session, SessionEvent,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format for scripting
    Json,
}

/// Command direction
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Prefix {
    /// Query
    Get,
    /// Change
    Set,
}

impl From<Prefix> for CommandPrefix {
    fn from(prefix: Prefix) -> Self {
        match prefix {
            Prefix::Get => Self::Get,
            Prefix::Set => Self::Set,
        }
    }
}

/// Scpilot CLI
#[derive(Parser, Debug)]
#[command(
    name = "scpilot",
    author = "Scpilot Team",
    version,
    about = "Control and monitor audio consoles over SCP",
    long_about = None
)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short = 'C', long, env = "SCPILOT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console host, overrides the config
    #[arg(short = 'H', long, env = "SCPILOT_HOST", global = true)]
    host: Option<String>,

    /// Console port, overrides the config
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Console family (CL/QL, TF, PM), overrides the config
    #[arg(short, long, global = true)]
    model: Option<ConsoleFamily>,

    /// Catalog file or directory, overrides the config
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the commands of the catalog in display order
    Commands {
        /// Only keys containing this text (case-insensitive)
        filter: Option<String>,
    },

    /// Decode a response line
    Decode {
        /// Line as received, e.g. 'NOTIFY set MIXER:Current/InCh/Fader/Level 0 0 -1000'
        line: String,
    },

    /// Encode a command without connecting
    Encode {
        /// get or set
        #[arg(value_enum)]
        prefix: Prefix,

        /// Catalog key, e.g. MIXER_Current/InCh/Fader/Level
        key: String,

        #[command(flatten)]
        target: Target,
    },

    /// Print live parameter changes
    Monitor {
        /// Only keys matching this regular expression
        #[arg(long)]
        filter: Option<String>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Query a parameter and print its value
    Get {
        /// Catalog key
        key: String,

        #[command(flatten)]
        target: Target,

        /// Seconds to wait for the answer
        #[arg(long, default_value = "3")]
        wait: u64,
    },

    /// Set a parameter
    Send {
        /// Catalog key
        key: String,

        #[command(flatten)]
        target: Target,

        /// Seconds to wait for the console
        #[arg(long, default_value = "3")]
        wait: u64,
    },

    /// Record a macro until Ctrl+C and print the preset
    Record {
        /// Make the macro a latching control
        #[arg(long)]
        latch: bool,
    },

    /// Print the definition of the macro record control
    Button,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show exit codes
    ExitCodes,
}

/// Coordinate and value of a command
#[derive(clap::Args, Debug, Clone)]
struct Target {
    /// Channel or scene number; -1..-4 select a configured channel alias
    #[arg(short = 'x', long, allow_negative_numbers = true)]
    x: Option<i32>,

    /// Second axis or scene bank
    #[arg(short = 'y', long)]
    y: Option<u32>,

    /// Value to set; 'Toggle' flips an on/off parameter
    #[arg(long = "value")]
    value: Option<String>,
}

impl Target {
    fn options(&self) -> CommandOptions {
        CommandOptions {
            x: self.x,
            y: self.y,
            value: self.value.as_deref().map(CommandValue::parse),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let result = CliResult::from_error(&e);
            eprintln!("Error: {result}");
            return result.to_exit_code();
        }
    };

    let _guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    match run(&cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let result = CliResult::from_error(&e);
            tracing::debug!("Exiting with {}: {:?}", result.code(), e);
            eprintln!("Error: {result}");
            result.to_exit_code()
        }
    }
}

async fn run(cli: &Cli, config: AppConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Commands { filter } => list_commands(cli, &config, filter.as_deref()),
        Commands::Decode { line } => decode(cli, &config, line),
        Commands::Encode { prefix, key, target } => encode(cli, &config, *prefix, key, target),
        Commands::Monitor { filter, duration } => {
            monitor(cli, &config, filter.as_deref(), *duration).await
        }
        Commands::Get { key, target, wait } => get(cli, &config, key, target, *wait).await,
        Commands::Send { key, target, wait } => send(cli, &config, key, target, *wait).await,
        Commands::Record { latch } => record(cli, &config, *latch).await,
        Commands::Button => {
            println!("{}", serde_json::to_string_pretty(&record_button())?);
            Ok(())
        }
        Commands::Init { force } => init_config(cli, *force),
        Commands::ExitCodes => {
            print_exit_codes();
            Ok(())
        }
    }
}

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(AppConfig::default_path()?),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(&config_path(cli)?)?;
    if let Some(host) = &cli.host {
        config.console.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.console.port = port;
    }
    if let Some(model) = cli.model {
        config.console.model = model;
    }
    Ok(config)
}

fn init_logging(cli: &Cli, config: &AppConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log level")?;

    let (file_layer, guard) = match &config.logging.file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("log file path has no file name")?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_catalog(config: &AppConfig, cli: &Cli) -> anyhow::Result<Catalog> {
    let family = config.console.model;
    let labels = config.labels();
    let catalog = match &cli.catalog {
        Some(path) if path.is_dir() => Catalog::from_dir(path, family, labels)?,
        Some(path) => Catalog::from_file(path, family, labels)?,
        None => {
            let dir = config
                .catalog_dir()
                .context("no catalog directory configured")?;
            Catalog::from_dir(&dir, family, labels)?
        }
    };
    Ok(catalog)
}

fn list_commands(cli: &Cli, config: &AppConfig, filter: Option<&str>) -> anyhow::Result<()> {
    let catalog = load_catalog(config, cli)?;
    let needle = filter.map(str::to_lowercase);
    let listing: Vec<_> = catalog
        .command_listing()
        .into_iter()
        .filter(|c| {
            needle
                .as_deref()
                .map_or(true, |n| c.key.to_lowercase().contains(n))
        })
        .collect();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Text => {
            for command in &listing {
                println!("{:<48} {}", command.key, command.label);
            }
            if !cli.quiet {
                eprintln!("{} of {} commands ({})", listing.len(), catalog.len(), catalog.family().name());
            }
        }
    }
    Ok(())
}

fn decode(cli: &Cli, config: &AppConfig, line: &str) -> anyhow::Result<()> {
    let record = tokenize(line)
        .ok_or_else(|| CliResult::error(ExitCodes::INVALID_ARGS, "Not an OK/NOTIFY line"))?;

    // Resolving is optional; decoding works without a catalog
    let key = match load_catalog(config, cli) {
        Ok(catalog) => record
            .address
            .as_deref()
            .and_then(|addr| catalog.resolve(addr))
            .map(|entry| entry.key()),
        Err(e) => {
            tracing::debug!("Decoding without catalog: {:#}", e);
            None
        }
    };

    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "record": record, "key": key });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("status:  {}", record.status);
            for (name, field) in [
                ("command", &record.command),
                ("address", &record.address),
                ("x", &record.x),
                ("y", &record.y),
                ("val", &record.val),
                ("txt_val", &record.txt_val),
            ] {
                if let Some(value) = field {
                    println!("{name:<8} {value}");
                }
            }
            if let Some(key) = key {
                println!("key:     {key}");
            }
        }
    }
    Ok(())
}

fn encode(
    cli: &Cli,
    config: &AppConfig,
    prefix: Prefix,
    key: &str,
    target: &Target,
) -> anyhow::Result<()> {
    let catalog = Arc::new(load_catalog(config, cli)?);
    if catalog.get(key).is_none() {
        return Err(CliResult::unknown_command(key).into());
    }
    let engine = ScpEngine::new(catalog, config.aliases());
    let encoded = engine
        .command(prefix.into(), key, &target.options())
        .ok_or_else(|| CliResult::error(ExitCodes::UNSUPPORTED_COMMAND, "Nothing to send"))?;

    match cli.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "line": encoded.line, "repoll": encoded.repoll })
        ),
        OutputFormat::Text => println!("{}", encoded.line),
    }
    Ok(())
}

async fn connect(cli: &Cli, config: &AppConfig) -> anyhow::Result<(Session, broadcast::Receiver<SessionEvent>)> {
    if config.console.host.is_empty() {
        return Err(CliResult::error(
            ExitCodes::INVALID_ARGS,
            "No console host (use --host or the config file)",
        )
        .into());
    }
    let catalog = Arc::new(load_catalog(config, cli)?);

    if !cli.quiet {
        eprintln!(
            "Connecting to {} at {}:{}...",
            catalog.family().name(),
            config.console.host,
            config.console.port
        );
    }

    let session = Session::connect(config.session_config(), catalog, config.aliases()).await?;
    let rx = session.subscribe();
    Ok((session, rx))
}

fn print_observation(cli: &Cli, obs: &Observation) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(obs)?),
        OutputFormat::Text => println!("{} [{},{}] = {}", obs.key, obs.x, obs.y, obs.value),
    }
    Ok(())
}

async fn monitor(
    cli: &Cli,
    config: &AppConfig,
    filter: Option<&str>,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let filter = filter
        .map(Regex::new)
        .transpose()
        .map_err(|e| CliResult::error(ExitCodes::INVALID_ARGS, e.to_string()))?;
    let (session, mut rx) = connect(cli, config).await?;

    if !cli.quiet {
        eprintln!("Connected. Press Ctrl+C to exit.");
    }

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = &mut deadline => break,
            event = rx.recv() => match event {
                Ok(SessionEvent::Observed(obs)) => {
                    if filter.as_ref().map_or(true, |re| re.is_match(&obs.key)) {
                        print_observation(cli, &obs)?;
                    }
                }
                Ok(SessionEvent::ProductIdentified(name)) => {
                    if !cli.quiet {
                        eprintln!("Device found: {name}");
                    }
                }
                Ok(SessionEvent::StateChanged(state)) => {
                    tracing::info!("Session state: {:?}", state);
                }
                Ok(SessionEvent::Error(e)) => tracing::warn!("{}", e),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Dropped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    session.disconnect().await?;
    Ok(())
}

/// Wait for the next observation of `key`
async fn await_observation(
    rx: &mut broadcast::Receiver<SessionEvent>,
    key: &str,
    wait: u64,
) -> Option<Observation> {
    let found = tokio::time::timeout(Duration::from_secs(wait), async {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Observed(obs)) if obs.key == key => return Some(obs),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;
    found.ok().flatten()
}

async fn get(cli: &Cli, config: &AppConfig, key: &str, target: &Target, wait: u64) -> anyhow::Result<()> {
    let (session, mut rx) = connect(cli, config).await?;
    let mut options = target.options();
    options.value = None;

    session.get(key, options).await?;
    let observed = await_observation(&mut rx, key, wait).await;
    session.disconnect().await?;

    let obs = observed
        .ok_or_else(|| CliResult::error(ExitCodes::NO_RESPONSE, format!("No value for {key}")))?;
    print_observation(cli, &obs)
}

async fn send(cli: &Cli, config: &AppConfig, key: &str, target: &Target, wait: u64) -> anyhow::Result<()> {
    let (session, mut rx) = connect(cli, config).await?;
    let options = target.options();

    // A toggle needs the current value first
    if options.value == Some(CommandValue::Toggle) {
        session
            .get(key, CommandOptions { value: None, ..options.clone() })
            .await?;
        if await_observation(&mut rx, key, wait).await.is_none() {
            session.disconnect().await?;
            return Err(CliResult::error(ExitCodes::NO_RESPONSE, format!("No value for {key}")).into());
        }
    }

    session.set(key, options).await?;
    let observed = await_observation(&mut rx, key, wait).await;
    session.disconnect().await?;

    match observed {
        Some(obs) => print_observation(cli, &obs),
        None => {
            if !cli.quiet {
                eprintln!("Sent; the console did not confirm {key}");
            }
            Ok(())
        }
    }
}

async fn record(cli: &Cli, config: &AppConfig, latch: bool) -> anyhow::Result<()> {
    let (session, mut rx) = connect(cli, config).await?;

    session.macro_signal(MacroSignal::Start).await?;
    let decision = if latch { MacroSignal::Latch } else { MacroSignal::Unlatch };
    session.macro_signal(decision).await?;

    if !cli.quiet {
        eprintln!("Recording. Change parameters on the console, then press Ctrl+C.");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Ok(SessionEvent::Observed(obs)) => {
                    if !cli.quiet {
                        eprintln!("  captured {} [{},{}] = {}", obs.key, obs.x, obs.y, obs.value);
                    }
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    session.macro_signal(MacroSignal::Start).await?;
    let preset = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::MacroFinalized(preset)) => return Some(preset),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten();
    session.disconnect().await?;

    let preset =
        preset.ok_or_else(|| CliResult::error(ExitCodes::CANCELLED, "Nothing recorded"))?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&preset)?),
        OutputFormat::Text => {
            println!("{} ({})", preset.label, if preset.latch { "latch" } else { "one-shot" });
            for action in &preset.actions {
                println!("  set {} [{},{}] {}", action.key, action.x, action.y, action.value);
            }
        }
    }
    Ok(())
}

fn init_config(cli: &Cli, force: bool) -> anyhow::Result<()> {
    let path = config_path(cli)?;
    if path.exists() && !force {
        return Err(CliResult::error(
            ExitCodes::CONFIG_ERROR,
            format!("{} exists (use --force to overwrite)", path.display()),
        )
        .into());
    }
    let mut config = AppConfig::default();
    config.console.catalog_dir = scpilot_core::config::catalog_dir();
    config.save(&path)?;
    scpilot_core::config::init_directories()?;

    if !cli.quiet {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
