//! CLI entry point for ContextLLM

mod commands;
mod replay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{ChatCommand, HELP};
use console::style;
use contextllm_core::config::{Config, ConfigLoader};
use contextllm_core::logging::{init_logging, WorkerGuard};
use contextllm_core::preferences::PreferenceStore;
use contextllm_core::session::{ChatMessage, ChatSession, Role};
use contextllm_core::Error;
use contextllm_engine::{ConversationEngine, SubmissionOutcome};
use contextllm_providers::{HttpBackend, LlmCatalog, VoiceCatalog};
use dialoguer::{Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "contextllm")]
#[command(about = "Chat with the ContextLLM backend from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Interactive chat
    Chat {
        /// User id sent with every query
        #[arg(short, long)]
        uid: Option<String>,
    },
    /// Send one message and print the reply
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// User id sent with the query
        #[arg(short, long)]
        uid: Option<String>,
    },
    /// Replay a recorded voice call into a fresh session
    Voice {
        /// JSONL file with one voice event per line
        #[arg(short, long)]
        transcript: PathBuf,
    },
    /// Manage the assistant voice
    Voices {
        #[command(subcommand)]
        command: VoiceCommands,
    },
    /// Show configuration and backend health
    Status,
}

#[derive(Subcommand)]
enum VoiceCommands {
    /// List available voices
    List,
    /// Select the voice used for calls
    Select {
        /// Voice id or name; prompts when omitted
        voice: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Init => run_init(&config_loader)?,
        Commands::Chat { uid } => {
            let (config, _log_guard) = load_config(&config_loader)?;
            info!("Starting interactive chat");
            run_chat(&config_loader, &config, uid).await?;
        }
        Commands::Ask { message, uid } => {
            let (config, _log_guard) = load_config(&config_loader)?;
            info!("Sending one-shot message");
            run_ask(&config_loader, &config, &message, uid).await?;
        }
        Commands::Voice { transcript } => {
            let (config, _log_guard) = load_config(&config_loader)?;
            info!("Replaying voice transcript {}", transcript.display());
            run_voice(&config_loader, &config, &transcript).await?;
        }
        Commands::Voices { command } => {
            let (config, _log_guard) = load_config(&config_loader)?;
            match command {
                VoiceCommands::List => run_voices_list(&config_loader, &config),
                VoiceCommands::Select { voice } => {
                    run_voices_select(&config_loader, &config, voice)?
                }
            }
        }
        Commands::Status => {
            let (config, _log_guard) = load_config(&config_loader)?;
            run_status(&config_loader, &config).await?;
        }
    }

    Ok(())
}

/// Load and validate the configuration, then start logging
fn load_config(loader: &ConfigLoader) -> Result<(Config, WorkerGuard)> {
    let config = loader
        .load()
        .with_context(|| format!("Failed to load {}", loader.config_path().display()))?;
    let guard = init_logging(&config.logging);
    Ok((config, guard))
}

fn build_engine(loader: &ConfigLoader, config: &Config, uid: Option<String>) -> ConversationEngine {
    let voice_id = PreferenceStore::new(loader.config_dir())
        .selected_voice(&config.voice.default_voice_id);
    let engine = ConversationEngine::from_config(config).with_voice_id(voice_id);
    match uid {
        Some(uid) => engine.with_uid(uid),
        None => engine,
    }
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_message(message: &ChatMessage) {
    let catalog = LlmCatalog::new();
    let time = message.timestamp.format("%H:%M");
    match message.role {
        Role::User => println!(
            "{} {} {}",
            style(time).dim(),
            style("You:").green().bold(),
            message.content
        ),
        Role::Assistant => {
            let label = message
                .llm
                .as_deref()
                .map(|llm| format!(" [{}]", catalog.display_name(llm)))
                .unwrap_or_default();
            println!(
                "{} {}{} {}",
                style(time).dim(),
                style("Assistant").cyan().bold(),
                style(label).dim(),
                message.content
            );
        }
    }
}

fn print_session(session: &ChatSession) {
    println!("{}", style(&session.title).bold());
    for message in &session.messages {
        print_message(message);
    }
}

fn print_sessions(sessions: &[ChatSession], active: Option<&ChatSession>) {
    let active_id = active.map(|s| s.id);
    for (i, session) in sessions.iter().enumerate() {
        let marker = if Some(session.id) == active_id { "*" } else { " " };
        println!(
            "{} {:>2}. {} {}",
            marker,
            i + 1,
            session.title,
            style(format!("({} messages)", session.messages.len())).dim()
        );
    }
}

async fn await_reply(
    handle: tokio::task::JoinHandle<SubmissionOutcome>,
) -> Result<SubmissionOutcome> {
    let spinner = thinking_spinner();
    let outcome = handle.await;
    spinner.finish_and_clear();
    Ok(outcome?)
}

fn run_init(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to ContextLLM!").bold().cyan());

    let config_path = loader.config_path();
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    loader.save(&Config::default())?;
    println!(
        "{} Wrote {}",
        style("✓").green(),
        config_path.display()
    );
    Ok(())
}

async fn run_chat(loader: &ConfigLoader, config: &Config, uid: Option<String>) -> Result<()> {
    let engine = build_engine(loader, config, uid);

    println!("{}", style("ContextLLM chat").bold().cyan());
    println!(
        "{}",
        style(format!("Backend: {}  (type /help for commands)", config.backend.base_url)).dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style(">").cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatCommand::parse(&line) {
            ChatCommand::Empty => continue,
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{}", HELP),
            ChatCommand::New => {
                engine.new_chat();
                println!("{}", style("Started a new chat.").dim());
            }
            ChatCommand::List => {
                print_sessions(&engine.sessions(), engine.active_session().as_ref());
            }
            ChatCommand::Switch(n) => match engine.sessions().get(n - 1) {
                Some(session) => {
                    engine.switch_chat(session.id);
                    print_session(session);
                }
                None => println!("{} No chat #{}", style("!").yellow().bold(), n),
            },
            ChatCommand::Delete(n) => match engine.sessions().get(n - 1) {
                Some(session) => {
                    engine.delete_chat(session.id);
                    println!("{}", style("Deleting chats is not supported yet.").dim());
                }
                None => println!("{} No chat #{}", style("!").yellow().bold(), n),
            },
            ChatCommand::Llm => {
                let llm = engine.current_llm();
                println!("Current model: {}", LlmCatalog::new().display_name(&llm));
            }
            ChatCommand::Unknown(cmd) => {
                println!(
                    "{} Unknown command: {}. Type /help for available commands.",
                    style("?").yellow().bold(),
                    style(cmd).dim()
                );
            }
            ChatCommand::Prompt(text) => {
                let handle = match engine.submit(&text) {
                    Ok(handle) => handle,
                    Err(e) => {
                        println!("{} {}", style("!").red().bold(), e);
                        continue;
                    }
                };
                let outcome = await_reply(handle).await?;
                if let Some(message) = outcome.message() {
                    print_message(message);
                }
            }
        }
    }

    println!("{}", style("Goodbye!").dim());
    Ok(())
}

async fn run_ask(
    loader: &ConfigLoader,
    config: &Config,
    message: &str,
    uid: Option<String>,
) -> Result<()> {
    let engine = build_engine(loader, config, uid);
    let handle = engine.submit(message)?;
    let outcome = await_reply(handle).await?;

    match &outcome {
        SubmissionOutcome::Failed { reason, .. } => warn!("Query failed: {}", reason),
        SubmissionOutcome::Dropped { session_id } => {
            anyhow::bail!("Session {} no longer exists", session_id)
        }
        SubmissionOutcome::Succeeded { .. } => {}
    }
    if let Some(message) = outcome.message() {
        print_message(message);
    }
    Ok(())
}

async fn run_voice(loader: &ConfigLoader, config: &Config, transcript: &Path) -> Result<()> {
    let events = replay::load_events(transcript)?;
    let engine = build_engine(loader, config, None);
    engine.refresh_voice_settings().await;

    let options = engine.assistant_options();
    println!(
        "{} {} / {} with voice {}",
        style("Voice assistant:").bold(),
        options.model.provider,
        options.model.model,
        options.voice.voice_id
    );

    let call = engine.start_voice_call();
    for event in events {
        if call.sender.send(event).is_err() {
            warn!("Voice call ended before the recording finished");
            break;
        }
    }
    let summary = call.stop().await?;

    if let Some(error) = &summary.indicators.error {
        println!("{} {}", style("!").red().bold(), error);
    }
    println!(
        "{}",
        style(format!(
            "{} accepted, {} duplicates, {} pairs logged",
            summary.history.len(),
            summary.rejected,
            summary.pairs_logged
        ))
        .dim()
    );
    if let Some(session) = engine.registry().session(summary.session_id) {
        print_session(&session);
    }
    Ok(())
}

fn run_voices_list(loader: &ConfigLoader, config: &Config) {
    let selected =
        PreferenceStore::new(loader.config_dir()).selected_voice(&config.voice.default_voice_id);
    println!("{}", style("Voices:").bold());
    for voice in VoiceCatalog::new().all() {
        let marker = if voice.id == selected {
            style("*").green().to_string()
        } else {
            " ".to_string()
        };
        println!("{} {:<16} {} ({})", marker, voice.name, voice.id, voice.provider);
    }
}

fn run_voices_select(loader: &ConfigLoader, config: &Config, voice: Option<String>) -> Result<()> {
    let catalog = VoiceCatalog::new();
    let store = PreferenceStore::new(loader.config_dir());

    let chosen = match voice {
        Some(query) => catalog
            .resolve(&query)
            .ok_or_else(|| Error::NotFound(format!("voice '{}'", query.trim())))?,
        None => {
            let selected = store.selected_voice(&config.voice.default_voice_id);
            let names: Vec<&str> = catalog.all().iter().map(|v| v.name.as_str()).collect();
            let default = catalog
                .all()
                .iter()
                .position(|v| v.id == selected)
                .unwrap_or(0);
            let idx = Select::new()
                .with_prompt("Select a voice")
                .items(&names)
                .default(default)
                .interact()?;
            &catalog.all()[idx]
        }
    };

    store.set_selected_voice(&chosen.id)?;
    println!("{} Selected {}", style("✓").green(), chosen.name);
    Ok(())
}

async fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("ContextLLM Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Backend: {}", config.backend.base_url);
    println!("  User id: {}", config.identity.uid);
    println!("  Default model: {}", config.engine.default_llm);
    let voice_id =
        PreferenceStore::new(loader.config_dir()).selected_voice(&config.voice.default_voice_id);
    let voice_name = VoiceCatalog::new()
        .find(&voice_id)
        .map(|v| v.name.clone())
        .unwrap_or_else(|| voice_id.clone());
    println!("  Voice: {}", voice_name);
    println!();

    println!("{}", style("Backend:").bold());
    let backend = HttpBackend::from_config(config);
    match backend.health().await {
        Ok(health) if health.is_healthy() => {
            println!("  {}", style("healthy").green());
        }
        Ok(health) => {
            println!(
                "  {} {}",
                style(&health.status).yellow(),
                health.message.unwrap_or_default()
            );
        }
        Err(e) => {
            println!("  {} {}", style("unreachable").red(), e);
        }
    }
    Ok(())
}
