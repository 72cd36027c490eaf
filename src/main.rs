//! MechanicBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mechanicbuddy::{
    chat::{ChatRequest, ChatService, PersistenceStatus},
    cli::{Args, Commands, Verbosity},
    config::Config,
    history::{HistoryItem, JsonlTranscriptStore, PersistenceConfig, Role, TranscriptStore, UserId},
    records::RecordStore,
    streaming::{cancel_pair, HttpUpstream, RelayOutcome},
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file plus command-line overrides
fn effective_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(url) = &args.url {
        config.upstream.url = url.clone();
    }
    if let Some(model) = &args.model {
        config.upstream.model = model.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.set_data_dir(dir);
    }

    config.validate()?;
    Ok(config)
}

fn transcript_store(config: &Config) -> Result<JsonlTranscriptStore> {
    let store = JsonlTranscriptStore::new(PersistenceConfig {
        storage_dir: config.history_dir(),
    })?;
    Ok(store)
}

fn build_service(config: &Config) -> Result<ChatService> {
    let records = RecordStore::load_shared(&config.issues_path(), &config.steps_path())
        .context("Failed to load record sources")?;
    let upstream = HttpUpstream::with_config(&config.upstream)?;
    let transcripts = transcript_store(config)?;

    Ok(ChatService::new(
        records,
        Arc::new(upstream),
        Arc::new(transcripts),
        config.upstream.clone(),
    ))
}

fn parse_user(user: Option<&str>) -> Result<Option<UserId>> {
    user.map(UserId::new).transpose().map_err(Into::into)
}

fn spinner(verbosity: Verbosity) -> ProgressBar {
    if !verbosity.show_progress() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Waiting for the mechanic...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Stream one answer to stdout; Ctrl-C cancels the relay
async fn run_ask(
    service: &ChatService,
    message: &str,
    user: Option<UserId>,
    verbosity: Verbosity,
) -> Result<()> {
    let (mut tx, mut rx) = mpsc::channel::<Bytes>(32);
    let (cancel, signal) = cancel_pair();
    let pb = spinner(verbosity);

    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = rx.recv().await {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
            stdout.write_all(&chunk).await?;
            stdout.flush().await?;
        }
        pb.finish_and_clear();
        Ok::<_, std::io::Error>(())
    });

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let request = ChatRequest {
        message: message.to_string(),
        identity: user,
    };
    let result = service.handle(request, &mut tx, Some(signal)).await;

    interrupt.abort();
    drop(tx);
    printer.await.context("Output task failed")??;
    println!();

    let outcome = result.context("Upstream request failed")?;

    if let RelayOutcome::Cancelled { .. } = outcome.relay {
        eprintln!("{}", "Answer cancelled; nothing was saved.".yellow());
    }

    match outcome.persistence {
        PersistenceStatus::Stored => {
            if verbosity != Verbosity::Quiet && verbosity != Verbosity::Normal {
                eprintln!("{}", "Exchange saved to history.".green());
            }
        }
        PersistenceStatus::Failed(reason) => {
            eprintln!("{}: could not save exchange: {}", "Warning".yellow(), reason);
        }
        PersistenceStatus::Skipped(_) => {}
    }

    Ok(())
}

fn run_diagnose(service: &ChatService, message: &str) -> Result<()> {
    let prepared = service.prepare(message);

    println!("{}", "Parsed".bold());
    println!("  brand:   {}", prepared.parsed.brand.as_deref().unwrap_or("-"));
    println!(
        "  year:    {}",
        prepared.parsed.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("  symptom: {}", prepared.parsed.symptom);

    println!("{}", "Diagnosis".bold());
    match prepared.diagnosis.finding() {
        Some(finding) => {
            println!("  generation:     {}", finding.query.generation());
            println!("  fault:          {}", finding.fault.green());
            println!("  recommendation: {}", finding.recommendation);
            println!(
                "  how to fix:     {}",
                finding.how_to_fix.as_deref().unwrap_or("(no procedure on file)")
            );
        }
        None => println!("  {}", serde_json::to_string(&prepared.diagnosis)?.yellow()),
    }

    println!("{}", "Prompt".bold());
    println!("  system: {}", prepared.plan.system_role);
    for line in prepared.plan.user_prompt.lines() {
        println!("  | {}", line);
    }

    Ok(())
}

async fn run_chat(service: &ChatService, user: Option<UserId>, verbosity: Verbosity) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!(
        "{}",
        "Describe the problem, e.g. \"Toyota 2015 rattling noise\". Ctrl-D to quit.".cyan()
    );

    loop {
        match editor.readline(">mechanicbuddy: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                if let Err(e) = run_ask(service, line, user.clone(), verbosity).await {
                    eprintln!("{}: {:#}", "Error".red(), e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Use Ctrl-D to quit");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

async fn show_history(config: &Config, user: &str) -> Result<()> {
    let user = UserId::new(user)?;
    let store = transcript_store(config)?;
    let entries = store.history(&user).await?;

    if entries.is_empty() {
        println!("No stored exchanges for {}", user);
        return Ok(());
    }

    for entry in &entries {
        let item = HistoryItem::from(entry);
        let sender = match entry.role {
            Role::User => item.sender.as_str().cyan(),
            Role::Assistant => item.sender.as_str().green(),
        };
        println!(
            "[{}] {}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            sender,
            item.text
        );
    }

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config = effective_config(&args)?;

    match &args.command {
        Commands::Ask { message, user } => {
            let service = build_service(&config)?;
            run_ask(&service, message, parse_user(user.as_deref())?, verbosity).await?;
        }
        Commands::Diagnose { message } => {
            let service = build_service(&config)?;
            run_diagnose(&service, message)?;
        }
        Commands::Chat { user } => {
            let service = build_service(&config)?;
            run_chat(&service, parse_user(user.as_deref())?, verbosity).await?;
        }
        Commands::History { user } => {
            show_history(&config, user).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
