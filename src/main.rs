//! # docdesk CLI
//!
//! ## Usage
//!
//! ```bash
//! docdesk --config ./config/docdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docdesk chat` | Interactive conversation (`/mode`, `/history`, `/quit`) |
//! | `docdesk ask "<question>"` | Answer a single question and exit |
//! | `docdesk ingest` | Load and split the corpus, report counts, embed nothing |
//!
//! ## Examples
//!
//! ```bash
//! # Which document covers vacation carry-over?
//! docdesk ask "vacation carry-over" --mode search
//!
//! # Ask questions, following up on earlier answers
//! docdesk chat --mode inquiry
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use docdesk::config::{self, Config};
use docdesk::error::AppError;
use docdesk::session::{Services, Session};
use docdesk::web::HttpPageFetcher;
use docdesk::{ingest, logging, render};
use docdesk_core::chunk::CharacterSplitter;
use docdesk_core::response::Mode;
use tokio::io::{AsyncBufReadExt, BufReader};

/// docdesk: search and question answering over internal documents.
#[derive(Parser)]
#[command(name = "docdesk", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation.
    Chat {
        /// Initial mode: `search` (which file?) or `inquiry` (answer it).
        #[arg(long, default_value = "search", value_parser = parse_mode)]
        mode: Mode,
    },

    /// Answer one question and exit.
    Ask {
        question: String,

        #[arg(long, default_value = "inquiry", value_parser = parse_mode)]
        mode: Mode,
    },

    /// Load and split the corpus and print per-source counts.
    ///
    /// No embedding or chat calls are made, so no API key is needed.
    Ingest,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The logger is not up yet, so config errors are shown in full.
    let cfg = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            let err = AppError::Initialize(e);
            eprintln!("{}\n{}", err.user_message(), err.detail());
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&cfg.app) {
        return report(&AppError::Initialize(e));
    }

    let result = match cli.command {
        Commands::Chat { mode } => run_chat(cfg, mode).await,
        Commands::Ask { question, mode } => run_ask(cfg, &question, mode).await,
        Commands::Ingest => run_ingest(&cfg).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &AppError) -> ExitCode {
    eprintln!("{}", err.user_message());
    ExitCode::FAILURE
}

async fn start_session(cfg: Config) -> Result<Session, AppError> {
    let services = Services::from_config(&cfg).map_err(|e| AppError::Initialize(e).logged())?;
    let session = Session::new(cfg, services);
    session.initialize().await?;
    Ok(session)
}

async fn run_ask(cfg: Config, question: &str, mode: Mode) -> Result<(), AppError> {
    let mut session = start_session(cfg).await?;
    let payload = session.handle_turn(mode, question).await?;
    render::write_answer(&mut std::io::stdout().lock(), &payload)
}

async fn run_chat(cfg: Config, mut mode: Mode) -> Result<(), AppError> {
    let mut session = start_session(cfg).await?;
    println!("Mode: {}. Commands: /mode search|inquiry, /history, /quit", mode);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("[{}] > ", mode);
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                return Err(AppError::Response(anyhow!(e).context("failed to read input")).logged())
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/history", _) => {
                session.replay_log(&mut std::io::stdout().lock())?;
                continue;
            }
            ("/mode", arg) => {
                match arg.parse::<Mode>() {
                    Ok(m) => {
                        mode = m;
                        println!("Mode: {}", mode);
                    }
                    Err(e) => println!("{}", e),
                }
                continue;
            }
            _ => {}
        }

        let shown = match session.handle_turn(mode, input).await {
            Ok(payload) => render::write_answer(&mut std::io::stdout().lock(), &payload),
            Err(err) => Err(err),
        };
        match shown {
            Ok(()) => {}
            Err(err) if err.is_fatal() => return Err(err),
            // The turn failed; the session continues.
            Err(err) => eprintln!("{}", err.user_message()),
        }
    }
    Ok(())
}

async fn run_ingest(cfg: &Config) -> Result<(), AppError> {
    let init = |e| AppError::Initialize(e).logged();
    let splitter = CharacterSplitter::new(cfg.chunking.chunk_size, cfg.chunking.chunk_overlap)
        .map_err(init)?;
    let fetcher = HttpPageFetcher::new(cfg.ingest.fetch_timeout_secs).map_err(init)?;
    let docs = ingest::load_all_documents(&cfg.ingest, &fetcher)
        .await
        .map_err(init)?;

    let summary = ingest::summarize(&docs, &splitter);
    let mut total_chunks = 0;
    let mut total_chars = 0;
    for (source, s) in &summary {
        println!(
            "{:>5} docs {:>6} chunks {:>9} chars  {}",
            s.documents, s.chunks, s.characters, source
        );
        total_chunks += s.chunks;
        total_chars += s.characters;
    }
    println!(
        "{} sources, {} documents, {} chunks, {} characters",
        summary.len(),
        docs.len(),
        total_chunks,
        total_chars
    );
    Ok(())
}
