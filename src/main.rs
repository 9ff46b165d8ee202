//! ao_tictactoe - terminal client
//!
//! Opens game processes, plays turns, lists and creates games.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use ao_tictactoe::{
    read_game_state, BridgeSigner, ClientConfig, Discovery, GameSession, GameState, Gateway,
    HttpArtifacts, HttpGateway, Position, ProcessId, Prompt, Provisioner, RosterEntry, Signer,
};
use clap::Parser;
use cli::{Cli, Command};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load_or_default(&cli.config)?
        .with_env()?
        .validate()?;
    if let Some(mode) = cli.poll_mode {
        config = config.with_poll_mode(mode);
    }

    match cli.command {
        Command::State { process } => show_state(config, ProcessId::from(process)).await,
        Command::Play { process, bot } => play(config, ProcessId::from(process), bot).await,
        Command::Games => list_games(config).await,
        Command::Create { name } => create_game(config, name).await,
    }
}

async fn connect_signer(config: &ClientConfig) -> Result<Arc<dyn Signer>> {
    let signer = BridgeSigner::connect(
        config.require("signer_url")?.to_string(),
        Duration::from_millis(*config.request_timeout_ms()),
    )
    .await
    .context("Failed to reach the wallet bridge")?;
    Ok(Arc::new(signer))
}

fn print_state(state: &GameState, roster: &[RosterEntry], prompt: Prompt) {
    let highlight = state.winning_line().map(|line| line.positions);
    println!("\n{}\n", state.board().display(highlight.as_ref()));
    for entry in roster {
        println!("  {} plays {}", entry.label, entry.symbol);
    }
    if let Some(winner) = state.winner() {
        println!("  Last winner: {}", winner);
    }
    println!("{}", prompt);
}

/// Fetch one snapshot and print it
#[instrument(skip(config))]
async fn show_state(config: ClientConfig, process: ProcessId) -> Result<()> {
    let gateway = HttpGateway::new(&config)?;
    let payload = read_game_state(&gateway, &process).await?;
    let state = GameState::from_payload(payload);
    let roster = state.roster(None, &process);
    print_state(&state, &roster, Prompt::for_state(&state, None));
    Ok(())
}

/// Terminal input while playing
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Move(Position),
    Register,
    Bot,
    Refresh,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Input::Quit,
        "r" | "register" => Input::Register,
        "bot" => Input::Bot,
        "refresh" => Input::Refresh,
        other => Position::from_wire(other).map_or(Input::Unknown, Input::Move),
    }
}

/// Join a game and play from stdin
#[instrument(skip(config))]
async fn play(config: ClientConfig, process: ProcessId, bot: bool) -> Result<()> {
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config)?);
    let signer = connect_signer(&config).await?;
    let mut session = GameSession::open(gateway, config, process, Some(signer)).await?;
    let mut notices = session
        .take_notices()
        .context("Notice receiver already taken")?;
    let mut changes = session.subscribe();

    print_state(&session.state(), &session.roster(), session.prompt());
    if session.prompt() == Prompt::Register
        && let Err(e) = session.register().await
    {
        println!("{}", e.user_message());
    }
    if bot && let Err(e) = session.register_bot().await {
        println!("{}", e.user_message());
    }
    println!("Enter 1-9 to move, 'register', 'bot', 'refresh' or 'quit'.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let result = match parse_input(&line) {
                    Input::Quit => break,
                    Input::Move(position) => session.play(position).await,
                    Input::Register => session.register().await,
                    Input::Bot => session.register_bot().await,
                    Input::Refresh => {
                        if let Err(e) = session.refresh().await {
                            println!("{}", e.user_message());
                        }
                        Ok(())
                    }
                    Input::Unknown => {
                        println!("Enter 1-9 to move, 'register', 'bot', 'refresh' or 'quit'.");
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    println!("{}", e.user_message());
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    warn!("State channel closed");
                    break;
                }
                let state = changes.borrow_and_update().clone();
                session.sync_polling().await;
                print_state(&state, &session.roster(), session.prompt());
            }
            Some(notice) = notices.recv() => println!("** {} **", notice),
        }
    }

    session.close().await;
    Ok(())
}

/// List games on the router
#[instrument(skip(config))]
async fn list_games(config: ClientConfig) -> Result<()> {
    let router = ProcessId::new(config.require("router_process")?);
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config)?);
    let games = Discovery::new(gateway, router).list_games().await?;
    if games.is_empty() {
        println!("No games");
    }
    for game in games {
        println!("{:<24} {}  (owner {})", game.name, game.id, game.owner);
    }
    Ok(())
}

/// Create and register a new game
#[instrument(skip(config))]
async fn create_game(config: ClientConfig, name: String) -> Result<()> {
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config)?);
    let artifacts = Arc::new(HttpArtifacts::new(&config)?);
    let provisioner = Provisioner::new(gateway, artifacts, &config)?;
    let signer = connect_signer(&config).await?;
    let process = provisioner.create_game(&name, signer.as_ref()).await?;
    info!(process_id = %process, "Game ready");
    println!("{}", process);
    Ok(())
}
