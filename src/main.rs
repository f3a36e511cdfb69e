//! Puck Crash headless driver
//!
//! Authenticates a player, then plays a number of rounds with a simple
//! fixed-stake strategy while the account sync worker mirrors balances.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use puck_crash::account::{AccountBackend, spawn_sync_worker};
use puck_crash::persistence::{HISTORY_LIMIT, JsonFileStore, MemoryStore};
use puck_crash::sim::{EngineEvent, SeededRng, display_multiplier, multiplier};
use puck_crash::{Engine, GameConfig};

#[derive(Parser, Debug)]
#[command(name = "puck-crash")]
#[command(about = "Play puck betting rounds against the simulator")]
#[command(version)]
struct Cli {
    /// Game config (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account store file; an in-memory store is used when omitted
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Player name (at least 2 characters)
    #[arg(short, long, default_value = "player")]
    username: String,

    /// RNG seed for launches and target placement
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Rounds to play
    #[arg(short, long, default_value_t = 3)]
    rounds: u64,

    /// Stake per round (0 watches house rounds)
    #[arg(long, default_value_t = 10)]
    stake: u64,

    /// Target radius
    #[arg(long, default_value_t = 60.0)]
    radius: f32,

    /// Tick interval in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Pace ticks on the wall clock instead of simulating time
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GameConfig::default(),
    };

    match &cli.data {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("opening account store {}", path.display()))?;
            play(Arc::new(store), config, &cli).await
        }
        None => play(Arc::new(MemoryStore::new()), config, &cli).await,
    }
}

async fn play<B: AccountBackend>(backend: Arc<B>, config: GameConfig, cli: &Cli) -> anyhow::Result<()> {
    let account = backend
        .authenticate(&cli.username)
        .context("authenticating player")?;
    log::info!(
        "Playing as {} (id {}, balance {})",
        account.username,
        account.id,
        account.balance
    );

    let radius = cli.radius.clamp(config.min_radius(), config.max_radius());
    log::info!(
        "Target radius {:.1} pays {}",
        radius,
        display_multiplier(multiplier(radius, config.field_height))
    );

    let (outbox, worker) = spawn_sync_worker(backend.clone());
    let mut placement_rng = Pcg32::seed_from_u64(cli.seed ^ 0x5eed);
    let mut engine = Engine::new(config, &account, SeededRng::new(cli.seed), outbox)
        .context("invalid game config")?;

    let mut interval = tokio::time::interval(Duration::from_millis(cli.tick_ms.max(1)));
    let started = tokio::time::Instant::now();
    let mut sim_now = 0u64;
    let mut settled_rounds = 0u64;

    while settled_rounds < cli.rounds {
        let now = if cli.realtime {
            interval.tick().await;
            started.elapsed().as_millis() as u64
        } else {
            // Let the sync worker run between simulated ticks
            tokio::task::yield_now().await;
            sim_now += cli.tick_ms;
            sim_now
        };

        for event in engine.on_tick(now) {
            match event {
                EngineEvent::RoundStarted(round) if cli.stake > 0 => {
                    let cfg = engine.config();
                    let center = Vec2::new(
                        placement_rng.random_range(radius..=cfg.field_width - radius),
                        placement_rng.random_range(radius..=cfg.field_height - radius),
                    );
                    if let Err(e) = engine.place_bet(center, radius, cli.stake) {
                        log::warn!("round {}: bet rejected: {}", round, e);
                    }
                }
                EngineEvent::Settled { round, bets } => {
                    settled_rounds += 1;
                    if bets.is_empty() {
                        println!("round {round}: house round");
                    }
                    for bet in bets {
                        println!(
                            "round {round}: {} at {} (stake {}, payout {}, balance {})",
                            bet.outcome.as_str(),
                            display_multiplier(bet.bet.multiplier),
                            bet.bet.stake,
                            bet.payout,
                            bet.balance
                        );
                    }
                }
                _ => {}
            }
        }
    }

    let state = engine.state();
    println!("{}", serde_json::to_string_pretty(&state)?);
    println!(
        "net over the last {} bets: {}",
        engine.history().len(),
        engine.history().net()
    );

    // Dropping the engine closes the outbox; wait for queued updates
    drop(engine);
    worker.await.context("account sync worker panicked")?;

    let stored = backend.get_account(account.id)?;
    println!("stored balance: {}", stored.balance);
    for game in backend.history(account.id, HISTORY_LIMIT)? {
        println!(
            "  {} {} x{:.2} -> {}",
            game.created_at.format("%H:%M:%S"),
            game.result.as_str(),
            game.multiplier,
            game.win_amount
        );
    }
    if stored.balance != state.balance {
        log::warn!(
            "stored balance {} differs from local {}; the store is authoritative at next login",
            stored.balance,
            state.balance
        );
    }
    Ok(())
}
