//! Console front-end for the blackjack bot.
//!
//! Each stdin line is `<player> <command>`, for example `42 !bj 50`.
//! Replies are printed to stdout.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bjbot::command::{execute, render_shutdown};
use bjbot::{
    BalanceStore, Command, Config, MemoryStore, ParseError, PlayerId, SqliteStore, Table,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, info, warn};

#[derive(Debug, Parser)]
#[command(name = "bjbot", about = "Play blackjack for virtual currency.")]
struct Args {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Database URL, or `memory` for a throwaway store.
    #[arg(long)]
    database: Option<String>,
    /// Seed for the shoe RNG.
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum log level.
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let file = std::fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            Config::from_yaml(&file).context("could not parse config file")?
        }
        None => Config::default(),
    };

    if let Some(database) = args.database {
        config.database_url = database;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(Args::parse())?;

    let level = Level::from_str(&config.log_level).context("invalid log level")?;
    let logging = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if config.json_logs {
        logging.json().init();
    } else {
        logging.init();
    }

    let options = config.table_options();
    info!(
        database = %config.database_url,
        seeded = config.seed.is_some(),
        admins = options.admins.len(),
        "starting bjbot"
    );

    if config.uses_memory_store() {
        warn!("using the in-memory store, balances are lost on exit");
        let table = Table::from_seed(MemoryStore::new(), options, config.seed);
        run(table, &config).await
    } else {
        let store = SqliteStore::connect(&config.database_url)
            .await
            .context("could not open database")?;
        let table = Table::from_seed(store, options, config.seed);
        run(table, &config).await
    }
}

async fn run<S: BalanceStore + 'static>(table: Table<S>, config: &Config) -> Result<()> {
    let table = Arc::new(table);

    let sweeper = {
        let table = Arc::clone(&table);
        let mut interval = tokio::time::interval(config.sweep_interval());
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                let expired = table.expire_idle(Instant::now()).await;
                if !expired.is_empty() {
                    info!(expired = expired.len(), "expired idle rounds");
                }
            }
        })
    };

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("could not read stdin")? else {
                    break;
                };
                if let Some(reply) = handle_line(&table, &line, config.prefix).await {
                    println!("{reply}");
                }
            }
            _ = &mut interrupt => {
                info!("interrupted");
                break;
            }
        }
    }

    sweeper.abort();
    for round in table.shutdown().await {
        if let Some(notice) = render_shutdown(&round) {
            println!("[{}] {notice}", round.player);
        }
    }
    let unsettled = table.sessions().active_count().await;
    if unsettled > 0 {
        warn!(unsettled, "rounds left unsettled at shutdown");
    }
    Ok(())
}

async fn handle_line<S: BalanceStore>(
    table: &Table<S>,
    line: &str,
    prefix: char,
) -> Option<String> {
    let (player, text) = line.trim().split_once(char::is_whitespace)?;
    match Command::parse(text, prefix) {
        Ok(command) => {
            info!(player, ?command, "command received");
            let reply = execute(table, &PlayerId::new(player), command).await;
            Some(format!("[{player}] {reply}"))
        }
        Err(ParseError::NotACommand) => None,
        Err(err) => Some(format!("[{player}] {err}. Type {prefix}help for the commands.")),
    }
}
