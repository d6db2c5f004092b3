//! Demonstration CLI: exercises the public API end to end.
//!
//! `seglog append` writes N copies of a payload, flushes, and replays the
//! directory to report how many records survived. `seglog replay` only
//! counts. Everything here goes through the same calls an embedding store
//! would make.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use seglog::{Config, ReplayMode, Wal};

#[derive(Clone, Debug, ValueEnum)]
enum ReplayModeArg {
    BestEffort,
    Strict,
}

impl From<ReplayModeArg> for ReplayMode {
    fn from(value: ReplayModeArg) -> Self {
        match value {
            ReplayModeArg::BestEffort => ReplayMode::BestEffort,
            ReplayModeArg::Strict => ReplayMode::Strict,
        }
    }
}

#[derive(Parser)]
#[command(name = "seglog", about = "Segmented write-ahead log demo")]
struct Cli {
    /// Log directory
    #[arg(long, default_value = "./seglog")]
    dir: PathBuf,

    /// Segment size threshold in bytes
    #[arg(long, default_value_t = 2 * 1024 * 1024)]
    segment_size: u64,

    /// Maximum number of segment files retained
    #[arg(long, default_value_t = 3)]
    max_segments: usize,

    /// Background sync period in milliseconds
    #[arg(long, default_value_t = 300)]
    sync_period_ms: u64,

    /// Issue a durability barrier on every flush
    #[arg(long)]
    fsync: bool,

    /// Scope of a replay callback failure
    #[arg(long, value_enum, default_value = "best-effort")]
    replay_mode: ReplayModeArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append N copies of a payload, flush, then replay and count
    Append {
        #[arg(long, default_value_t = 1000)]
        count: u64,

        #[arg(long, default_value = "SET X 23")]
        payload: String,
    },
    /// Replay an existing log directory and count surviving records
    Replay,
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let config = Config {
        log_dir: cli.dir.clone(),
        segment_size: cli.segment_size,
        max_segments: cli.max_segments,
        sync_interval: Duration::from_millis(cli.sync_period_ms),
        fsync: cli.fsync,
        replay_mode: cli.replay_mode.clone().into(),
    };

    if let Err(e) = run(&cli, config) {
        eprintln!("ERROR: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli, config: Config) -> seglog::Result<()> {
    match &cli.command {
        Command::Append { count, payload } => {
            let mut wal = Wal::open(config)?;
            for _ in 0..*count {
                wal.append(payload.as_bytes())?;
            }
            println!("finished writing {count} records");

            wal.sync()?;
            let replayed = count_records(&wal)?;
            println!("replayed {replayed} records");
            wal.close()
        }
        Command::Replay => {
            let mut wal = Wal::open(config)?;
            let replayed = count_records(&wal)?;
            println!("replayed {replayed} records");
            wal.close()
        }
    }
}

fn count_records(wal: &Wal) -> seglog::Result<u64> {
    let mut count = 0;
    wal.recover(|_payload| {
        count += 1;
        Ok(())
    })?;
    Ok(count)
}
