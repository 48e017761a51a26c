use anyhow::Context;
use clap::Parser;
use cleaner::{harness, SqliteAccess, Strategy};
use constants::*;
use log::{info, LevelFilter};
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Instant;

const NAME: &str = "R2D2";

#[derive(Parser, Debug)]
#[command(version, about = "Compare table clearing strategies on a pooled connection", long_about = None)]
struct Cli {
  #[command(flatten)]
  config: Config,

  /// Strategy to measure, may be repeated (defaults to all)
  #[arg(long = "strategy", value_name = "NAME")]
  strategies: Vec<Strategy>,

  /// Maximum number of pooled connections
  #[arg(long, default_value_t = 4)]
  pool_size: u32,

  /// Log more, may be repeated
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
  let level = match verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  simplelog::TermLogger::init(
    level,
    simplelog::ConfigBuilder::new()
      .add_filter_allow_str("cleaner")
      .add_filter_allow_str("r2d2_bench")
      .build(),
    simplelog::TerminalMode::Stderr,
    simplelog::ColorChoice::Auto,
  )?;
  return Ok(());
}

fn new_pool(path: &std::path::Path, size: u32) -> anyhow::Result<r2d2::Pool<SqliteConnectionManager>> {
  let manager = SqliteConnectionManager::file(path).with_init(|conn| {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    return conn.execute_batch(PRAGMAS);
  });
  let pool = r2d2::Pool::builder().max_size(size).build(manager)?;

  return Ok(pool);
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose)?;

  let strategies = if cli.strategies.is_empty() {
    Strategy::ALL.to_vec()
  } else {
    cli.strategies
  };

  let tmp_dir = tempfile::TempDir::new()?;
  let fname = tmp_dir.path().join(format!("{NAME}.sqlite"));
  info!("DB file: {fname:?}");

  let pool = new_pool(&fname, cli.pool_size).with_context(|| format!("opening pool on {fname:?}"))?;
  let conn = pool.get()?;
  let mut access = SqliteAccess::new(&conn, cli.config.identity);
  info!("[{NAME}] pool state: {:?}", pool.state());

  let start = Instant::now();
  let report = harness::run(&mut access, &cli.config, &strategies)
    .with_context(|| format!("[{NAME}] benchmark failed"))?;
  report.stdout()?;

  info!(
    "[{NAME}] {count} strategies in {elapsed:?}",
    count = strategies.len(),
    elapsed = Instant::now() - start,
  );
  return Ok(());
}
