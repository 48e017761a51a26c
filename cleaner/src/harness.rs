use std::time::{Duration, Instant};

use cli_table::format::Justify;
use cli_table::{Cell, Style, Table};
use constants::{Config, IDENTITY_BASELINE};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::fixture::Fixture;
use crate::policy::{Clearer, Strategy, Tally};

#[derive(Debug, Clone)]
pub struct StrategyResult {
  pub strategy: Strategy,
  /// Fastest of all runs.
  pub best: Duration,
  /// Outcomes of the fastest run.
  pub tally: Tally,
}

#[derive(Debug, Clone)]
pub struct Report {
  pub engine: String,
  pub results: Vec<StrategyResult>,
}

impl Report {
  pub fn fastest(&self) -> Option<&StrategyResult> {
    return self.results.iter().min_by_key(|r| r.best);
  }

  pub fn stdout(&self) -> std::io::Result<()> {
    let fastest = self.fastest().map(|r| r.strategy);
    let table = self
      .results
      .iter()
      .map(|r| {
        let right = |n: usize| n.cell().justify(Justify::Right);
        vec![
          r.strategy.label().cell(),
          format!("{:.2?}", r.best)
            .cell()
            .justify(Justify::Right)
            .bold(Some(r.strategy) == fastest),
          right(r.tally.cleared),
          right(r.tally.reset),
          right(r.tally.skipped),
          right(r.tally.deleted),
        ]
      })
      .collect::<Vec<_>>()
      .table()
      .title(vec![
        "Strategy", "Best", "Cleared", "Reset", "Skipped", "Deleted",
      ]);

    println!("[{}]", self.engine);
    return cli_table::print_stdout(table);
  }
}

/// Times every strategy in `strategies` against freshly created tables, keeping the best of
/// `config.runs` runs, and checks after each run that the strategy kept its promises.
pub fn run<F: Fixture>(fixture: &mut F, config: &Config, strategies: &[Strategy]) -> Result<Report> {
  config.validate().map_err(Error::InvalidConfig)?;

  let tables = config.table_names();
  let engine = fixture.describe()?;
  info!(
    "{engine}: {} tables, {} filled, {} primed, {} records, {} runs",
    config.tables,
    config.filled_tables(),
    config.primed,
    config.records,
    config.runs
  );

  let mut results = Vec::with_capacity(strategies.len());
  for &strategy in strategies {
    fixture.recreate_tables(&tables, config.identity)?;

    let mut best: Option<(Duration, Tally)> = None;
    for run in 0..config.runs {
      prepare(fixture, config, &tables)?;

      let start = Instant::now();
      let outcomes = strategy.run(&mut Clearer::new(fixture, IDENTITY_BASELINE), &tables[..])?;
      let elapsed = Instant::now() - start;

      verify(fixture, strategy, &tables)?;
      debug!("{strategy} run {run}: {elapsed:?}");

      if best.map_or(true, |(fastest, _)| elapsed < fastest) {
        best = Some((elapsed, Tally::from_outcomes(&outcomes)));
      }
    }

    let (best, tally) = best.unwrap_or_default();
    info!("{strategy}: best {best:?} ({tally:?})");
    results.push(StrategyResult {
      strategy,
      best,
      tally,
    });
  }

  return Ok(Report { engine, results });
}

fn prepare<F: Fixture>(fixture: &mut F, config: &Config, tables: &[String]) -> Result<()> {
  let filled = config.filled_tables();
  for table in &tables[..filled] {
    fixture.fill_table(table, config.records)?;
  }
  for table in &tables[filled..filled + config.primed] {
    fixture.prime_table(table, config.records)?;
  }
  return Ok(());
}

fn verify<F: Fixture>(fixture: &mut F, strategy: Strategy, tables: &[String]) -> Result<()> {
  let check_identity = strategy.resets_identity() && fixture.identity_outlives_rows();
  for table in tables {
    if fixture.probe_has_rows(table)? {
      return Err(Error::Verification {
        strategy: strategy.to_string(),
        table: table.clone(),
        problem: "with rows".to_string(),
      });
    }
    if check_identity {
      let watermark = fixture.read_identity_watermark(table)?;
      if watermark.exceeds(IDENTITY_BASELINE) {
        return Err(Error::Verification {
          strategy: strategy.to_string(),
          table: table.clone(),
          problem: format!("at identity {}", watermark.resolve(IDENTITY_BASELINE)),
        });
      }
    }
  }
  return Ok(());
}
