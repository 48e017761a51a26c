use std::fmt;
use std::str::FromStr;

use log::{debug, trace};

use crate::access::DataAccess;
use crate::error::Result;

/// What a clearing policy did to a single table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClearOutcome {
  /// The table held rows and was cleared.
  Cleared,
  /// The table was empty but its identity counter had advanced, it was cleared to reset it.
  ClearedForIdentityReset,
  /// Nothing to do.
  Skipped,
  /// Rows were deleted, the identity counter was left alone.
  Deleted,
}

impl ClearOutcome {
  pub fn issued_command(self) -> bool {
    return !matches!(self, Self::Skipped);
  }
}

/// Clears tables through a [`DataAccess`] while keeping two guarantees: no rows remain and an
/// advanced identity counter is reset to `baseline`.
pub struct Clearer<'a, A: ?Sized> {
  access: &'a mut A,
  baseline: i64,
}

impl<'a, A: DataAccess + ?Sized> Clearer<'a, A> {
  pub fn new(access: &'a mut A, baseline: i64) -> Self {
    return Self { access, baseline };
  }

  /// Decides what [`clear_if_needed`](Self::clear_if_needed) would do, without issuing anything.
  pub fn decide(&mut self, table: &str) -> Result<ClearOutcome> {
    let has_rows = self.access.probe_has_rows(table)?;
    return self.decide_with(table, has_rows);
  }

  fn decide_with(&mut self, table: &str, has_rows: bool) -> Result<ClearOutcome> {
    if has_rows {
      return Ok(ClearOutcome::Cleared);
    }
    if !self.access.identity_outlives_rows() {
      return Ok(ClearOutcome::Skipped);
    }

    let watermark = self.access.read_identity_watermark(table)?;
    trace!("{table}: identity watermark {watermark:?}");
    if watermark.exceeds(self.baseline) {
      return Ok(ClearOutcome::ClearedForIdentityReset);
    }
    return Ok(ClearOutcome::Skipped);
  }

  fn apply(&mut self, table: &str, outcome: ClearOutcome) -> Result<ClearOutcome> {
    debug!("{table}: {outcome:?}");
    if outcome.issued_command() {
      self.access.issue_clear(&[table])?;
    }
    return Ok(outcome);
  }

  /// Probes `table` and clears it only when it holds rows or its identity counter has advanced.
  pub fn clear_if_needed(&mut self, table: &str) -> Result<ClearOutcome> {
    let outcome = self.decide(table)?;
    return self.apply(table, outcome);
  }

  /// Adaptive policy over every table, one clear command per table that needs it.
  pub fn clear_adaptive<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    return tables
      .iter()
      .map(|t| self.clear_if_needed(t.as_ref()))
      .collect();
  }

  /// Like [`clear_adaptive`](Self::clear_adaptive), but detects rows with a full count.
  pub fn clear_counting<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    let mut outcomes = Vec::with_capacity(tables.len());
    for table in tables {
      let table = table.as_ref();
      let has_rows = self.access.count_rows(table)? > 0;
      let outcome = self.decide_with(table, has_rows)?;
      outcomes.push(self.apply(table, outcome)?);
    }
    return Ok(outcomes);
  }

  /// Clears only tables that hold rows. An empty table with an advanced identity counter is left
  /// as is, so ids are not guaranteed to restart at the baseline.
  pub fn clear_non_empty<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    let mut outcomes = Vec::with_capacity(tables.len());
    for table in tables {
      let table = table.as_ref();
      let outcome = if self.access.probe_has_rows(table)? {
        ClearOutcome::Cleared
      } else {
        ClearOutcome::Skipped
      };
      outcomes.push(self.apply(table, outcome)?);
    }
    return Ok(outcomes);
  }

  /// Clears every table one by one without looking at it first.
  pub fn clear_eager<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    let mut outcomes = Vec::with_capacity(tables.len());
    for table in tables {
      outcomes.push(self.apply(table.as_ref(), ClearOutcome::Cleared)?);
    }
    return Ok(outcomes);
  }

  /// Runs the adaptive decision for every table, then clears all tables that need it with a
  /// single multi-table command.
  pub fn clear_batch<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    let mut outcomes = Vec::with_capacity(tables.len());
    let mut pending: Vec<&str> = Vec::new();
    for table in tables {
      let table = table.as_ref();
      let outcome = self.decide(table)?;
      debug!("{table}: {outcome:?}");
      if outcome.issued_command() {
        pending.push(table);
      }
      outcomes.push(outcome);
    }

    if !pending.is_empty() {
      self.access.issue_clear(&pending)?;
    }
    return Ok(outcomes);
  }

  /// Clears every table with a single multi-table command, without probing.
  pub fn clear_all_batched<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    if tables.is_empty() {
      return Ok(Vec::new());
    }
    let all = tables.iter().map(|t| t.as_ref()).collect::<Vec<_>>();
    self.access.issue_clear(&all)?;
    return Ok(vec![ClearOutcome::Cleared; tables.len()]);
  }

  /// Deletes the rows of every table, leaving identity counters untouched.
  pub fn delete_all<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    let mut outcomes = Vec::with_capacity(tables.len());
    for table in tables {
      self.access.issue_delete(table.as_ref())?;
      outcomes.push(ClearOutcome::Deleted);
    }
    return Ok(outcomes);
  }

  /// Deletes the rows of every table that holds any.
  pub fn delete_non_empty<S: AsRef<str>>(&mut self, tables: &[S]) -> Result<Vec<ClearOutcome>> {
    let mut outcomes = Vec::with_capacity(tables.len());
    for table in tables {
      let table = table.as_ref();
      if self.access.probe_has_rows(table)? {
        self.access.issue_delete(table)?;
        outcomes.push(ClearOutcome::Deleted);
      } else {
        outcomes.push(ClearOutcome::Skipped);
      }
    }
    return Ok(outcomes);
  }
}

/// The clearing strategies the benchmark compares.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Strategy {
  Adaptive,
  AdaptiveCounting,
  NonEmpty,
  Eager,
  Batch,
  AllBatched,
  DeleteAll,
  DeleteNonEmpty,
}

impl Strategy {
  pub const ALL: [Strategy; 8] = [
    Self::Adaptive,
    Self::AdaptiveCounting,
    Self::NonEmpty,
    Self::Eager,
    Self::Batch,
    Self::AllBatched,
    Self::DeleteAll,
    Self::DeleteNonEmpty,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Self::Adaptive => "adaptive",
      Self::AdaptiveCounting => "adaptive-count",
      Self::NonEmpty => "non-empty",
      Self::Eager => "eager",
      Self::Batch => "batch",
      Self::AllBatched => "all-batched",
      Self::DeleteAll => "delete",
      Self::DeleteNonEmpty => "delete-non-empty",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Adaptive => "Clear non-empty tables (identity ensured)",
      Self::AdaptiveCounting => "Clear non-empty tables, counted (identity ensured)",
      Self::NonEmpty => "Clear non-empty tables (identity not ensured)",
      Self::Eager => "Clear all tables one by one",
      Self::Batch => "Clear non-empty tables in one command (identity ensured)",
      Self::AllBatched => "Clear all tables in one command",
      Self::DeleteAll => "Delete all tables one by one",
      Self::DeleteNonEmpty => "Delete non-empty tables one by one",
    }
  }

  /// Whether every table is back at its identity baseline afterwards.
  pub fn resets_identity(self) -> bool {
    return !matches!(
      self,
      Self::NonEmpty | Self::DeleteAll | Self::DeleteNonEmpty
    );
  }

  pub fn run<A, S>(self, clearer: &mut Clearer<'_, A>, tables: &[S]) -> Result<Vec<ClearOutcome>>
  where
    A: DataAccess + ?Sized,
    S: AsRef<str>,
  {
    match self {
      Self::Adaptive => clearer.clear_adaptive(tables),
      Self::AdaptiveCounting => clearer.clear_counting(tables),
      Self::NonEmpty => clearer.clear_non_empty(tables),
      Self::Eager => clearer.clear_eager(tables),
      Self::Batch => clearer.clear_batch(tables),
      Self::AllBatched => clearer.clear_all_batched(tables),
      Self::DeleteAll => clearer.delete_all(tables),
      Self::DeleteNonEmpty => clearer.delete_non_empty(tables),
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Strategy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    return Self::ALL
      .into_iter()
      .find(|strategy| strategy.name() == s)
      .ok_or_else(|| format!("unknown strategy {s:?}"));
  }
}

/// Per-outcome counts of a single strategy run.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Tally {
  pub cleared: usize,
  pub reset: usize,
  pub skipped: usize,
  pub deleted: usize,
}

impl Tally {
  pub fn from_outcomes(outcomes: &[ClearOutcome]) -> Self {
    let mut tally = Self::default();
    for outcome in outcomes {
      match outcome {
        ClearOutcome::Cleared => tally.cleared += 1,
        ClearOutcome::ClearedForIdentityReset => tally.reset += 1,
        ClearOutcome::Skipped => tally.skipped += 1,
        ClearOutcome::Deleted => tally.deleted += 1,
      }
    }
    return tally;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::access::Watermark;
  use crate::memory::MemoryEngine;

  const BASELINE: i64 = 1;

  fn engine(tables: usize) -> MemoryEngine {
    let mut engine = MemoryEngine::new(true, BASELINE);
    for n in 1..=tables {
      engine.create_table(&constants::table_name(n));
    }
    return engine;
  }

  #[test]
  fn table_with_rows_is_cleared_and_identity_reset() {
    let mut engine = engine(1);
    engine.insert("users_1", 10).unwrap();
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Value(11)
    );

    let outcome = Clearer::new(&mut engine, BASELINE)
      .clear_if_needed("users_1")
      .unwrap();

    assert_eq!(outcome, ClearOutcome::Cleared);
    assert!(!engine.probe_has_rows("users_1").unwrap());
    assert_eq!(
      engine
        .read_identity_watermark("users_1")
        .unwrap()
        .resolve(BASELINE),
      BASELINE
    );
  }

  #[test]
  fn untouched_empty_table_is_skipped() {
    let mut engine = engine(1);

    let outcome = Clearer::new(&mut engine, BASELINE)
      .clear_if_needed("users_1")
      .unwrap();

    assert_eq!(outcome, ClearOutcome::Skipped);
    assert!(engine.stats().clears.is_empty());
  }

  #[test]
  fn empty_table_with_advanced_identity_is_cleared_for_reset() {
    let mut engine = engine(1);
    engine.insert("users_1", 10).unwrap();
    engine.issue_delete("users_1").unwrap();

    let outcome = Clearer::new(&mut engine, BASELINE)
      .clear_if_needed("users_1")
      .unwrap();

    assert_eq!(outcome, ClearOutcome::ClearedForIdentityReset);
    assert_eq!(engine.stats().clears, vec![vec!["users_1".to_string()]]);
    assert!(!engine
      .read_identity_watermark("users_1")
      .unwrap()
      .exceeds(BASELINE));
  }

  #[test]
  fn second_clear_is_a_no_op() {
    let mut engine = engine(2);
    engine.insert("users_1", 3).unwrap();
    engine.insert("users_2", 3).unwrap();
    engine.issue_delete("users_2").unwrap();

    let mut clearer = Clearer::new(&mut engine, BASELINE);
    assert_eq!(clearer.clear_if_needed("users_1").unwrap(), ClearOutcome::Cleared);
    assert_eq!(
      clearer.clear_if_needed("users_2").unwrap(),
      ClearOutcome::ClearedForIdentityReset
    );
    assert_eq!(clearer.clear_if_needed("users_1").unwrap(), ClearOutcome::Skipped);
    assert_eq!(clearer.clear_if_needed("users_2").unwrap(), ClearOutcome::Skipped);

    assert_eq!(engine.stats().clears.len(), 2);
  }

  #[test]
  fn engine_without_persistent_identity_never_reads_watermark() {
    let mut engine = MemoryEngine::new(false, BASELINE);
    engine.create_table("users_1");
    engine.insert("users_1", 4).unwrap();
    engine.issue_delete("users_1").unwrap();

    let outcome = Clearer::new(&mut engine, BASELINE)
      .clear_if_needed("users_1")
      .unwrap();

    assert_eq!(outcome, ClearOutcome::Skipped);
    assert_eq!(engine.stats().watermark_reads, 0);
    assert!(engine.stats().clears.is_empty());
  }

  #[test]
  fn batch_issues_one_command_for_non_empty_tables() {
    let mut engine = engine(30);
    let tables = (1..=30).map(constants::table_name).collect::<Vec<_>>();
    let filled = ["users_3", "users_7", "users_11", "users_20", "users_29"];
    for table in filled {
      engine.insert(table, 5).unwrap();
    }

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .clear_batch(&tables[..])
      .unwrap();

    assert_eq!(Tally::from_outcomes(&outcomes).cleared, 5);
    assert_eq!(Tally::from_outcomes(&outcomes).skipped, 25);
    assert_eq!(engine.stats().clears, vec![filled.map(String::from).to_vec()]);
    for table in &tables {
      assert!(!engine.probe_has_rows(table).unwrap());
    }
  }

  #[test]
  fn batch_without_work_issues_nothing() {
    let mut engine = engine(3);
    let tables = ["users_1", "users_2", "users_3"];

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .clear_batch(&tables[..])
      .unwrap();

    assert_eq!(outcomes, vec![ClearOutcome::Skipped; 3]);
    assert!(engine.stats().clears.is_empty());
  }

  #[test]
  fn batch_includes_identity_advanced_tables() {
    let mut engine = engine(3);
    engine.insert("users_1", 2).unwrap();
    engine.insert("users_3", 2).unwrap();
    engine.issue_delete("users_3").unwrap();

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .clear_batch(&["users_1", "users_2", "users_3"])
      .unwrap();

    assert_eq!(
      outcomes,
      vec![
        ClearOutcome::Cleared,
        ClearOutcome::Skipped,
        ClearOutcome::ClearedForIdentityReset
      ]
    );
    assert_eq!(
      engine.stats().clears,
      vec![vec!["users_1".to_string(), "users_3".to_string()]]
    );
  }

  #[test]
  fn eager_clears_everything_one_by_one() {
    let mut engine = engine(4);
    engine.insert("users_2", 1).unwrap();
    let tables = ["users_1", "users_2", "users_3", "users_4"];

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .clear_eager(&tables)
      .unwrap();

    assert_eq!(outcomes, vec![ClearOutcome::Cleared; 4]);
    assert_eq!(engine.stats().clears.len(), 4);
    assert_eq!(engine.stats().probes, 0);
  }

  #[test]
  fn non_empty_policy_leaves_advanced_identity_behind() {
    let mut engine = engine(1);
    engine.insert("users_1", 10).unwrap();
    engine.issue_delete("users_1").unwrap();

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .clear_non_empty(&["users_1"])
      .unwrap();

    assert_eq!(outcomes, vec![ClearOutcome::Skipped]);
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Value(11)
    );
  }

  #[test]
  fn probe_visits_at_most_one_row_while_count_visits_all() {
    let mut engine = engine(2);
    engine.insert("users_1", 10).unwrap();
    engine.insert("users_2", 10_000).unwrap();

    engine.probe_has_rows("users_1").unwrap();
    let small = engine.stats().rows_visited;
    engine.probe_has_rows("users_2").unwrap();
    let large = engine.stats().rows_visited - small;
    assert_eq!(small, large);

    let before = engine.stats().rows_visited;
    engine.count_rows("users_1").unwrap();
    let small = engine.stats().rows_visited - before;
    let before = engine.stats().rows_visited;
    engine.count_rows("users_2").unwrap();
    let large = engine.stats().rows_visited - before;
    assert!(large > small);

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .clear_counting(&["users_1", "users_2"])
      .unwrap();
    assert_eq!(outcomes, vec![ClearOutcome::Cleared; 2]);
  }

  #[test]
  fn delete_strategies_keep_identity() {
    let mut engine = engine(2);
    engine.insert("users_1", 3).unwrap();

    let outcomes = Clearer::new(&mut engine, BASELINE)
      .delete_non_empty(&["users_1", "users_2"])
      .unwrap();

    assert_eq!(outcomes, vec![ClearOutcome::Deleted, ClearOutcome::Skipped]);
    assert!(engine.stats().clears.is_empty());
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Value(4)
    );
  }

  #[test]
  fn data_access_failure_aborts_the_run() {
    let mut engine = engine(1);
    engine.insert("users_1", 1).unwrap();

    let err = Clearer::new(&mut engine, BASELINE)
      .clear_adaptive(&["users_1", "missing", "users_1"])
      .unwrap_err();

    assert!(matches!(err, crate::Error::UnknownTable(ref t) if t == "missing"));
    assert_eq!(engine.stats().clears.len(), 1);
  }

  #[test]
  fn strategies_round_trip_through_their_names() {
    for strategy in Strategy::ALL {
      assert_eq!(strategy.name().parse::<Strategy>(), Ok(strategy));
    }
    assert!("truncate".parse::<Strategy>().is_err());
  }
}
