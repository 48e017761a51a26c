use std::collections::HashMap;

use constants::IdentityMode;

use crate::access::{DataAccess, Watermark};
use crate::error::{check_table, Error, Result};
use crate::fixture::Fixture;

/// Everything a [`MemoryEngine`] was asked to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
  pub probes: usize,
  pub counts: usize,
  pub watermark_reads: usize,
  /// One entry per clear command, naming the tables it covered.
  pub clears: Vec<Vec<String>>,
  pub deletes: usize,
  /// Rows touched by probes and counts.
  pub rows_visited: u64,
}

#[derive(Debug, Default)]
struct Table {
  rows: u64,
  /// `None` until the first insert, or again after a reset.
  next_id: Option<i64>,
}

/// In-memory engine that models row counts and identity counters and records every command.
#[derive(Debug)]
pub struct MemoryEngine {
  tables: HashMap<String, Table>,
  identity_outlives_rows: bool,
  baseline: i64,
  stats: Stats,
}

impl MemoryEngine {
  pub fn new(identity_outlives_rows: bool, baseline: i64) -> Self {
    return Self {
      tables: HashMap::new(),
      identity_outlives_rows,
      baseline,
      stats: Stats::default(),
    };
  }

  pub fn stats(&self) -> &Stats {
    return &self.stats;
  }

  pub fn create_table(&mut self, table: &str) {
    self.tables.insert(table.to_string(), Table::default());
  }

  pub fn insert(&mut self, table: &str, rows: u64) -> Result<()> {
    let baseline = self.baseline;
    let t = self.table(table)?;
    t.rows += rows;
    t.next_id = Some(t.next_id.unwrap_or(baseline) + rows as i64);
    return Ok(());
  }

  fn table(&mut self, table: &str) -> Result<&mut Table> {
    check_table(table)?;
    return self
      .tables
      .get_mut(table)
      .ok_or_else(|| Error::UnknownTable(table.to_string()));
  }
}

impl DataAccess for MemoryEngine {
  fn identity_outlives_rows(&self) -> bool {
    return self.identity_outlives_rows;
  }

  fn probe_has_rows(&mut self, table: &str) -> Result<bool> {
    let rows = self.table(table)?.rows;
    self.stats.probes += 1;
    self.stats.rows_visited += rows.min(1);
    return Ok(rows > 0);
  }

  fn count_rows(&mut self, table: &str) -> Result<u64> {
    let rows = self.table(table)?.rows;
    self.stats.counts += 1;
    self.stats.rows_visited += rows;
    return Ok(rows);
  }

  fn read_identity_watermark(&mut self, table: &str) -> Result<Watermark> {
    let next_id = self.table(table)?.next_id;
    self.stats.watermark_reads += 1;
    return Ok(next_id.map_or(Watermark::Unavailable, Watermark::Value));
  }

  fn issue_clear(&mut self, tables: &[&str]) -> Result<()> {
    for table in tables {
      let t = self.table(table)?;
      t.rows = 0;
      t.next_id = None;
    }
    self
      .stats
      .clears
      .push(tables.iter().map(|t| t.to_string()).collect());
    return Ok(());
  }

  fn issue_delete(&mut self, table: &str) -> Result<()> {
    let outlives = self.identity_outlives_rows;
    let t = self.table(table)?;
    t.rows = 0;
    if !outlives {
      t.next_id = None;
    }
    self.stats.deletes += 1;
    return Ok(());
  }
}

impl Fixture for MemoryEngine {
  fn describe(&mut self) -> Result<String> {
    return Ok("memory".to_string());
  }

  fn recreate_tables(&mut self, tables: &[String], mode: IdentityMode) -> Result<()> {
    self.identity_outlives_rows = mode.outlives_rows();
    self.tables.clear();
    for table in tables {
      check_table(table)?;
      self.create_table(table);
    }
    return Ok(());
  }

  fn fill_table(&mut self, table: &str, records: usize) -> Result<()> {
    return self.insert(table, records as u64);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identity_follows_inserts_until_reset() {
    let mut engine = MemoryEngine::new(true, 1);
    engine.create_table("users_1");
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Unavailable
    );

    engine.insert("users_1", 3).unwrap();
    engine.issue_delete("users_1").unwrap();
    assert!(!engine.probe_has_rows("users_1").unwrap());
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Value(4)
    );

    engine.issue_clear(&["users_1"]).unwrap();
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Unavailable
    );
  }

  #[test]
  fn rowid_mode_resets_identity_on_delete() {
    let mut engine = MemoryEngine::new(true, 1);
    engine
      .recreate_tables(&["users_1".to_string()], IdentityMode::Rowid)
      .unwrap();
    assert!(!engine.identity_outlives_rows());

    engine.prime_table("users_1", 5).unwrap();
    assert_eq!(
      engine.read_identity_watermark("users_1").unwrap(),
      Watermark::Unavailable
    );
  }

  #[test]
  fn malformed_and_unknown_tables_are_errors() {
    let mut engine = MemoryEngine::new(true, 1);
    assert!(matches!(
      engine.probe_has_rows(""),
      Err(Error::InvalidTable(_))
    ));
    assert!(matches!(
      engine.probe_has_rows("users_9"),
      Err(Error::UnknownTable(_))
    ));
  }
}
