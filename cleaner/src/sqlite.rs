use std::path::Path;

use constants::*;
use log::trace;
use rusqlite::Connection;

use crate::access::{DataAccess, Watermark};
use crate::error::{check_table, Result};
use crate::fixture::Fixture;

/// Opens `path` with the benchmark pragmas applied.
pub fn open(path: &Path) -> Result<Connection> {
  let conn = Connection::open(path)?;
  conn.busy_timeout(BUSY_TIMEOUT)?;
  conn.execute_batch(PRAGMAS)?;
  return Ok(conn);
}

/// [`DataAccess`] over a borrowed rusqlite connection, either a plain one or
/// one checked out of a pool.
pub struct SqliteAccess<'c> {
  conn: &'c Connection,
  mode: IdentityMode,
}

impl<'c> SqliteAccess<'c> {
  pub fn new(conn: &'c Connection, mode: IdentityMode) -> Self {
    return Self { conn, mode };
  }

  pub fn connection(&self) -> &'c Connection {
    return self.conn;
  }
}

impl DataAccess for SqliteAccess<'_> {
  fn identity_outlives_rows(&self) -> bool {
    return self.mode.outlives_rows();
  }

  fn probe_has_rows(&mut self, table: &str) -> Result<bool> {
    check_table(table)?;
    let mut stmt = self.conn.prepare_cached(&exists_query(table))?;
    return Ok(stmt.query_row((), |row| row.get::<_, bool>(0))?);
  }

  fn count_rows(&mut self, table: &str) -> Result<u64> {
    check_table(table)?;
    let mut stmt = self.conn.prepare_cached(&count_query(table))?;
    let count: i64 = stmt.query_row((), |row| row.get(0))?;
    return Ok(count as u64);
  }

  fn read_identity_watermark(&mut self, table: &str) -> Result<Watermark> {
    check_table(table)?;
    match self.mode {
      IdentityMode::Autoincrement => {
        let mut stmt = self.conn.prepare_cached(SEQUENCE_QUERY)?;
        // A table gets its sqlite_sequence row on the first insert.
        match stmt.query_row([table], |row| row.get::<_, i64>(0)) {
          Ok(seq) => Ok(Watermark::Value(seq + 1)),
          Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Watermark::Unavailable),
          Err(err) => Err(err.into()),
        }
      }
      IdentityMode::Rowid => {
        let mut stmt = self.conn.prepare_cached(&max_rowid_query(table))?;
        let max: Option<i64> = stmt.query_row((), |row| row.get(0))?;
        Ok(max.map_or(Watermark::Unavailable, |m| Watermark::Value(m + 1)))
      }
    }
  }

  fn issue_clear(&mut self, tables: &[&str]) -> Result<()> {
    for table in tables {
      check_table(table)?;
    }
    if tables.is_empty() {
      return Ok(());
    }

    trace!("clearing {tables:?}");
    let tx = self.conn.unchecked_transaction()?;
    for table in tables {
      tx.execute(&delete_query(table), ())?;
    }
    if self.mode.outlives_rows() {
      tx.execute(&reset_sequence_query(tables), ())?;
    }
    tx.commit()?;
    return Ok(());
  }

  fn issue_delete(&mut self, table: &str) -> Result<()> {
    check_table(table)?;
    trace!("deleting from {table}");
    self.conn.execute(&delete_query(table), ())?;
    return Ok(());
  }
}

impl Fixture for SqliteAccess<'_> {
  fn describe(&mut self) -> Result<String> {
    let version: String = self
      .conn
      .query_row("SELECT sqlite_version()", (), |row| row.get(0))?;
    return Ok(format!("SQLite v{version} ({})", self.mode));
  }

  fn recreate_tables(&mut self, tables: &[String], mode: IdentityMode) -> Result<()> {
    self.mode = mode;
    let tx = self.conn.unchecked_transaction()?;
    for table in tables {
      check_table(table)?;
      tx.execute_batch(&create_table_query(table, mode))?;
    }
    tx.commit()?;
    return Ok(());
  }

  fn fill_table(&mut self, table: &str, records: usize) -> Result<()> {
    check_table(table)?;
    if let Some(sql) = fill_query(table, records) {
      self.conn.execute(&sql, ())?;
    }
    return Ok(());
  }
}
