use constants::IdentityMode;

use crate::access::DataAccess;
use crate::error::Result;

/// Setup the benchmark harness needs on top of [`DataAccess`].
pub trait Fixture: DataAccess {
  /// Engine name and version, for the report header.
  fn describe(&mut self) -> Result<String>;

  /// Drops and creates `tables`, each with an identity column of the given `mode`.
  fn recreate_tables(&mut self, tables: &[String], mode: IdentityMode) -> Result<()>;

  /// Inserts `records` rows into `table`.
  fn fill_table(&mut self, table: &str, records: usize) -> Result<()>;

  /// Inserts `records` rows and deletes them again, leaving `table` empty with whatever its
  /// identity counter does after a delete.
  fn prime_table(&mut self, table: &str, records: usize) -> Result<()> {
    self.fill_table(table, records)?;
    return self.issue_delete(table);
  }
}
