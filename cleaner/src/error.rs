use thiserror::Error;

/// Errors surfaced while clearing or benchmarking a table set.
///
/// Every variant is fatal for the current run. An unavailable identity watermark is not an error,
/// see [`Watermark::Unavailable`][crate::access::Watermark::Unavailable].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
  /// The table reference is empty or contains a NUL byte.
  #[error("malformed table reference {0:?}")]
  InvalidTable(String),
  /// The table does not exist in the engine.
  #[error("no such table: {0}")]
  UnknownTable(String),
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
  /// A strategy left a table in a state it promised not to.
  #[error("{strategy} left {table} {problem}")]
  Verification {
    strategy: String,
    table: String,
    problem: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Rejects table references no engine could resolve.
pub(crate) fn check_table(table: &str) -> Result<()> {
  if table.is_empty() || table.contains('\0') {
    return Err(Error::InvalidTable(table.to_string()));
  }
  return Ok(());
}
