use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Number of tables created per run.
pub const N: usize = 30;
/// Rows inserted into every filled table before each measured clear.
pub const NUM_RECORDS: usize = 10;
/// Each strategy is measured this many times, the fastest run wins.
pub const NUM_RUNS: usize = 5;

/// Identity a never-inserted table hands out first.
pub const IDENTITY_BASELINE: i64 = 1;

pub const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub const PRAGMAS: &str = r#"
    PRAGMA busy_timeout       = 10000;
    PRAGMA journal_mode       = WAL;
    PRAGMA journal_size_limit = 200000000;
    PRAGMA synchronous        = NORMAL;
    PRAGMA foreign_keys       = ON;
    PRAGMA temp_store         = MEMORY;
    PRAGMA cache_size         = -16000;
"#;

pub fn table_name(n: usize) -> String {
  return format!("users_{n}");
}

/// Quotes `name` as an SQL identifier.
pub fn quote_ident(name: &str) -> String {
  return format!("\"{}\"", name.replace('"', "\"\""));
}

/// Quotes `value` as an SQL string literal.
pub fn quote_literal(value: &str) -> String {
  return format!("'{}'", value.replace('\'', "''"));
}

/// How a table generates its identity column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum IdentityMode {
  /// `INTEGER PRIMARY KEY AUTOINCREMENT`: the counter is kept in `sqlite_sequence` and survives
  /// row removal.
  Autoincrement,
  /// Plain `INTEGER PRIMARY KEY`: the next id is derived from the largest rowid, so an empty table
  /// always starts over.
  Rowid,
}

impl IdentityMode {
  /// Whether the identity counter keeps advancing after every row has been removed.
  pub fn outlives_rows(self) -> bool {
    return matches!(self, Self::Autoincrement);
  }

  fn key_clause(self) -> &'static str {
    match self {
      Self::Autoincrement => "INTEGER PRIMARY KEY AUTOINCREMENT",
      Self::Rowid => "INTEGER PRIMARY KEY",
    }
  }
}

impl fmt::Display for IdentityMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Autoincrement => "autoincrement",
      Self::Rowid => "rowid",
    })
  }
}

impl FromStr for IdentityMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    return match s {
      "autoincrement" => Ok(Self::Autoincrement),
      "rowid" => Ok(Self::Rowid),
      other => Err(format!("unknown identity mode {other:?}")),
    };
  }
}

pub fn create_table_query(table: &str, mode: IdentityMode) -> String {
  let table = quote_ident(table);
  return format!(
    r#"
    DROP TABLE IF EXISTS {table};
    CREATE TABLE {table} (
      id         {key},
      name       INTEGER
    );
"#,
    key = mode.key_clause(),
  );
}

/// A single multi-row insert of `records` rows, `None` when there is nothing to insert.
pub fn fill_query(table: &str, records: usize) -> Option<String> {
  if records == 0 {
    return None;
  }
  let values = (1..=records)
    .map(|i| format!("({i})"))
    .collect::<Vec<_>>()
    .join(",");
  return Some(format!(
    "INSERT INTO {table} (name) VALUES {values};",
    table = quote_ident(table)
  ));
}

pub fn exists_query(table: &str) -> String {
  return format!("SELECT EXISTS(SELECT 1 FROM {} LIMIT 1)", quote_ident(table));
}

/// Counts rows one by one. A bare `COUNT(*)` is answered from b-tree page headers instead.
pub fn count_query(table: &str) -> String {
  return format!("SELECT COUNT(rowid) FROM {}", quote_ident(table));
}

pub fn delete_query(table: &str) -> String {
  return format!("DELETE FROM {}", quote_ident(table));
}

pub fn max_rowid_query(table: &str) -> String {
  return format!("SELECT MAX(rowid) FROM {}", quote_ident(table));
}

pub const SEQUENCE_QUERY: &str = "SELECT seq FROM sqlite_sequence WHERE name = $1";

/// Removes the `sqlite_sequence` entries of `tables`, resetting their AUTOINCREMENT counters.
pub fn reset_sequence_query(tables: &[&str]) -> String {
  let names = tables
    .iter()
    .map(|t| quote_literal(t))
    .collect::<Vec<_>>()
    .join(", ");
  return format!("DELETE FROM sqlite_sequence WHERE name IN ({names});");
}

/// Run configuration for the clearing benchmark.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
  /// Number of tables to create
  #[arg(long, default_value_t = N)]
  pub tables: usize,

  /// Rows inserted into each filled table before every run
  #[arg(long, default_value_t = NUM_RECORDS)]
  pub records: usize,

  /// Runs per strategy, the fastest one is reported
  #[arg(long, default_value_t = NUM_RUNS)]
  pub runs: usize,

  /// How many tables get rows before each run (defaults to all of them)
  #[arg(long)]
  pub filled: Option<usize>,

  /// How many of the remaining tables get rows inserted and deleted again before each run,
  /// leaving them empty with an advanced identity
  #[arg(long, default_value_t = 0)]
  pub primed: usize,

  /// Identity column flavour of the benchmark tables
  #[arg(long, value_enum, default_value_t = IdentityMode::Autoincrement)]
  pub identity: IdentityMode,
}

impl Default for Config {
  fn default() -> Self {
    return Self {
      tables: N,
      records: NUM_RECORDS,
      runs: NUM_RUNS,
      filled: None,
      primed: 0,
      identity: IdentityMode::Autoincrement,
    };
  }
}

impl Config {
  pub fn filled_tables(&self) -> usize {
    return self.filled.unwrap_or(self.tables);
  }

  pub fn table_names(&self) -> Vec<String> {
    return (1..=self.tables).map(table_name).collect();
  }

  pub fn validate(&self) -> Result<(), String> {
    if self.runs == 0 {
      return Err("runs must be at least 1".to_string());
    }
    let fits = self
      .filled_tables()
      .checked_add(self.primed)
      .filter(|used| *used <= self.tables);
    if fits.is_none() {
      return Err(format!(
        "{} filled and {} primed tables requested, but only {} exist",
        self.filled_tables(),
        self.primed,
        self.tables
      ));
    }
    return Ok(());
  }
}
