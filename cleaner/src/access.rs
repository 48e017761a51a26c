use crate::error::Result;

/// The current identity counter of a table: the next value it would hand out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Watermark {
  Value(i64),
  /// The backing sequence was never touched, e.g. no row was ever inserted.
  Unavailable,
}

impl Watermark {
  /// Resolves the watermark against `baseline`, treating an unknown counter as untouched.
  pub fn resolve(self, baseline: i64) -> i64 {
    match self {
      Self::Value(v) => v,
      Self::Unavailable => baseline,
    }
  }

  pub fn exceeds(self, baseline: i64) -> bool {
    return self.resolve(baseline) > baseline;
  }
}

/// The data-access capabilities the clearing policies are built on.
///
/// Calls are blocking and issued strictly in sequence. Implementations must not treat a missing
/// identity counter as an error, that case is [`Watermark::Unavailable`].
pub trait DataAccess {
  /// Whether the identity counter survives removal of every row.
  ///
  /// When it does not, an empty table is already at its baseline and the watermark never needs
  /// to be consulted.
  fn identity_outlives_rows(&self) -> bool;

  /// Cheap existence check that stops at the first row.
  fn probe_has_rows(&mut self, table: &str) -> Result<bool>;

  /// Full row count, only used for comparison with the existence probe.
  fn count_rows(&mut self, table: &str) -> Result<u64>;

  fn read_identity_watermark(&mut self, table: &str) -> Result<Watermark>;

  /// Removes every row of every named table and resets their identity counters, as one command.
  fn issue_clear(&mut self, tables: &[&str]) -> Result<()>;

  /// Removes every row of `table` without touching its identity counter.
  fn issue_delete(&mut self, table: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unavailable_watermark_resolves_to_baseline() {
    assert_eq!(Watermark::Unavailable.resolve(1), 1);
    assert!(!Watermark::Unavailable.exceeds(1));
    assert!(!Watermark::Value(1).exceeds(1));
    assert!(Watermark::Value(11).exceeds(1));
  }
}
