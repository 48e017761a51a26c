//! Adaptive clearing of relational tables between test runs.
//!
//! [`Clearer`] decides per table whether a clear command is needed at all: an existence probe
//! finds tables with rows, and for empty tables the identity watermark tells whether a clear is
//! still required to reset the identity counter. The variants the benchmark compares it against
//! are enumerated by [`Strategy`].

pub mod access;
mod error;
pub mod fixture;
pub mod harness;
pub mod memory;
pub mod policy;
pub mod sqlite;

pub use access::{DataAccess, Watermark};
pub use error::{Error, Result};
pub use fixture::Fixture;
pub use policy::{ClearOutcome, Clearer, Strategy, Tally};
pub use sqlite::SqliteAccess;
