//! File transports for input tables and output reports.
//!
//! All file I/O lives here: one-shot reads of the raw input tables at the
//! start of a run and one-shot writes of the derived tables at the end.
//! Typed parsing never happens at this boundary; cells cross it as opaque
//! text.

/// Delimited-file reading and report writing.
pub mod fs;

pub use fs::{
    read_table, write_associations, write_audit, write_crosstab_pair, write_distribution,
    write_overview,
};
