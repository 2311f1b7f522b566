//! JSON output for the command line.

mod writer;

pub use writer::{CaseSummaryOutput, OutputWriter};
