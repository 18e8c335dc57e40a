//! Global Index CLI library.
//!
//! Terminal styling and output formatting for the `globalindex-cli` binary.

pub mod output;
pub mod terminal;
