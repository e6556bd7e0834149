pub use crate::diagnostics::{HarnessError, Result};

pub mod cli;
pub mod compare;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod invocation;
pub mod tally;
pub mod test_harness;
