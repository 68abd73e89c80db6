//! Task executor module
//!
//! - Forward-only stage tracking for one bootstrap run
//! - Running the materialized task's work operation

mod runner;
mod state;

pub use runner::*;
pub use state::*;
