//! Command-line interface: `serve` and `migrate up|down|status|fresh`.

pub mod args;

pub use args::{Cli, Commands};
