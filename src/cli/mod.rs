pub mod classify;
pub mod commands;
pub mod scan;
pub mod stop;

pub use commands::{Cli, Commands};
