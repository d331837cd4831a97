//! Remote process supervision: spawning commands through the configured
//! base prefix, streaming their output, and the layered helper operations.

mod commands;
mod error;
mod process;

pub use commands::*;
pub use error::*;
pub use process::*;
