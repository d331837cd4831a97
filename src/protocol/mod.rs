//! Line classification for remote Spark output: the event model, the ordered
//! parser chain, and the authenticated sideband decoder.

mod chain;
mod event;
pub mod shell_message;

pub use chain::*;
pub use event::*;
