//! Interactive console module
//!
//! The presentation layer: parses operator commands and renders the display
//! feed produced by the connection layer.

mod command;
mod repl;

pub use command::*;
pub use repl::*;
