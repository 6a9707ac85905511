//! Startup option processing for the on-chip debugger.
//!
//! The command line is turned into configuration directives: some run the
//! moment their option is seen (debug level, log redirection, the legacy pipe
//! mode), others are queued until every option has been read (configuration
//! files, inline commands). Afterwards the built-in script search directories
//! are derived from where the running executable is installed.
//!
//! The main entry point is [`Startup::process_args`], which drives any
//! [`CommandContext`]. [`Interpreter`] is the context the `openocd` binary
//! uses; it runs directive lines with a small set of built-in directives.

mod builtin;
pub mod command;
pub mod env;
pub mod io_adapters;
mod interpreter;
pub mod layout;
mod lexer;
pub mod locate;
pub mod options;
pub mod search_path;
pub mod startup;
#[cfg(test)]
mod test_support;

pub use builtin::level_filter;
pub use command::{CommandContext, ExitCode};
pub use interpreter::Interpreter;
pub use startup::{Outcome, Startup};
