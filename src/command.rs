use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Conventional status code returned by directives.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// The surrounding command system as seen by startup option processing.
///
/// Startup only ever runs a single directive line right away, appends a
/// directive to the deferred configuration queue, or registers a script
/// search directory. Everything else about the command system stays behind
/// this trait.
pub trait CommandContext {
    /// Synchronously run one directive line and report its status.
    fn run_line(&mut self, line: &str) -> Result<ExitCode>;

    /// Append a directive to the queue executed after startup completes.
    fn add_config_command(&mut self, line: String);

    /// Register a directory consulted when resolving bare script names.
    ///
    /// Directories registered first are searched first.
    fn add_script_search_dir(&mut self, dir: String);
}

/// Object-safe trait for any directive that can be executed by the interpreter.
pub trait ExecutableCommand {
    /// Executes the directive, writing user-visible output to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment)
    -> Result<ExitCode>;
}

/// Factory that tries to create a directive from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
