//! Turning command-line options into configuration actions.
//!
//! [`plan`] decides what each option asks for; [`apply`] decides when it
//! runs. Immediate directives go through [`CommandContext::run_line`] right
//! away, deferred ones are only queued.

use crate::command::{CommandContext, ExitCode};
use crate::env::Environment;
use crate::layout::InstallLayout;
use crate::locate::{SelfPathResolver, locate_executable, platform_resolver};
use crate::options::{self, OptionTag, ParsedOption, UsageError};
use crate::search_path::build_default_search_dirs;
use log::warn;
use std::ffi::OsStr;
use std::io::Write;

/// Status the process exits with after printing usage.
pub const HELP_EXIT_CODE: ExitCode = -1;

/// Debug level requested by a bare `-d`.
pub const DEFAULT_DEBUG_LEVEL_OPTION: &str = "3";

/// Usage text printed for `--help`.
pub const USAGE: &str = "Open On-Chip Debugger\n\
Licensed under GNU GPL v2\n\
--help       | -h\tdisplay this help\n\
--version    | -v\tdisplay OpenOCD version\n\
--file       | -f\tuse configuration file <name>\n\
--search     | -s\tdir to search for config files and scripts\n\
--debug      | -d\tset debug level <0-4>\n\
--log_output | -l\tredirect log output to file <name>\n\
--command    | -c\trun <command>\n";

/// What one option occurrence asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run this directive now.
    Immediate(String),
    /// Queue this directive for after startup.
    Deferred(String),
    /// Register a script search directory now.
    SearchDir(String),
    /// Run this directive now, then warn that the option is going away.
    Deprecated { line: String, notice: String },
}

/// Everything the command line asked for, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupPlan {
    pub help: bool,
    pub version: bool,
    pub actions: Vec<Action>,
}

/// How startup should proceed once the options are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Go on and run the deferred configuration.
    Continue,
    /// Stop now with this status.
    Exit(ExitCode),
}

/// Translate parsed options into actions, left to right.
pub fn plan(options: Vec<ParsedOption>, layout: &InstallLayout) -> StartupPlan {
    let mut plan = StartupPlan::default();

    for ParsedOption { tag, arg } in options {
        match tag {
            OptionTag::Help => plan.help = true,
            OptionTag::Version => plan.version = true,
            OptionTag::File => {
                if let Some(path) = arg {
                    plan.actions.push(Action::Deferred(format!("script {{{}}}", path)));
                }
            }
            OptionTag::Search => {
                if let Some(dir) = arg {
                    plan.actions.push(Action::SearchDir(dir));
                }
            }
            OptionTag::Debug => {
                let level = arg.as_deref().unwrap_or(DEFAULT_DEBUG_LEVEL_OPTION);
                plan.actions
                    .push(Action::Immediate(format!("debug_level {}", level)));
            }
            // Without a file there is nothing to redirect to.
            OptionTag::LogOutput => {
                if let Some(path) = arg {
                    plan.actions
                        .push(Action::Immediate(format!("log_output {}", path)));
                }
            }
            OptionTag::Command => {
                if let Some(text) = arg {
                    plan.actions.push(Action::Deferred(text));
                }
            }
            OptionTag::Pipe => {
                let line = format!("gdb_port pipe; log_output {}", layout.pipe_log_file());
                let notice = format!(
                    "deprecated option: -p/--pipe. Use '-c \"{}\"' instead.",
                    line
                );
                plan.actions.push(Action::Deprecated { line, notice });
            }
        }
    }

    plan
}

/// Carry out `actions` against `ctx`, in order.
///
/// A failing immediate directive is reported and processing continues.
pub fn apply(actions: Vec<Action>, ctx: &mut dyn CommandContext) {
    for action in actions {
        match action {
            Action::Immediate(line) => run_immediate(ctx, &line),
            Action::Deferred(line) => ctx.add_config_command(line),
            Action::SearchDir(dir) => ctx.add_script_search_dir(dir),
            // Synchronous so the notice lands after the redirect, not in the
            // gdb pipe.
            Action::Deprecated { line, notice } => {
                run_immediate(ctx, &line);
                warn!("{}", notice);
            }
        }
    }
}

fn run_immediate(ctx: &mut dyn CommandContext, line: &str) {
    match ctx.run_line(line) {
        Ok(0) => {}
        Ok(code) => warn!("'{}' returned {}", line, code),
        Err(e) => warn!("'{}' failed: {:#}", line, e),
    }
}

/// Startup option processing for one installation.
pub struct Startup {
    layout: InstallLayout,
    resolver: Box<dyn SelfPathResolver>,
}

impl Startup {
    pub fn new(layout: InstallLayout, resolver: Box<dyn SelfPathResolver>) -> Self {
        Self { layout, resolver }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Process the command line (program name excluded).
    ///
    /// Immediate directives have run and deferred ones are queued on `ctx`
    /// when this returns, so `out` may be a log sink that `-l` already
    /// redirected. `--help` writes [`USAGE`] to `out` and wins over
    /// everything else; `--version` exits successfully. Otherwise the
    /// built-in search directories are appended after any given with `-s`.
    pub fn process_args<S: AsRef<OsStr>>(
        &self,
        args: &[S],
        ctx: &mut dyn CommandContext,
        env: &Environment,
        out: &mut dyn Write,
    ) -> Result<Outcome, UsageError> {
        let parsed = options::parse(args)?;
        let StartupPlan {
            help,
            version,
            actions,
        } = plan(parsed, &self.layout);

        apply(actions, ctx);

        if help {
            if let Err(e) = out.write_all(USAGE.as_bytes()).and_then(|_| out.flush()) {
                warn!("could not print usage: {}", e);
            }
            return Ok(Outcome::Exit(HELP_EXIT_CODE));
        }

        if version {
            return Ok(Outcome::Exit(0));
        }

        self.add_default_dirs(ctx, env);
        Ok(Outcome::Continue)
    }

    /// Append the built-in script search directories to `ctx`.
    pub fn add_default_dirs(&self, ctx: &mut dyn CommandContext, env: &Environment) {
        let exe_dir = locate_executable(self.resolver.as_ref(), &self.layout);
        for dir in build_default_search_dirs(&self.layout, env, &exe_dir) {
            ctx.add_script_search_dir(dir);
        }
    }
}

impl Default for Startup {
    fn default() -> Self {
        Self::new(InstallLayout::default(), platform_resolver())
    }
}
