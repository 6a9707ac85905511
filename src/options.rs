//! Command-line option grammar, parsed with [`clap`] in `getopt_long` style.

use crate::startup::DEFAULT_DEBUG_LEVEL_OPTION;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::debug;
use std::ffi::{OsStr, OsString};
use thiserror::Error;

/// What an option asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionTag {
    Help,
    Version,
    File,
    Search,
    Debug,
    LogOutput,
    Command,
    Pipe,
}

/// Whether an option takes an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    Required,
    Optional,
}

/// One row of the option table. Long and short forms are synonyms.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub long: &'static str,
    pub short: char,
    pub arg: ArgKind,
    pub tag: OptionTag,
}

/// Every option the tool understands.
pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec { long: "help", short: 'h', arg: ArgKind::None, tag: OptionTag::Help },
    OptionSpec { long: "version", short: 'v', arg: ArgKind::None, tag: OptionTag::Version },
    OptionSpec { long: "debug", short: 'd', arg: ArgKind::Optional, tag: OptionTag::Debug },
    OptionSpec { long: "file", short: 'f', arg: ArgKind::Required, tag: OptionTag::File },
    OptionSpec { long: "search", short: 's', arg: ArgKind::Required, tag: OptionTag::Search },
    OptionSpec { long: "log_output", short: 'l', arg: ArgKind::Required, tag: OptionTag::LogOutput },
    OptionSpec { long: "command", short: 'c', arg: ArgKind::Required, tag: OptionTag::Command },
    OptionSpec { long: "pipe", short: 'p', arg: ArgKind::None, tag: OptionTag::Pipe },
];

const OPERANDS: &str = "operands";

/// A recognized option occurrence and its argument, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOption {
    pub tag: OptionTag,
    pub arg: Option<String>,
}

impl ParsedOption {
    pub fn new(tag: OptionTag, arg: Option<&str>) -> Self {
        Self {
            tag,
            arg: arg.map(str::to_string),
        }
    }
}

/// A malformed command line. Always fatal.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct UsageError(#[from] clap::Error);

impl UsageError {
    /// What clap objected to.
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }
}

fn arg_for(spec: &OptionSpec) -> Arg {
    let arg = Arg::new(spec.long)
        .short(spec.short)
        .long(spec.long)
        .action(ArgAction::Append);

    match spec.arg {
        // Every occurrence has to be recorded with its position, so switches
        // carry an empty value that is only ever given with `=`. An attached
        // character after a short switch continues the cluster.
        ArgKind::None => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value(""),
        ArgKind::Required => arg.num_args(1).allow_hyphen_values(true),
        ArgKind::Optional => arg
            .num_args(0..=1)
            .default_missing_value(DEFAULT_DEBUG_LEVEL_OPTION),
    }
}

/// The option grammar as a [`clap::Command`].
pub fn command() -> Command {
    let operands = Arg::new(OPERANDS)
        .num_args(0..)
        .action(ArgAction::Append)
        .value_parser(value_parser!(OsString))
        .hide(true);

    Command::new("openocd")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .infer_long_args(true)
        .args(OPTIONS.iter().map(arg_for))
        .arg(operands)
}

/// Parse `args` (program name excluded) into option occurrences, left to right.
///
/// Short flags may be clustered (`-hv`), short values may be attached
/// (`-ffoo.cfg`) or detached (`-f foo.cfg`), long values may use `=` or the
/// next argument, and long names may be abbreviated to any unambiguous
/// prefix. `--` ends option processing. Arguments that are not options are
/// skipped. A bare `-d` stands for `-d3`; a detached debug level is taken
/// when the next argument does not look like an option.
///
/// Operands may be any bytes the platform allows. Option values must be
/// valid Unicode since they end up in directive lines.
pub fn parse<S: AsRef<OsStr>>(args: &[S]) -> Result<Vec<ParsedOption>, UsageError> {
    let matches =
        command().try_get_matches_from(args.iter().map(|arg| arg.as_ref().to_os_string()))?;

    if let Some(operands) = matches.get_many::<OsString>(OPERANDS) {
        for operand in operands {
            debug!("ignoring argument '{}'", operand.to_string_lossy());
        }
    }

    let mut found: Vec<(usize, ParsedOption)> = OPTIONS
        .iter()
        .flat_map(|spec| occurrences(&matches, spec))
        .collect();
    found.sort_by_key(|(index, _)| *index);
    Ok(found.into_iter().map(|(_, option)| option).collect())
}

fn occurrences(matches: &ArgMatches, spec: &OptionSpec) -> Vec<(usize, ParsedOption)> {
    let (Some(indices), Some(values)) = (
        matches.indices_of(spec.long),
        matches.get_many::<String>(spec.long),
    ) else {
        return Vec::new();
    };

    indices
        .zip(values)
        .map(|(index, value)| {
            let arg = match spec.arg {
                ArgKind::None => None,
                ArgKind::Required | ArgKind::Optional => Some(value.clone()),
            };
            (index, ParsedOption { tag: spec.tag, arg })
        })
        .collect()
}
