use crate::io_adapters::LogSink;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::env as stdenv;
use std::ffi::OsString;
use std::path::PathBuf;

/// Debug level used until a `debug_level` directive says otherwise.
pub const DEFAULT_DEBUG_LEVEL: u8 = 2;

/// Mutable state shared by every directive the interpreter runs.
///
/// The environment contains:
/// - `vars`: a snapshot of the process environment variables.
/// - `current_dir`: the directory relative script names fall back to.
/// - `script_search_dirs`: directories consulted by `script`, first match wins.
/// - `pending`: lines queued by `script` for the interpreter to run next.
/// - `script_depth`: how many `script` calls enclose the running directive.
/// - `should_exit`: set by `shutdown`; the interactive prompt checks it.
///
/// Note: fields are public so directives can be written as plain functions
/// over this struct.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., HOME, OPENOCD_SCRIPTS).
    pub vars: HashMap<String, String>,
    /// The current working directory.
    pub current_dir: PathBuf,
    /// Ordered script search directories.
    pub script_search_dirs: Vec<String>,
    /// Lines waiting to be run before control returns to the caller.
    pub pending: VecDeque<String>,
    /// Nesting depth of the directive being run, 0 outside any script.
    pub script_depth: usize,
    /// Current debug level, 0 through 4.
    pub debug_level: u8,
    /// Mode configured by `gdb_port`, if any.
    pub gdb_port: Option<String>,
    /// Where log records are written; swapped by `log_output`.
    pub log_sink: LogSink,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// Variables whose name or value is not valid Unicode are left out.
    pub fn new() -> Self {
        Self::with_vars(unicode_vars(stdenv::vars_os()))
    }

    /// Build an environment over an explicit variable set.
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            script_search_dirs: Vec::new(),
            pending: VecDeque::new(),
            script_depth: 0,
            debug_level: DEFAULT_DEBUG_LEVEL,
            gdb_port: None,
            log_sink: LogSink::default(),
            should_exit: false,
        }
    }

    /// Get the value of an environment variable from the snapshot.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

fn unicode_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, val)| match (key.into_string(), val.into_string()) {
            (Ok(key), Ok(val)) => Some((key, val)),
            (key, _) => {
                debug!("skipping non-unicode environment variable {:?}", key);
                None
            }
        })
        .collect()
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
