use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use log::{LevelFilter, debug};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Highest debug level; anything above is clamped to it.
pub const MAX_DEBUG_LEVEL: u8 = 4;

/// How deeply `script` calls may nest before loading fails.
pub const MAX_SCRIPT_DEPTH: usize = 64;

/// Directives known to the interpreter at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly against the interpreter's [`Environment`].
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the directive, e.g. "debug_level" or "script".
    fn name() -> &'static str;

    /// Executes the directive.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match T::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{:#}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Log filter matching a debug level.
pub fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn resolve_against(env: &Environment, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env.current_dir.join(path)
    }
}

#[derive(FromArgs)]
/// set or show the debug level: 0 errors, 1 warnings, 2 info, 3 debug, 4 trace.
pub struct DebugLevel {
    #[argh(positional)]
    /// new debug level; values above 4 are clamped.
    pub level: Option<u8>,
}

impl BuiltinCommand for DebugLevel {
    fn name() -> &'static str {
        "debug_level"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if let Some(level) = self.level {
            env.debug_level = level.min(MAX_DEBUG_LEVEL);
            log::set_max_level(level_filter(env.debug_level));
        }
        writeln!(stdout, "debug_level: {}", env.debug_level)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// redirect log output to a file, or back to standard error without a file.
pub struct LogOutput {
    #[argh(positional)]
    /// file to write log output to; truncated if it exists.
    pub file: Option<String>,
}

impl BuiltinCommand for LogOutput {
    fn name() -> &'static str {
        "log_output"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match &self.file {
            Some(file) => {
                let path = resolve_against(env, file);
                env.log_sink
                    .redirect_to_file(&path)
                    .with_context(|| format!("log_output: can't open {}", path.display()))?;
                debug!("log output redirected to {}", path.display());
            }
            None => env.log_sink.restore_stderr()?,
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// set or show the port (or "pipe" or "disabled") the gdb server listens on.
pub struct GdbPort {
    #[argh(positional)]
    /// tcp port number, "pipe" or "disabled".
    pub port: Option<String>,
}

impl BuiltinCommand for GdbPort {
    fn name() -> &'static str {
        "gdb_port"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match self.port {
            Some(port) => env.gdb_port = Some(port),
            None => writeln!(stdout, "{}", env.gdb_port.as_deref().unwrap_or("3333"))?,
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// run the directives in a script file.
/// relative names are tried in the current directory, then in each search directory.
pub struct Script {
    #[argh(positional)]
    /// script file to run.
    pub file: String,
}

impl Script {
    fn locate(&self, env: &Environment) -> Option<PathBuf> {
        let direct = resolve_against(env, &self.file);
        if direct.is_file() {
            return Some(direct);
        }
        if Path::new(&self.file).is_absolute() {
            return None;
        }
        env.script_search_dirs
            .iter()
            .map(|dir| Path::new(dir).join(&self.file))
            .find(|candidate| candidate.is_file())
    }
}

impl BuiltinCommand for Script {
    fn name() -> &'static str {
        "script"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if env.script_depth >= MAX_SCRIPT_DEPTH {
            anyhow::bail!(
                "script: {} nested more than {} levels deep",
                self.file,
                MAX_SCRIPT_DEPTH
            );
        }
        let path = self
            .locate(env)
            .ok_or_else(|| anyhow::anyhow!("script: can't find {}", self.file))?;
        debug!("script: running {}", path.display());
        let text = fs::read_to_string(&path)
            .with_context(|| format!("script: can't read {}", path.display()))?;
        env.pending.push_back(text);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// add a directory to the script search path.
pub struct AddScriptSearchDir {
    #[argh(positional)]
    /// directory searched after the ones already registered.
    pub dir: String,
}

impl BuiltinCommand for AddScriptSearchDir {
    fn name() -> &'static str {
        "add_script_search_dir"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.script_search_dirs.push(self.dir);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// stop processing directives and exit once startup is done.
pub struct Shutdown {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Shutdown {
    fn name() -> &'static str {
        "shutdown"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "shutdown command invoked")?;
        env.should_exit = true;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> Environment {
        Environment::with_vars(HashMap::new())
    }

    #[test]
    fn test_echo_prints_args() {
        let mut env = env();
        let echo = Echo {
            no_newline: false,
            args: vec!["hello".to_string(), "world".to_string()],
        };
        let mut out = Vec::new();
        assert_eq!(BuiltinCommand::execute(echo, &mut out, &mut env).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
    }

    #[test]
    fn test_echo_no_newline() {
        let mut env = env();
        let echo = Echo {
            no_newline: true,
            args: vec!["foo".to_string()],
        };
        let mut out = Vec::new();
        BuiltinCommand::execute(echo, &mut out, &mut env).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "foo");
    }

    #[test]
    fn test_debug_level_sets_and_clamps() {
        let mut env = env();
        let mut out = Vec::new();
        BuiltinCommand::execute(DebugLevel { level: Some(9) }, &mut out, &mut env).unwrap();
        assert_eq!(env.debug_level, 4);
        assert_eq!(String::from_utf8(out).unwrap(), "debug_level: 4\n");
    }

    #[test]
    fn test_debug_level_without_argument_reports() {
        let mut env = env();
        let mut out = Vec::new();
        BuiltinCommand::execute(DebugLevel { level: None }, &mut out, &mut env).unwrap();
        assert_eq!(env.debug_level, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "debug_level: 2\n");
    }

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(level_filter(0), LevelFilter::Error);
        assert_eq!(level_filter(2), LevelFilter::Info);
        assert_eq!(level_filter(3), LevelFilter::Debug);
        assert_eq!(level_filter(4), LevelFilter::Trace);
    }

    #[test]
    fn test_gdb_port_set_and_show() {
        let mut env = env();
        let mut out = Vec::new();
        BuiltinCommand::execute(
            GdbPort {
                port: Some("pipe".to_string()),
            },
            &mut out,
            &mut env,
        )
        .unwrap();
        BuiltinCommand::execute(GdbPort { port: None }, &mut out, &mut env).unwrap();
        assert_eq!(env.gdb_port.as_deref(), Some("pipe"));
        assert_eq!(String::from_utf8(out).unwrap(), "pipe\n");
    }

    #[test]
    fn test_log_output_creates_file_relative_to_current_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut env = env();
        env.current_dir = tmp.path().to_path_buf();
        let cmd = LogOutput {
            file: Some("ocd.log".to_string()),
        };
        BuiltinCommand::execute(cmd, &mut Vec::<u8>::new(), &mut env).unwrap();
        writeln!(env.log_sink, "Info : redirected").unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("ocd.log")).unwrap(),
            "Info : redirected\n"
        );
    }

    #[test]
    fn test_script_found_in_search_dirs_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir(first.path().join("board")).unwrap();
        fs::create_dir(second.path().join("board")).unwrap();
        fs::write(first.path().join("board/x.cfg"), "echo first").unwrap();
        fs::write(second.path().join("board/x.cfg"), "echo second").unwrap();

        let cwd = tempfile::tempdir().unwrap();
        let mut env = env();
        env.current_dir = cwd.path().to_path_buf();
        env.script_search_dirs = vec![
            first.path().to_string_lossy().to_string(),
            second.path().to_string_lossy().to_string(),
        ];

        let cmd = Script {
            file: "board/x.cfg".to_string(),
        };
        assert_eq!(BuiltinCommand::execute(cmd, &mut Vec::<u8>::new(), &mut env).unwrap(), 0);
        assert_eq!(env.pending.pop_front().as_deref(), Some("echo first"));
    }

    #[test]
    fn test_script_missing_file_is_an_error() {
        let mut env = env();
        let cmd = Script {
            file: "definitely/not/here.cfg".to_string(),
        };
        let mut out = Vec::new();
        let code = ExecutableCommand::execute(Box::new(cmd), &mut out, &mut env).unwrap();
        assert_eq!(code, 1);
        assert!(String::from_utf8(out).unwrap().contains("can't find"));
    }

    #[test]
    fn test_script_refuses_to_nest_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.cfg"), "echo a").unwrap();
        let mut env = env();
        env.current_dir = dir.path().to_path_buf();
        env.script_depth = MAX_SCRIPT_DEPTH;

        let cmd = Script {
            file: "a.cfg".to_string(),
        };
        let err = BuiltinCommand::execute(cmd, &mut Vec::<u8>::new(), &mut env).unwrap_err();

        assert!(err.to_string().contains("a.cfg"));
        assert!(env.pending.is_empty());
    }

    #[test]
    fn test_factory_reports_bad_arguments() {
        let factory = Factory::<DebugLevel>::default();
        let env = env();
        assert!(factory.try_create(&env, "echo", &[]).is_none());

        let cmd = factory
            .try_create(&env, "debug_level", &["high"])
            .expect("name matches");
        let mut env = env;
        let mut out = Vec::new();
        assert_eq!(cmd.execute(&mut out, &mut env).unwrap(), 1);
        assert!(!out.is_empty());
    }

    #[test]
    fn test_shutdown_sets_exit_flag() {
        let mut env = env();
        BuiltinCommand::execute(Shutdown { _args: vec![] }, &mut Vec::<u8>::new(), &mut env).unwrap();
        assert!(env.should_exit);
    }
}
