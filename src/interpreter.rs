use crate::command::{CommandContext, CommandFactory, ExitCode};
use crate::env::Environment;
use crate::lexer;
use anyhow::{Context, bail};
use log::{debug, error};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports directives defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal directive interpreter.
///
/// The interpreter maintains an [`Environment`], a list of [`CommandFactory`]
/// objects queried to create directives by name, and the queue of
/// configuration directives deferred until startup completes.
///
/// Example
/// ```
/// use openocd_startup::Interpreter;
/// let mut ocd = Interpreter::default();
/// let code = ocd.run_line("gdb_port pipe; debug_level 3").unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(ocd.env().gdb_port.as_deref(), Some("pipe"));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    config_commands: Vec<String>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of directive factories.
    pub fn new(
        commands: Vec<Box<dyn CommandFactory>>,
        env: Environment,
        out: Box<dyn Write>,
    ) -> Self {
        Self {
            env,
            commands,
            config_commands: Vec::new(),
            out,
        }
    }

    /// Interpreter with every built-in directive, writing to `out`.
    pub fn with_builtins(env: Environment, out: Box<dyn Write>) -> Self {
        use crate::builtin::*;
        Self::new(
            vec![
                Box::new(Factory::<DebugLevel>::default()),
                Box::new(Factory::<LogOutput>::default()),
                Box::new(Factory::<GdbPort>::default()),
                Box::new(Factory::<Script>::default()),
                Box::new(Factory::<AddScriptSearchDir>::default()),
                Box::new(Factory::<Echo>::default()),
                Box::new(Factory::<Shutdown>::default()),
            ],
            env,
            out,
        )
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Directives waiting for [`Interpreter::run_config_commands`].
    pub fn config_commands(&self) -> &[String] {
        &self.config_commands
    }

    /// Registered script search directories, highest priority first.
    pub fn script_search_dirs(&self) -> &[String] {
        &self.env.script_search_dirs
    }

    /// Run a single directive by name with arguments.
    ///
    /// Returns the directive's status or an error if no factory knows `name`.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(&mut *self.out, &mut self.env);
            }
        }
        bail!("invalid command name \"{}\"", name)
    }

    /// Run every command of a directive line in order.
    ///
    /// Stops at the first command with a non-zero status and returns it.
    /// Scripts loaded along the way run before the rest of the line, one
    /// nesting level deeper than the command that loaded them.
    pub fn run_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        let mut work: VecDeque<(usize, Vec<String>)> = lexer::split_into_commands(line)?
            .into_iter()
            .map(|argv| (0, argv))
            .collect();
        let result = self.run_work(&mut work);
        self.env.script_depth = 0;
        self.env.pending.clear();
        result
    }

    fn run_work(&mut self, work: &mut VecDeque<(usize, Vec<String>)>) -> anyhow::Result<ExitCode> {
        let mut last = 0;

        while let Some((depth, argv)) = work.pop_front() {
            let Some((name, args)) = argv.split_first() else {
                continue;
            };
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            debug!("command: {}", argv.join(" "));

            self.env.script_depth = depth;
            last = self.run(name, &args)?;
            if last != 0 {
                return Ok(last);
            }

            let mut loaded = Vec::new();
            while let Some(text) = self.env.pending.pop_front() {
                loaded.extend(lexer::split_into_commands(&text)?);
            }
            for command in loaded.into_iter().rev() {
                work.push_front((depth + 1, command));
            }

            if self.env.should_exit {
                break;
            }
        }
        Ok(last)
    }

    /// Run the deferred configuration directives in the order they were queued.
    ///
    /// Stops at the first failing directive, or once `shutdown` has run.
    pub fn run_config_commands(&mut self) -> anyhow::Result<()> {
        let queue = std::mem::take(&mut self.config_commands);
        for line in queue {
            if self.env.should_exit {
                break;
            }
            let code = self
                .run_line(&line)
                .with_context(|| format!("configuration directive failed: {}", line))?;
            if code != 0 {
                bail!("configuration directive failed: {} (status {})", line, code);
            }
        }
        Ok(())
    }

    /// Read further directives from the terminal until `shutdown` or end of input.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline("> ") {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    match self.run_line(&line) {
                        Ok(0) => {}
                        Ok(code) => debug!("'{}' returned {}", line, code),
                        Err(e) => error!("{:#}", e),
                    }
                    if let Err(e) = self.out.flush() {
                        error!("{}", e);
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl CommandContext for Interpreter {
    fn run_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        Interpreter::run_line(self, line)
    }

    fn add_config_command(&mut self, line: String) {
        self.config_commands.push(line);
    }

    fn add_script_search_dir(&mut self, dir: String) {
        self.env.script_search_dirs.push(dir);
    }
}

impl Default for Interpreter {
    /// Interpreter over the process environment writing to standard output.
    fn default() -> Self {
        Self::with_builtins(Environment::new(), Box::new(std::io::stdout()))
    }
}
