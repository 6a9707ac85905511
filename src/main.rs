use anyhow::Result;
use openocd_startup::env::{DEFAULT_DEBUG_LEVEL, Environment};
use openocd_startup::io_adapters::LogSink;
use openocd_startup::{Interpreter, Outcome, Startup, level_filter};
use std::ffi::OsString;
use std::io::{self, Write};

fn main() -> Result<()> {
    let sink = LogSink::default();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .target(env_logger::Target::Pipe(Box::new(sink.clone())))
        .init();
    log::set_max_level(level_filter(DEFAULT_DEBUG_LEVEL));

    let startup = Startup::default();
    let mut env = Environment::new();
    env.log_sink = sink.clone();
    let vars = env.clone();
    // Directive output follows `log_output` like any other log record.
    let mut ocd = Interpreter::with_builtins(env, Box::new(sink.clone()));

    writeln!(
        io::stderr(),
        "Open On-Chip Debugger {}\nLicensed under GNU GPL v2",
        env!("CARGO_PKG_VERSION")
    )?;

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let mut usage_out = sink.clone();
    let outcome = match startup.process_args(args.as_slice(), &mut ocd, &vars, &mut usage_out) {
        Ok(outcome) => outcome,
        Err(e) => {
            write!(io::stderr(), "{}", e)?;
            std::process::exit(1);
        }
    };
    if let Outcome::Exit(code) = outcome {
        std::process::exit(code);
    }

    log::debug!("script search dirs: {:?}", ocd.script_search_dirs());
    if let Err(e) = ocd.run_config_commands() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }

    if !ocd.env().should_exit {
        ocd.repl()?;
    }
    Ok(())
}
