//! oc-log demo
//!
//! Usage:
//!   oc-log-demo                          Log one record per level (sync)
//!   oc-log-demo --async --style detail   Same through the worker pool
//!   oc-log-demo --config log.toml        Start from a config file

mod cli;

use clap::Parser;
use cli::Cli;
use oc_log::{init_tracing, panic_message, Config, Logger, Result};
use std::time::Duration;

/// Time given to the fatal handler before the demo gives up waiting
const FATAL_WAIT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (fatal_tx, fatal_rx) = flume::bounded::<String>(1);
    let config = build_config(&cli)?.with_fatal_handling(move |log, payload| {
        let reason = panic_message(payload.as_ref());
        log.errorln(&[&"fatal record escalated, panic:", &reason]);
        let _ = fatal_tx.try_send(reason);
    });

    let log = Logger::new(config);

    log.verboseln(&[&"verbose", &"record"]);
    log.debugln(&[&"debug", &"record"]);
    log.traceln(&[&"trace", &"record"]);
    ex_debug(&log, "reported at the call site of ex_debug");
    log.warningf(format_args!("warning record {}\n", 1));
    log.error(&[&"error ", &"record", &"\n"]);
    log.flush();

    log.fatalln(&[&"fatal", &"record"]);
    let _ = fatal_rx.recv_timeout(FATAL_WAIT);

    if let Some(e) = log.last_error() {
        eprintln!("Log file error: {}", e);
    }
    log.close();
    Ok(())
}

/// CLI flags applied on top of the config file (or the defaults)
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => oc_log::load(path)?,
        None => Config::default(),
    };

    if let Some(level) = cli.level {
        config = config.with_level(level.into());
    }
    if let Some(style) = cli.style {
        config = config.with_style(style.into());
    }
    if cli.enable_async {
        config = config.with_async(true);
    }
    if cli.no_print {
        config = config.with_disable_print(true);
    }
    if cli.no_save {
        config = config.with_disable_save(true);
    }
    if let Some(dir) = &cli.dir {
        config = config.with_file_dir(dir.as_str());
    }
    Ok(config)
}

/// Wrapper that reports its caller's location instead of its own
fn ex_debug(log: &Logger, text: &str) {
    log.caller(1).debugln(&[&"wrapped:", &text]);
}
