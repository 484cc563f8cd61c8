mod cli;
mod error_fmt;
mod monitor;
mod rt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::monitor::{RunOpts, run_monitor, self_check};

fn init_tracing(json: bool, level: &str, logging: Option<&knock_config::Logging>) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    // Optional JSON-lines file sink from [logging]
    let file_layer = logging.and_then(|l| l.file.as_deref().map(|path| (l, path))).map(|(l, path)| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "knock.log".into());
        let appender = match l.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = l.level.as_deref().unwrap_or("info");
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(EnvFilter::new(file_level))
    });

    let _ = tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(file_layer)
        .try_init();
}

fn report_and_exit(err: &eyre::Report, code: i32) -> ! {
    if JSON_MODE.get().copied().unwrap_or(false) {
        eprintln!("{}", format_error_json(err));
    } else {
        eprintln!("error: {err:#}\n{}", humanize(err));
    }
    std::process::exit(code)
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = match knock_config::load_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(cli.json, &cli.log_level, None);
            tracing::error!(config = %cli.config.display(), "config rejected");
            report_and_exit(&e, 2);
        }
    };
    init_tracing(cli.json, &cli.log_level, Some(&cfg.logging));
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "Ctrl-C handler not installed");
        }
    }

    let result = match cli.cmd {
        Commands::Run {
            cycles,
            stats,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => run_monitor(
            &cfg,
            RunOpts {
                cycles,
                stats,
                rt,
                rt_prio,
                rt_lock,
                rt_cpu,
            },
            shutdown,
        ),
        Commands::SelfCheck => self_check(&cfg),
    };

    if let Err(e) = result {
        tracing::error!(error = %format!("{e:#}"), "knock monitor failed");
        report_and_exit(&e, exit_code_for_error(&e));
    }
}
