use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::{Datelike, Local, Timelike};
use commandline_tool::{parse_args, run_compare_logs, run_refactor, Commands};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_appender::rolling;
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter as SubLevel;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();

    // Route `log` macros from the library crates through tracing.
    let _ = LogTracer::init();

    let log_dir = Path::new("log");
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("could not create log directory: {}", e);
    }

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    // Archive the previous run's latest.log under a dated name; the
    // current run always writes latest.log.
    let latest_path = log_dir.join("latest.log");
    if latest_path.exists() {
        if let Ok(metadata) = fs::metadata(&latest_path) {
            if let Ok(modified) = metadata.modified() {
                let datetime: chrono::DateTime<Local> = modified.into();
                let mut rng = StdRng::from_entropy();
                let rnd: u8 = rng.gen_range(0..100);
                let code = format!(
                    "{:02}{:02}{:02}{:02}{:02}",
                    (datetime.year() % 100) as i32,
                    datetime.month(),
                    datetime.day(),
                    datetime.hour(),
                    rnd
                );
                let mut final_path = log_dir.join(format!("{}.log", code));
                let mut idx = 1;
                while final_path.exists() {
                    final_path = log_dir.join(format!("{}-{}.log", code, idx));
                    idx += 1;
                }
                let _ = fs::rename(&latest_path, &final_path);
            }
        }
    }

    let file_appender = rolling::never(log_dir, "latest.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Keep the guard alive for the whole process so buffered log lines
    // are flushed on exit.
    let _guard: &'static _ = Box::leak(Box::new(guard));

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    let stdout_filter = if cli.debug {
        SubLevel::DEBUG
    } else {
        SubLevel::WARN
    };
    let file_filter = if cli.debug {
        SubLevel::DEBUG
    } else {
        SubLevel::INFO
    };

    let subscriber = tracing_subscriber::registry()
        .with(stdout_layer.with_filter(stdout_filter))
        .with(file_layer.with_filter(file_filter));
    let _ = subscriber.try_init();

    match &cli.command {
        Commands::Refactor {
            model_file,
            plan_file,
            cache_dir,
            checkpoint_dir,
            out_dir,
            run_id,
            load_checkpoint,
            save_checkpoint,
            dry_run,
        } => {
            debug!("refactor command selected");
            println!(
                "Generating gRPC boundary artifacts\nmodel: {}\nplan: {}",
                model_file.display(),
                plan_file.display()
            );
            run_refactor(
                model_file,
                plan_file,
                cache_dir,
                checkpoint_dir,
                out_dir,
                run_id,
                *load_checkpoint,
                *save_checkpoint,
                *dry_run,
            )
            .await
        }

        Commands::CompareLogs {
            previous,
            current,
            full,
        } => {
            debug!("compare-logs command selected");
            run_compare_logs(previous, current, *full)
        }
    }
}
