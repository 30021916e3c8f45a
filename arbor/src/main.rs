use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use arbor::{Cli, Config, get_config, run};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match get_config(&cli).await {
        Ok(c) => c,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = install_tracing(&config) {
        eprintln!("failed to open log file: {error}");
        std::process::exit(1);
    }

    let logs_to_file = config.log_file.is_some();
    if let Err(error) = run(cli, config).await {
        tracing::error!("{error}");
        if logs_to_file {
            eprintln!("{error}");
        }
        std::process::exit(1);
    }
}

// The terminal belongs to the browser, so logs go to a file when one is set.
pub fn install_tracing(config: &Config) -> io::Result<()> {
    let filter =
        EnvFilter::try_new(log_directives(config)).unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_file.as_deref() {
        Some(path) => {
            let file = open_log_file(path)?;
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Without a log file, stderr only carries errors so it stays out of the way
/// of the terminal UI.
fn log_directives(config: &Config) -> &str {
    match config.log_file {
        Some(_) => config.log.as_str(),
        None => "error",
    }
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}
