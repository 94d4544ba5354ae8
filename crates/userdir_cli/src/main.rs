//! `userdir` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and environment.
//! - Bootstrap logging and the user store, then hand off to the shell.

mod shell;
mod table;

use clap::Parser;
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use userdir_core::{
    core_version, default_log_level, init_logging, open_db, SqliteUserRepository, UserService,
};

use crate::shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "userdir")]
#[command(about = "Create, read, update and delete users in a local SQLite directory.")]
#[command(version)]
struct Cli {
    #[arg(long, env = "USERDIR_DB", default_value = "users.db", help = "SQLite database file")]
    db: PathBuf,

    #[arg(
        long,
        env = "USERDIR_LOG_LEVEL",
        help = "trace|debug|info|warn|error (defaults by build mode)"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        env = "USERDIR_LOG_DIR",
        help = "Absolute directory for rolling log files; logging is off when unset"
    )]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("userdir: failed to initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("userdir: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("event=cli_start module=cli status=ok version={}", core_version());

    // Schema setup runs once; repository calls then open their own connections.
    drop(open_db(&cli.db)?);
    let repo = SqliteUserRepository::try_new(&cli.db)?;
    let service = UserService::new(repo);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut shell = Shell::new(stdin.lock(), stdout.lock(), service);
    shell.run()?;

    info!("event=cli_exit module=cli status=ok");
    Ok(())
}
