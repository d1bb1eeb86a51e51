mod cli;
mod config;
mod logging;
mod run;
mod serve;
mod tasks;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use crate::cli::{Cli, Command};
use crate::config::{DeferredLlm, RagbenchConfig};
use crate::tasks::TaskContext;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose || logging::env_flag());
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = RagbenchConfig::load(cli.config.as_deref())?;
    let model = DeferredLlm::from_config(&config)?;
    let ctx = TaskContext::from_config(&config, &model);
    match cli.command {
        Command::Task1 => tasks::task_1(&ctx),
        Command::Task2 => tasks::task_2(&ctx),
        Command::Task3 => tasks::task_3(&ctx),
        Command::Task4 => tasks::task_4(&ctx),
        Command::Task5 => tasks::task_5(&ctx),
        Command::Task6 { mode } => tasks::task_6(&ctx, mode),
        Command::Task7 => tasks::task_7(&ctx),
        Command::Task8 => tasks::task_8(&ctx),
        Command::Task9 => tasks::task_9(&ctx),
        Command::Task10 => tasks::task_10(&ctx),
        Command::All => run::run_all(&ctx),
        Command::Task11 { bind } => serve::run(&config, bind),
    }
}
