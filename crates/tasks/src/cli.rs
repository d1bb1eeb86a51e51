use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::tasks::Task6Mode;

#[derive(Parser, Debug)]
#[command(name = "ragbench", about = "Retrieval-augmented generation tasks")]
pub struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    /// TOML config file; defaults to `ragbench.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a hello-world banner.
    Task1,
    /// Send a fixed prompt and save the reply.
    Task2,
    /// Extract three insights from the Christmas passage.
    Task3,
    /// Write the ground truth benchmark.
    Task4,
    /// Build the needle-in-haystack knowledge base.
    Task5,
    /// Predict insights from the knowledge base or evaluate their recall.
    Task6 {
        #[arg(long, value_enum, default_value = "evaluate")]
        mode: Task6Mode,
    },
    /// Chunk the documents in the data directory.
    Task7,
    /// Embed the chunks.
    Task8,
    /// Retrieve the nearest and furthest chunks for the ground-truth query.
    Task9,
    /// Generate cited insights from the retrieved chunks and judge recall.
    Task10,
    /// Serve the search page and query endpoint.
    Task11 {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run tasks 1 through 10 in order.
    All,
}
