use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "taskd: task tracking service with an embedded snapshot store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file; unset keys take their defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Snapshot file (overrides `data_path`)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Bulk-load tasks from a CSV file into the store
    Import(ImportArgs),
    /// List tasks in the store
    List(ListArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// CSV file read by `POST /tasks/csv` (overrides `csv_path`)
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file to import (defaults to `csv_path`)
    pub path: Option<PathBuf>,
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks whose title and description both contain this text
    #[arg(short, long)]
    pub search: Option<String>,
}
