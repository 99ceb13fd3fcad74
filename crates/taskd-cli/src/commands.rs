use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use taskd_ingest::{IngestJobs, IngestPipeline, JobFailure, JobState};
use taskd_server::{ServerConfig, TaskServer};
use taskd_store::{Filter, Store};
use taskd_types::Task;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => {
            if let Some(bind) = args.bind {
                config.bind_addr = bind;
            }
            if let Some(csv) = args.csv {
                config.csv_path = csv;
            }
            cmd_serve(config).await
        }
        Command::Import(args) => cmd_import(config, args, &cli.format).await,
        Command::List(args) => cmd_list(config, args, &cli.format),
        Command::Config => cmd_config(&config),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    tracing::debug!(data = %config.data_path.display(), csv = %config.csv_path.display(), "configuration loaded");
    Ok(config)
}

fn open_store(config: &ServerConfig) -> anyhow::Result<Store> {
    Store::open_file(&config.data_path, config.collection_names())
        .with_context(|| format!("opening store at {}", config.data_path.display()))
}

async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    println!(
        "taskd on {} (data: {}, csv: {})",
        config.bind_addr.to_string().bold(),
        config.data_path.display(),
        config.csv_path.display()
    );
    TaskServer::new(config)?.serve().await?;
    Ok(())
}

async fn cmd_import(config: ServerConfig, args: ImportArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = Arc::new(open_store(&config)?);
    let source = args.path.unwrap_or_else(|| config.csv_path.clone());
    let pipeline = IngestPipeline::new(store, config.task_collection.clone())
        .with_delimiter(args.delimiter);
    let status = IngestJobs::new(pipeline).run(&source).await;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    match status.state {
        JobState::Completed { rows_inserted } => {
            if let OutputFormat::Text = format {
                println!("{} Imported {} tasks from {}", "✓".green().bold(), rows_inserted.to_string().bold(), source.display());
            }
            Ok(())
        }
        JobState::Failed { rows_inserted, failure } => {
            if let OutputFormat::Text = format {
                println!("{} Import stopped after {} tasks", "✗".red().bold(), rows_inserted.to_string().bold());
                match &failure {
                    JobFailure::InvalidRow { line, reason } => println!("  line {}: {}", line.to_string().yellow(), reason),
                    JobFailure::Source { reason } | JobFailure::Store { reason } => println!("  {}", reason),
                }
            }
            anyhow::bail!("import of {} failed", source.display())
        }
        JobState::Started | JobState::Reading { .. } => {
            anyhow::bail!("import of {} did not finish", source.display())
        }
    }
}

fn cmd_list(config: ServerConfig, args: ListArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let filter = args
        .search
        .filter(|term| !term.is_empty())
        .map(|term| Filter::search(&term));
    let tasks = store.select(&config.task_collection, filter.as_ref());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
        OutputFormat::Text => {
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                println!("{}", render_task(task));
            }
        }
    }
    Ok(())
}

fn render_task(task: &Task) -> String {
    let mark = if task.is_completed() { "✓".green() } else { "·".dimmed() };
    format!(
        "{} {}  {}: {}",
        mark,
        task.id.short_id().yellow(),
        task.title.bold(),
        task.description
    )
}

fn cmd_config(config: &ServerConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
