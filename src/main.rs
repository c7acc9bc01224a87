mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use graph::{Commit, CommitRegistry, GraphError, GraphQuery, LogReader, SystemRunner};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthChar;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "logdag")]
#[command(about = "Build a commit graph from streamed git log output", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// Path to the repository
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Ref to read history from
    #[arg(short, long = "ref")]
    reference: Option<String>,
    /// Maximum number of commits
    #[arg(short = 'n', long)]
    count: Option<usize>,
    /// Config file (defaults to logdag.toml in the repository)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List commits oldest first with their generation
    Log {
        #[command(flatten)]
        query: QueryArgs,
        /// Truncate subjects to this display width
        #[arg(short, long, default_value = "72")]
        width: usize,
    },
    /// Show one commit with its parents and children
    Show {
        #[command(flatten)]
        query: QueryArgs,
        /// Full commit id
        #[arg(long)]
        id: String,
    },
    /// Print graph statistics
    Stats {
        #[command(flatten)]
        query: QueryArgs,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_reader(args: &QueryArgs) -> Result<LogReader<SystemRunner>> {
    let config = Config::resolve(args.config.as_deref(), &args.path)?;
    let mut settings = config.log.query_settings();
    if let Some(reference) = &args.reference {
        settings.reference = reference.clone();
    }
    if let Some(count) = args.count {
        settings.count = count;
    }
    tracing::debug!(?settings, path = %args.path.display(), "opening history");

    let reader = LogReader::new(
        GraphQuery::from_settings(settings),
        CommitRegistry::new(),
        SystemRunner::in_dir(&args.path),
    );
    Ok(reader.with_program(config.log.git))
}

fn drain(reader: &mut LogReader<SystemRunner>) -> Result<()> {
    while reader.next_commit().context("Failed to read history")?.is_some() {}
    Ok(())
}

/// Cut `text` to at most `width` display columns, marking the cut with `…`
fn truncate(text: &str, width: usize) -> String {
    let full: usize = text.chars().filter_map(|c| c.width()).sum();
    if full <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn format_line(commit: &Commit, width: usize) -> String {
    let tags: Vec<&str> = commit.tags().collect();
    let tags = if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    };
    format!(
        "{} g{}{} {}",
        commit.short_id(),
        commit.generation(),
        tags,
        truncate(commit.subject().unwrap_or(""), width)
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Log { query, width } => {
            let mut reader = open_reader(&query)?;
            while let Some(handle) = reader.next_commit().context("Failed to read history")? {
                if let Some(commit) = reader.commit(handle) {
                    println!("{}", format_line(commit, width));
                }
            }
        }
        Commands::Show { query, id } => {
            let mut reader = open_reader(&query)?;
            drain(&mut reader)?;

            let commit = match reader.get(&id) {
                Ok(commit) => commit,
                Err(GraphError::NotFound(id)) => anyhow::bail!("Commit {} is not in the requested history", id),
                Err(err) => return Err(err.into()),
            };
            let ids = |handles: &[graph::CommitHandle]| -> Vec<String> {
                handles
                    .iter()
                    .filter_map(|&h| reader.commit(h))
                    .map(|c| c.id().to_string())
                    .collect()
            };

            println!("commit     {}", commit.id());
            println!("generation {}", commit.generation());
            if let Some(author) = commit.author() {
                println!("author     {}", author);
            }
            match commit.authored_at() {
                Some(when) => println!("date       {}", when.to_rfc3339()),
                None => {
                    if let Some(date) = commit.authored_date() {
                        println!("date       {}", date);
                    }
                }
            }
            let tags: Vec<&str> = commit.tags().collect();
            if !tags.is_empty() {
                println!("tags       {}", tags.join(", "));
            }
            for parent in ids(commit.parents()) {
                println!("parent     {}", parent);
            }
            for child in ids(commit.children()) {
                println!("child      {}", child);
            }
            if let Some(subject) = commit.subject() {
                println!("\n    {}", subject);
            }
        }
        Commands::Stats { query } => {
            let mut reader = open_reader(&query)?;
            drain(&mut reader)?;

            let stats = reader.stats();
            println!("Total commits:  {}", stats.total_commits);
            println!("Total edges:    {}", stats.total_edges);
            println!("Merge commits:  {}", stats.merge_commits);
            println!("Root commits:   {}", stats.root_commits);
            println!("Leaf commits:   {}", stats.leaf_commits);
            println!("Max generation: {}", stats.max_generation);
            if stats.has_orphans {
                println!("History has more than one root");
            }
        }
    }

    Ok(())
}
