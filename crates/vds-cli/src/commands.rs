use std::io::Write;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;
use vds_engine::{DataStore, StoreConfig};
use vds_store::{ImmutableBlock, PutOutcome};
use vds_types::VersionName;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    debug!(root = %config.root.display(), max_disk_usage = config.max_disk_usage, "opening store");
    let store = DataStore::open(config.clone())
        .with_context(|| format!("cannot open store at {}", config.root.display()))?;

    let result = execute(&store, cli.command).await;
    store.shutdown();
    result
}

/// Config file first, then command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(max) = cli.max_disk_usage {
        config.max_disk_usage = max;
    }
    Ok(config)
}

async fn execute(store: &DataStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Put(args) => cmd_put(store, args).await,
        Command::Get(args) => cmd_get(store, args).await,
        Command::Delete(args) => {
            store.delete(args.name).await?;
            println!("{} Deleted {}", "✓".green(), args.name.to_string().yellow());
            Ok(())
        }
        Command::Usage => cmd_usage(store),
        Command::PutVersion(args) => cmd_put_version(store, args).await,
        Command::Versions(args) => cmd_versions(store, args).await,
        Command::Branch(args) => cmd_branch(store, args).await,
        Command::DeleteBranch(args) => cmd_delete_branch(store, args).await,
    }
}

async fn cmd_put(store: &DataStore, args: PutArgs) -> anyhow::Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let block = ImmutableBlock::new(data);
    let (name, size) = (block.name, block.size());

    match store.put(block).await? {
        PutOutcome::Stored => println!("{} Stored {} bytes", "✓".green().bold(), size),
        PutOutcome::AlreadyPresent => println!("{} Already present", "✓".green()),
    }
    println!("  Name: {}", name.to_string().yellow());
    println!("  Usage: {}", store.current_disk_usage());
    Ok(())
}

async fn cmd_get(store: &DataStore, args: GetArgs) -> anyhow::Result<()> {
    let data = store.get(args.name).await?.data;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &data)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("{} Wrote {} bytes to {}", "✓".green(), data.len(), path.display());
        }
        None => std::io::stdout().lock().write_all(&data)?,
    }
    Ok(())
}

fn cmd_usage(store: &DataStore) -> anyhow::Result<()> {
    let used = store.current_disk_usage().bytes();
    let max = store.max_disk_usage().bytes();
    let percent = used as f64 * 100.0 / max as f64;
    println!("Disk usage: {} / {} bytes ({:.1}%)", used.to_string().bold(), max, percent);
    Ok(())
}

async fn cmd_put_version(store: &DataStore, args: PutVersionArgs) -> anyhow::Result<()> {
    let pruned = store
        .put_version(args.kind, args.name, args.old, args.new)
        .await?;
    println!("{} Recorded {} ({})", "✓".green().bold(), args.new.to_string().yellow(), args.kind);
    for version in &pruned {
        println!("  {} {}", "pruned".dimmed(), version);
    }
    Ok(())
}

async fn cmd_versions(store: &DataStore, args: KeyArgs) -> anyhow::Result<()> {
    let tips = store.get_versions(args.kind, args.name).await?;
    if tips.is_empty() {
        println!("No versions.");
        return Ok(());
    }
    if tips.len() > 1 {
        println!("{} {} tips", "forked:".red().bold(), tips.len());
    }
    for tip in &tips {
        println!("* {}", tip.to_string().green());
    }
    Ok(())
}

async fn cmd_branch(store: &DataStore, args: VersionArgs) -> anyhow::Result<()> {
    let chain = store.get_branch(args.kind, args.name, args.version).await?;
    print_chain(&chain);
    Ok(())
}

async fn cmd_delete_branch(store: &DataStore, args: VersionArgs) -> anyhow::Result<()> {
    let removed = store
        .delete_branch_until_fork(args.kind, args.name, args.version)
        .await?;
    println!("{} Removed {} versions", "✓".green().bold(), removed.len());
    for version in &removed {
        println!("  {}", version.to_string().dimmed());
    }
    Ok(())
}

fn print_chain(chain: &[VersionName]) {
    for (depth, version) in chain.iter().enumerate() {
        let marker = if depth == 0 { "*" } else { "|" };
        println!("{} {}", marker.yellow(), version);
    }
}
