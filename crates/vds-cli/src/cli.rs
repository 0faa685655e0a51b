use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vds_types::{DataKind, Digest, VersionName};

#[derive(Parser)]
#[command(
    name = "vds",
    about = "Vault data store: content-addressed blocks and version histories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store root (overrides the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disk usage ceiling in bytes (overrides the config file)
    #[arg(long, global = true)]
    pub max_disk_usage: Option<u64>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as an immutable block
    Put(PutArgs),
    /// Fetch a block by name
    Get(GetArgs),
    /// Delete a block by name
    Delete(DeleteArgs),
    /// Show current disk usage
    Usage,
    /// Record a new version of a named datum
    PutVersion(PutVersionArgs),
    /// List current tips of a history
    Versions(KeyArgs),
    /// Show the chain from a version back to the root
    Branch(VersionArgs),
    /// Delete a branch back to its nearest fork
    DeleteBranch(VersionArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub name: Digest,
    /// Write the block here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub name: Digest,
}

#[derive(Args)]
pub struct KeyArgs {
    /// immutable, mutable-owned, appendable or signature-only
    pub kind: DataKind,
    pub name: Digest,
}

#[derive(Args)]
pub struct PutVersionArgs {
    pub kind: DataKind,
    pub name: Digest,
    /// Predecessor as INDEX:ID; omit for the first version
    #[arg(long)]
    pub old: Option<VersionName>,
    /// New version as INDEX:ID
    pub new: VersionName,
}

#[derive(Args)]
pub struct VersionArgs {
    pub kind: DataKind,
    pub name: Digest,
    /// Version as INDEX:ID
    pub version: VersionName,
}
