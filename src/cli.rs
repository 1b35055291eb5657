use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "copse",
    version,
    about = "Manage git worktrees paired with tmux sessions"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Args)]
pub(crate) struct GlobalArgs {
    /// Enable debug logging on stderr.
    #[arg(long, global = true)]
    pub(crate) verbose: bool,
    /// Project name. Inferred from the working directory's remotes when omitted.
    #[arg(short = 'p', long, global = true)]
    pub(crate) project: Option<String>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Register, list, and remove projects.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Create, list, remove, and prune worktrees.
    #[command(subcommand)]
    #[command(alias = "t")]
    Tree(TreeCommand),
    /// List and kill the tmux sessions of worktrees.
    #[command(subcommand)]
    #[command(alias = "s")]
    Session(SessionCommand),
}

#[derive(Debug, Subcommand)]
pub(crate) enum ProjectCommand {
    /// Register a local repository, or clone and register a hosted repository URL.
    Add {
        /// Repository path or hosted repository URL.
        source: String,
        /// Project name. Defaults to the repository directory name.
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered projects.
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        json: bool,
    },
    /// Unregister a project. The repository itself is left alone.
    #[command(alias = "rm")]
    Remove { name: String },
    /// Print the project the current directory belongs to.
    Infer,
}

#[derive(Debug, Subcommand)]
pub(crate) enum TreeCommand {
    /// Create (or reuse) a worktree and open its tmux session.
    Add {
        /// Branch name, or an issue / pull request link.
        target: String,
    },
    /// Switch to the tmux session of an existing worktree, recreating the
    /// session if it is gone. Never creates a worktree.
    #[command(alias = "sw")]
    Switch {
        /// Branch name, or an issue / pull request link.
        target: String,
    },
    /// List worktrees of one or all projects.
    #[command(alias = "ls")]
    List {
        project: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Remove a worktree and its tmux session. Detects the current worktree when
    /// no branch is given.
    #[command(alias = "rm")]
    Remove {
        branch: Option<String>,
        /// Remove even when the worktree has modified or untracked files.
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Remove worktrees whose branches were merged or deleted on the remote.
    Prune {
        /// Show what would be pruned without removing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum SessionCommand {
    /// List running sessions that belong to registered worktrees.
    #[command(alias = "ls")]
    List,
    /// Kill a worktree's session and keep the worktree.
    Kill { branch: String },
}

/// Interpretation of `project add <source>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProjectSource {
    Path(PathBuf),
    Url(String),
}

pub(crate) fn parse_project_source(source: &str) -> ProjectSource {
    if crate::link::is_hosted_url(source) {
        ProjectSource::Url(source.to_string())
    } else {
        ProjectSource::Path(PathBuf::from(source))
    }
}
