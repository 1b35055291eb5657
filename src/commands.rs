use crate::cli::{
    Cli, Commands, ProjectCommand, ProjectSource, SessionCommand, TreeCommand,
    parse_project_source,
};
use crate::config::{
    ConfigPaths, GlobalConfig, ProjectConfig, ResolvedProject, list_projects, load_project,
    remove_project, resolve_project, save_project, validate_project_name,
};
use crate::constants::{ISSUE_BRANCH_PREFIX, ORIGIN_REMOTE};
use crate::git::{
    WorktreeDirty, add_worktree, branch_exists, clone_repo, copy_files, current_branch,
    default_branch, fetch_branch, find_worktree_by_branch, is_ancestor, list_worktrees,
    paths_equal, remote_branch_names, remote_url, remove_worktree, require_worktree,
    symlink_files, validate_repo, worktree_root,
};
use crate::github::{fetch_pr_head, is_pr_merged};
use crate::infer::{collect_project_remotes, resolve_project_name};
use crate::link::{Link, LinkKind, is_hosted_url, parse_link, parse_repo_url};
use crate::prune::{PruneReason, confirm_remote_gone, plan_prune, prune_check};
use crate::remote::RemoteIdentity;
use crate::resolve::find_project_by_remote;
use crate::tmux;
use crate::ui::{confirm, progress};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

struct CommandContext {
    paths: ConfigPaths,
    project: Option<String>,
}

impl CommandContext {
    fn project_name(&self, cwd: &Path) -> Result<String> {
        resolve_project_name(&self.paths, self.project.as_deref(), cwd)
    }

    /// Projects a sweep should visit: the `--project` override, else all of them.
    fn sweep_names(&self) -> Result<Vec<String>> {
        match &self.project {
            Some(name) => Ok(vec![name.clone()]),
            None => list_projects(&self.paths),
        }
    }
}

fn current_dir() -> Result<PathBuf> {
    let cwd = env::current_dir()
        .context("failed to get working directory (was this worktree already removed?)")?;
    if !cwd.exists() {
        bail!("current directory no longer exists (was this worktree already removed?)");
    }
    Ok(cwd)
}

pub(crate) fn run(cli: Cli) -> Result<()> {
    let ctx = CommandContext {
        paths: ConfigPaths::discover()?,
        project: cli.global.project,
    };

    match cli.command {
        Commands::Project(command) => match command {
            ProjectCommand::Add { source, name } => {
                cmd_project_add(&ctx, &source, name.as_deref())
            }
            ProjectCommand::List { json } => cmd_project_list(&ctx, json),
            ProjectCommand::Remove { name } => cmd_project_remove(&ctx, &name),
            ProjectCommand::Infer => cmd_project_infer(&ctx),
        },
        Commands::Tree(command) => match command {
            TreeCommand::Add { target } => cmd_tree_add(&ctx, &target),
            TreeCommand::Switch { target } => cmd_tree_switch(&ctx, &target),
            TreeCommand::List { project, json } => cmd_tree_list(&ctx, project.as_deref(), json),
            TreeCommand::Remove { branch, force } => {
                cmd_tree_remove(&ctx, branch.as_deref(), force)
            }
            TreeCommand::Prune { dry_run } => cmd_tree_prune(&ctx, dry_run),
        },
        Commands::Session(command) => match command {
            SessionCommand::List => cmd_session_list(&ctx),
            SessionCommand::Kill { branch } => cmd_session_kill(&ctx, &branch),
        },
    }
}

fn cmd_project_add(ctx: &CommandContext, source: &str, name: Option<&str>) -> Result<()> {
    match parse_project_source(source) {
        ProjectSource::Path(path) => {
            register_project(ctx, &path, name)?;
            Ok(())
        }
        ProjectSource::Url(url) => add_project_from_url(ctx, &url, name),
    }
}

fn register_project(ctx: &CommandContext, repo: &Path, name: Option<&str>) -> Result<String> {
    let repo = repo
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", repo.display()))?;
    validate_repo(&repo)?;

    let name = match name {
        Some(name) => name.to_string(),
        None => repo
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a project name from {}", repo.display()))?,
    };

    save_project(&ctx.paths, &name, &ProjectConfig::new(repo.clone()))?;
    println!("Registered project `{name}` ({})", repo.display());
    Ok(name)
}

fn add_project_from_url(ctx: &CommandContext, url: &str, name: Option<&str>) -> Result<()> {
    let info = parse_repo_url(url)?;
    let name = name.unwrap_or(info.repo.as_str());
    validate_project_name(name)?;

    let global = GlobalConfig::load(&ctx.paths)?;
    let base_dir = match global.projects_dir {
        Some(dir) => dir,
        None => current_dir()?,
    };
    fs::create_dir_all(&base_dir)
        .with_context(|| format!("failed to create {}", base_dir.display()))?;
    let dest = base_dir.join(name);

    progress(&format!(
        "project add: cloning {}/{} into {}",
        info.owner,
        info.repo,
        dest.display()
    ));
    clone_repo(&info.clone_url, &dest)?;
    let name = register_project(ctx, &dest, Some(name))?;

    if !tmux::is_running() {
        tracing::debug!("tmux not running, skipping session");
        return Ok(());
    }
    let resolved = resolve_project(&ctx.paths, &name)?;
    let branch = default_branch(&resolved.repo)?;
    open_tree(&resolved, &branch)
}

#[derive(Debug, Serialize)]
struct JsonProjectRow {
    name: String,
    repo: String,
}

fn cmd_project_list(ctx: &CommandContext, as_json: bool) -> Result<()> {
    let mut rows = Vec::new();
    for name in list_projects(&ctx.paths)? {
        let project = load_project(&ctx.paths, &name)?;
        rows.push(JsonProjectRow {
            name,
            repo: project.repo.display().to_string(),
        });
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No projects registered.");
        return Ok(());
    }

    println!("{:<24} REPO", "PROJECT");
    for row in rows {
        println!("{:<24} {}", row.name, row.repo);
    }
    Ok(())
}

fn cmd_project_remove(ctx: &CommandContext, name: &str) -> Result<()> {
    if remove_project(&ctx.paths, name)? {
        println!("Removed project `{name}`");
    } else {
        println!("Project `{name}` is not registered");
    }
    Ok(())
}

fn cmd_project_infer(ctx: &CommandContext) -> Result<()> {
    let cwd = current_dir()?;
    println!("{}", ctx.project_name(&cwd)?);
    Ok(())
}

fn cmd_tree_add(ctx: &CommandContext, target: &str) -> Result<()> {
    let (resolved, branch) = resolve_tree_target(ctx, "tree add", target)?;
    open_tree(&resolved, &branch)
}

fn cmd_tree_switch(ctx: &CommandContext, target: &str) -> Result<()> {
    let (resolved, branch) = resolve_tree_target(ctx, "tree switch", target)?;
    let existing = require_worktree(&resolved.repo, &resolved.name, &branch)?;

    let session = tmux::session_name(&resolved.name, &branch);
    tmux::open_session(&session, &existing.path, &resolved.layout)?;
    tmux::switch_to(&session)
}

/// Project and branch named by a `tree` argument. A hosted link picks the
/// project by its remote; a plain branch uses `--project` or inference.
fn resolve_tree_target(
    ctx: &CommandContext,
    action: &str,
    target: &str,
) -> Result<(ResolvedProject, String)> {
    if !is_hosted_url(target) {
        let name = ctx.project_name(&current_dir()?)?;
        return Ok((resolve_project(&ctx.paths, &name)?, target.to_string()));
    }

    let link = parse_link(target)?;
    let projects = collect_project_remotes(&ctx.paths)?;
    let name = find_project_by_remote(&link.identity(), &projects)?;
    progress(&format!("{action}: {} {link} belongs to `{name}`", link.kind));
    let resolved = resolve_project(&ctx.paths, name)?;
    let branch = link_branch(&link, &resolved.repo)?;
    Ok((resolved, branch))
}

/// Branch a link maps to: `issue-<n>` for issues, the head branch for pull
/// requests. Pull request heads are fetched locally when missing.
fn link_branch(link: &Link, repo: &Path) -> Result<String> {
    match link.kind {
        LinkKind::Issue => Ok(format!("{ISSUE_BRANCH_PREFIX}{}", link.number)),
        LinkKind::PullRequest => {
            let head = fetch_pr_head(&link.identity(), link.number)
                .with_context(|| format!("failed to look up pull request {link}"))?;
            if !branch_exists(repo, &head.branch) {
                let source = if head.is_fork {
                    head.clone_url.as_str()
                } else {
                    ORIGIN_REMOTE
                };
                progress(&format!("tree add: fetching `{}` from {source}", head.branch));
                fetch_branch(repo, source, &head.branch, &head.branch)?;
            }
            Ok(head.branch)
        }
    }
}

/// Reuses or creates the worktree for `branch`, then opens and switches to
/// its tmux session when running inside tmux.
fn open_tree(resolved: &ResolvedProject, branch: &str) -> Result<()> {
    let worktree = ensure_worktree(resolved, branch)?;

    if !tmux::is_running() {
        println!("Worktree path: {}", worktree.display());
        return Ok(());
    }

    let session = tmux::session_name(&resolved.name, branch);
    tmux::open_session(&session, &worktree, &resolved.layout)?;
    tracing::debug!(%session, "switching to tmux session");
    tmux::switch_to(&session)
}

fn ensure_worktree(resolved: &ResolvedProject, branch: &str) -> Result<PathBuf> {
    let project = &resolved.name;
    if let Some(existing) = find_worktree_by_branch(&resolved.repo, branch) {
        println!("Worktree {project}/{branch} already exists");
        return Ok(existing.path);
    }

    let path = resolved.worktree_path(branch);
    tracing::debug!(path = %path.display(), base = %resolved.branch, "creating worktree");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    add_worktree(&resolved.repo, &path, branch, &resolved.branch)?;
    println!("Created worktree {project}/{branch}");

    let warnings = copy_files(&resolved.repo, &path, &resolved.copy)
        .into_iter()
        .chain(symlink_files(&resolved.repo, &path, &resolved.symlink));
    for warning in warnings {
        progress(&format!("warning: {warning}"));
    }
    Ok(path)
}

#[derive(Debug, Serialize)]
struct JsonTreeRow {
    project: String,
    branch: String,
    path: String,
}

fn cmd_tree_list(ctx: &CommandContext, project: Option<&str>, as_json: bool) -> Result<()> {
    let names = match project.or(ctx.project.as_deref()) {
        Some(name) => vec![name.to_string()],
        None => list_projects(&ctx.paths)?,
    };

    let mut rows = Vec::new();
    for name in names {
        let config = load_project(&ctx.paths, &name)?;
        for tree in list_worktrees(&config.repo)? {
            let Some(branch) = tree.branch.filter(|_| !tree.bare) else {
                continue;
            };
            rows.push(JsonTreeRow {
                project: name.clone(),
                branch,
                path: tree.path.display().to_string(),
            });
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No worktrees found.");
        return Ok(());
    }

    println!("{:<20} {:<32} PATH", "PROJECT", "BRANCH");
    for row in rows {
        println!("{:<20} {:<32} {}", row.project, row.branch, row.path);
    }
    Ok(())
}

fn cmd_tree_remove(ctx: &CommandContext, branch: Option<&str>, force: bool) -> Result<()> {
    let (project, branch) = match branch {
        Some(branch) => (ctx.project_name(&current_dir()?)?, branch.to_string()),
        None => {
            let (project, branch) = detect_current_worktree(&ctx.paths, &current_dir()?)?;
            if !confirm(&format!("Remove worktree {project}/{branch}? [y/N] ")) {
                return Ok(());
            }
            (project, branch)
        }
    };

    let resolved = resolve_project(&ctx.paths, &project)?;
    if let Err(err) = remove_tree(&resolved, &branch, force) {
        if err.downcast_ref::<WorktreeDirty>().is_none() {
            return Err(err);
        }
        println!("Worktree {project}/{branch} has modified or untracked files.");
        if !confirm("Force remove? [y/N] ") {
            return Ok(());
        }
        remove_tree(&resolved, &branch, true)?;
    }

    println!("Removed worktree {project}/{branch}");
    Ok(())
}

/// Finds the registered project and branch whose worktree contains `cwd`.
fn detect_current_worktree(paths: &ConfigPaths, cwd: &Path) -> Result<(String, String)> {
    let branch = current_branch(cwd).context("not in a git worktree")?;
    let root = worktree_root(cwd).context("could not determine worktree root")?;

    for name in list_projects(paths)? {
        let Ok(config) = load_project(paths, &name) else {
            continue;
        };
        let Ok(trees) = list_worktrees(&config.repo) else {
            continue;
        };
        if let Some(tree) = trees.iter().find(|tree| paths_equal(&tree.path, &root)) {
            let branch = tree.branch.clone().unwrap_or(branch);
            return Ok((name, branch));
        }
    }

    bail!("current directory is not a registered worktree");
}

/// Kills the branch's tmux session and removes its worktree.
fn remove_tree(resolved: &ResolvedProject, branch: &str, force: bool) -> Result<()> {
    let existing = require_worktree(&resolved.repo, &resolved.name, branch)?;

    let session = tmux::session_name(&resolved.name, branch);
    if let Err(err) = tmux::kill_session(&session) {
        tracing::debug!(%session, error = %err, "could not kill tmux session");
    }

    remove_worktree(&resolved.repo, &existing.path, force)
}

fn cmd_session_list(ctx: &CommandContext) -> Result<()> {
    let mut found = 0usize;
    for name in list_projects(&ctx.paths)? {
        let config = load_project(&ctx.paths, &name)
            .with_context(|| format!("failed to load project `{name}`"))?;
        let trees = list_worktrees(&config.repo)
            .with_context(|| format!("failed to list worktrees for `{name}`"))?;

        for (session, branch) in tmux::worktree_sessions(&name, &trees) {
            if !tmux::session_exists(&session) {
                continue;
            }
            if found == 0 {
                println!("{:<32} {:<20} BRANCH", "SESSION", "PROJECT");
            }
            println!("{session:<32} {name:<20} {branch}");
            found += 1;
        }
    }

    if found == 0 {
        println!("No active sessions.");
    }
    Ok(())
}

fn cmd_session_kill(ctx: &CommandContext, branch: &str) -> Result<()> {
    let project = ctx.project_name(&current_dir()?)?;
    let session = tmux::session_name(&project, branch);
    if !tmux::session_exists(&session) {
        bail!("session `{session}` does not exist");
    }
    tmux::kill_session(&session)?;
    println!("Killed session {session}");
    Ok(())
}

fn cmd_tree_prune(ctx: &CommandContext, dry_run: bool) -> Result<()> {
    let mut pruned = 0usize;

    for name in ctx.sweep_names()? {
        let resolved = resolve_project(&ctx.paths, &name)?;
        let repo = resolved.repo.as_path();
        let trees = list_worktrees(repo)?;

        // One ls-remote per project; a failure only disables the remote check.
        let remote_branches = match remote_branch_names(repo, ORIGIN_REMOTE) {
            Ok(names) => Some(names),
            Err(err) => {
                tracing::debug!(project = %name, error = %err, "could not list remote branches");
                None
            }
        };
        let origin = remote_url(repo, ORIGIN_REMOTE)
            .ok()
            .and_then(|url| RemoteIdentity::from_url(&url));

        for branch in plan_prune(&trees, &resolved.branch, repo) {
            let merged = is_ancestor(repo, branch, &resolved.branch);
            let reason = prune_check(branch, &resolved.branch, merged, remote_branches.as_ref());
            if reason == PruneReason::None {
                continue;
            }
            if reason.requires_confirmation()
                && !should_prune_remote_gone(origin.as_ref(), &name, branch)
            {
                continue;
            }

            if dry_run {
                println!("would prune {name}/{branch} ({reason})");
                pruned += 1;
                continue;
            }

            if let Err(err) = remove_tree(&resolved, branch, true) {
                tracing::warn!(project = %name, %branch, error = %err, "prune failed");
                println!("failed to prune {name}/{branch}: {err:#}");
                continue;
            }
            println!("pruned {name}/{branch} ({reason})");
            pruned += 1;
        }
    }

    if pruned == 0 {
        println!("Nothing to prune.");
    }
    Ok(())
}

/// Asks the hosting service whether a merged pull request exists for the
/// branch, and falls back to prompting when it cannot confirm.
fn should_prune_remote_gone(
    origin: Option<&RemoteIdentity>,
    project: &str,
    branch: &str,
) -> bool {
    let pr_merged = origin.and_then(|repo| match is_pr_merged(repo, branch) {
        Ok(merged) => Some(merged),
        Err(err) => {
            tracing::debug!(
                %branch,
                error = %err,
                "gh pull request check failed, falling back to prompt"
            );
            None
        }
    });

    confirm_remote_gone(pr_merged, || {
        confirm(&format!(
            "Branch {project}/{branch} is gone from the remote but may not be merged. Remove? [y/N] "
        ))
    })
}
