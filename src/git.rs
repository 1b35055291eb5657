use crate::constants::HEADS_REF_PREFIX;
use crate::process::{best_error_line, path_to_str, run_capture, run_checked};
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[error("worktree contains modified or untracked files: {}", .0.display())]
pub(crate) struct WorktreeDirty(pub(crate) PathBuf);

fn git(repo: &Path, args: &[&str]) -> Result<crate::process::CmdOutput> {
    run_capture("git", args, Some(repo)).context("failed to run git")
}

pub(crate) fn validate_repo(path: &Path) -> Result<()> {
    let output = git(path, &["rev-parse", "--git-dir"])?;
    if !output.success() {
        bail!("{} is not a git repository", path.display());
    }
    Ok(())
}

/// Names of the configured remotes, in the order git reports them.
pub(crate) fn list_remotes(repo: &Path) -> Result<Vec<String>> {
    let output = run_checked("git", &["remote"], Some(repo), "git remote")?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The fetch URL configured for `remote`, exactly as written in the repo config.
pub(crate) fn remote_url(repo: &Path, remote: &str) -> Result<String> {
    let output = run_checked(
        "git",
        &["remote", "get-url", remote],
        Some(repo),
        &format!("git remote get-url {remote}"),
    )?;
    Ok(output.stdout.trim().to_string())
}

pub(crate) fn is_ancestor(repo: &Path, branch: &str, target: &str) -> bool {
    git(repo, &["merge-base", "--is-ancestor", branch, target])
        .map(|output| output.success())
        .unwrap_or(false)
}

/// Branch names present on `remote`, from a single `git ls-remote --heads`.
pub(crate) fn remote_branch_names(repo: &Path, remote: &str) -> Result<HashSet<String>> {
    let output = run_checked(
        "git",
        &["ls-remote", "--heads", remote],
        Some(repo),
        "git ls-remote",
    )?;
    Ok(parse_ls_remote_heads(&output.stdout))
}

pub(crate) fn parse_ls_remote_heads(raw: &str) -> HashSet<String> {
    raw.lines()
        .filter_map(|line| line.split_once('\t'))
        .filter_map(|(_, reference)| reference.trim().strip_prefix(HEADS_REF_PREFIX))
        .map(str::to_string)
        .collect()
}

pub(crate) fn branch_exists(repo: &Path, branch: &str) -> bool {
    git(
        repo,
        &[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("{HEADS_REF_PREFIX}{branch}"),
        ],
    )
    .map(|output| output.success())
    .unwrap_or(false)
}

/// Branch checked out in `dir`, or `None` for a detached HEAD or a non-repo.
pub(crate) fn current_branch(dir: &Path) -> Option<String> {
    let output = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).ok()?;
    if !output.success() {
        return None;
    }
    let branch = output.stdout.trim();
    if branch.is_empty() || branch == "HEAD" {
        return None;
    }
    Some(branch.to_string())
}

pub(crate) fn worktree_root(dir: &Path) -> Option<PathBuf> {
    let output = git(dir, &["rev-parse", "--path-format=absolute", "--show-toplevel"]).ok()?;
    if !output.success() {
        return None;
    }
    let path = output.stdout.trim();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Branch checked out right after a clone, i.e. the remote's default branch.
pub(crate) fn default_branch(repo: &Path) -> Result<String> {
    let output = run_checked(
        "git",
        &["symbolic-ref", "--short", "HEAD"],
        Some(repo),
        "failed to detect default branch",
    )?;
    Ok(output.stdout.trim().to_string())
}

pub(crate) fn clone_repo(url: &str, dest: &Path) -> Result<()> {
    let dest = path_to_str(dest)?;
    run_checked("git", &["clone", url, dest], None, "git clone")?;
    Ok(())
}

/// Fetches `remote_branch` from `remote_url` into the local branch
/// `local_branch`. Used to pull pull-request heads from forks.
pub(crate) fn fetch_branch(
    repo: &Path,
    remote_url: &str,
    remote_branch: &str,
    local_branch: &str,
) -> Result<()> {
    let refspec = format!("{HEADS_REF_PREFIX}{remote_branch}:{HEADS_REF_PREFIX}{local_branch}");
    run_checked(
        "git",
        &["fetch", remote_url, &refspec],
        Some(repo),
        "git fetch",
    )?;
    Ok(())
}

/// Flattens a branch name into a single directory component so that
/// `feature/login` does not create nested directories.
pub(crate) fn safe_branch_dir(branch: &str) -> String {
    branch.replace('/', "-")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitWorktreeEntry {
    pub(crate) path: PathBuf,
    pub(crate) branch: Option<String>,
    pub(crate) bare: bool,
}

pub(crate) fn list_worktrees(repo: &Path) -> Result<Vec<GitWorktreeEntry>> {
    let output = git(repo, &["worktree", "list", "--porcelain"])?;
    if !output.success() {
        bail!(
            "failed to list git worktrees: {}",
            best_error_line(&output.stderr)
        );
    }
    Ok(parse_git_worktree_porcelain(&output.stdout))
}

pub(crate) fn find_worktree_by_branch(repo: &Path, branch: &str) -> Option<GitWorktreeEntry> {
    list_worktrees(repo)
        .ok()?
        .into_iter()
        .find(|tree| tree.branch.as_deref() == Some(branch))
}

/// Like [`find_worktree_by_branch`], but a missing worktree is an error.
pub(crate) fn require_worktree(
    repo: &Path,
    project: &str,
    branch: &str,
) -> Result<GitWorktreeEntry> {
    find_worktree_by_branch(repo, branch).with_context(|| {
        format!("no worktree found for branch `{branch}` in project `{project}`")
    })
}

pub(crate) fn parse_git_worktree_porcelain(raw: &str) -> Vec<GitWorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<GitWorktreeEntry> = None;

    for line in raw.lines() {
        if line.is_empty() {
            entries.extend(current.take());
            continue;
        }

        if let Some(value) = line.strip_prefix("worktree ") {
            entries.extend(current.take());
            current = Some(GitWorktreeEntry {
                path: PathBuf::from(value.trim()),
                branch: None,
                bare: false,
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if line == "bare" {
            entry.bare = true;
        } else if let Some(value) = line.strip_prefix("branch ") {
            let value = value.trim();
            let short = value.strip_prefix(HEADS_REF_PREFIX).unwrap_or(value);
            entry.branch = Some(short.to_string());
        }
    }

    entries.extend(current.take());
    entries
}

/// Creates a worktree at `path` checking out `branch`, creating the branch off
/// `base` when it does not exist yet.
pub(crate) fn add_worktree(repo: &Path, path: &Path, branch: &str, base: &str) -> Result<()> {
    let path = path_to_str(path)?;
    let args: Vec<&str> = if branch_exists(repo, branch) {
        vec!["worktree", "add", path, branch]
    } else {
        vec!["worktree", "add", "-b", branch, path, base]
    };
    run_checked("git", &args, Some(repo), "git worktree add")?;
    Ok(())
}

/// Removes the worktree at `path`. Without `force`, a dirty worktree fails
/// with [`WorktreeDirty`].
pub(crate) fn remove_worktree(repo: &Path, path: &Path, force: bool) -> Result<()> {
    let path_str = path_to_str(path)?;
    let mut args = vec!["worktree", "remove"];
    if force {
        args.push("--force");
    }
    args.push(path_str);

    let output = git(repo, &args)?;
    if output.success() {
        return Ok(());
    }
    if output.stderr.contains("modified or untracked") {
        return Err(WorktreeDirty(path.to_path_buf()).into());
    }
    bail!(
        "git worktree remove: {}",
        best_error_line(&output.stderr)
    );
}

/// Copies each repo-relative path in `files` from `repo` into `worktree`,
/// creating parent directories. Failures are returned as warnings; a missing
/// source is skipped.
pub(crate) fn copy_files(repo: &Path, worktree: &Path, files: &[String]) -> Vec<String> {
    place_files("copy", repo, worktree, files, |src, dst| {
        fs::copy(src, dst).map(|_| ())
    })
}

/// Symlinks each repo-relative path in `files` into `worktree`, pointing at
/// the absolute path under `repo`. An existing file at the destination is
/// replaced.
pub(crate) fn symlink_files(repo: &Path, worktree: &Path, files: &[String]) -> Vec<String> {
    place_files("symlink", repo, worktree, files, |src, dst| {
        if let Err(err) = fs::remove_file(dst)
            && err.kind() != ErrorKind::NotFound
        {
            return Err(err);
        }
        symlink(src, dst)
    })
}

fn place_files(
    action: &str,
    repo: &Path,
    worktree: &Path,
    files: &[String],
    place: impl Fn(&Path, &Path) -> std::io::Result<()>,
) -> Vec<String> {
    let mut warnings = Vec::new();
    for file in files {
        if !is_repo_relative(Path::new(file)) {
            warnings.push(format!("{action}: {file}: path must stay inside the repository"));
            continue;
        }
        let src = repo.join(file);
        let dst = worktree.join(file);
        if fs::symlink_metadata(&src).is_err() {
            warnings.push(format!("{action}: {file} not found, skipping"));
            continue;
        }
        let result = match dst.parent() {
            Some(parent) => fs::create_dir_all(parent),
            None => Ok(()),
        }
        .and_then(|()| place(&src, &dst));
        if let Err(err) = result {
            warnings.push(format!("{action}: {file}: {err}"));
        }
    }
    warnings
}

fn is_repo_relative(path: &Path) -> bool {
    !path.is_absolute()
        && path.components().all(|component| {
            !matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        })
}

pub(crate) fn paths_equal(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}
