//! Decides whether a worktree branch is safe to delete.

use crate::git::{GitWorktreeEntry, paths_equal};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PruneReason {
    /// Keep the branch.
    None,
    /// The branch is an ancestor of the target and can always be removed.
    Merged,
    /// The branch no longer exists on the remote. This is only a hint (for
    /// example a squash-merged branch deleted by the host) and needs
    /// confirmation before anything is removed.
    RemoteGone,
}

impl PruneReason {
    pub(crate) fn requires_confirmation(self) -> bool {
        self == Self::RemoteGone
    }
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "keep"),
            Self::Merged => write!(f, "merged"),
            Self::RemoteGone => write!(f, "remote branch gone"),
        }
    }
}

/// Classifies `branch` relative to `target`.
///
/// `remote_branches` is `None` when the remote could not be listed, in which
/// case the remote check is skipped. `Some` of an empty set means the remote
/// was listed and the branch is proven absent.
pub(crate) fn prune_check(
    branch: &str,
    target: &str,
    is_merged: bool,
    remote_branches: Option<&HashSet<String>>,
) -> PruneReason {
    let reason = if is_merged {
        PruneReason::Merged
    } else if remote_branches.is_some_and(|names| !names.contains(branch)) {
        PruneReason::RemoteGone
    } else {
        PruneReason::None
    };
    tracing::debug!(branch, target, %reason, "prune check");
    reason
}

/// Branches of `trees` worth checking: attached, non-bare worktrees other than
/// the main checkout at `repo_path` and the base branch itself.
pub(crate) fn plan_prune<'a>(
    trees: &'a [GitWorktreeEntry],
    base_branch: &str,
    repo_path: &Path,
) -> Vec<&'a str> {
    trees
        .iter()
        .filter(|tree| !tree.bare && !paths_equal(&tree.path, repo_path))
        .filter_map(|tree| tree.branch.as_deref())
        .filter(|branch| *branch != base_branch)
        .collect()
}

/// Upgrades a `RemoteGone` classification to a prune. An authoritative
/// `Some(true)` from the hosting service prunes without prompting; an unknown
/// or negative answer defers to `confirm`.
pub(crate) fn confirm_remote_gone(pr_merged: Option<bool>, confirm: impl FnOnce() -> bool) -> bool {
    if pr_merged == Some(true) {
        return true;
    }
    confirm()
}
