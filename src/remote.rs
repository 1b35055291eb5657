//! Transport-agnostic identity of a git remote.
//!
//! HTTPS and SSH URLs that point at the same hosted repository collapse to the
//! same `owner/repo` string, so remotes can be compared without caring how
//! each clone was configured.

use std::fmt;

/// Canonicalizes a raw remote URL into its `owner/repo` path.
///
/// Accepted shapes:
///
/// ```text
/// https://github.com/owner/repo.git
/// https://github.com/owner/repo/
/// ssh://git@github.com/owner/repo.git
/// git@github.com:owner/repo.git
/// owner/repo
/// ```
///
/// The transport prefix (`scheme://[user@]host/` or `user@host:`) is removed,
/// then any trailing `/` and `.git` suffixes. No case folding is applied and the
/// function is idempotent.
pub(crate) fn normalize_remote_url(raw: &str) -> String {
    let mut path = strip_transport(raw.trim());
    loop {
        if let Some(rest) = path.strip_suffix('/') {
            path = rest;
        } else if let Some(rest) = path.strip_suffix(".git") {
            path = rest;
        } else {
            break;
        }
    }
    path.trim_start_matches('/').to_string()
}

fn strip_transport(raw: &str) -> &str {
    if let Some((_, after_scheme)) = raw.split_once("://") {
        return after_scheme
            .split_once('/')
            .map_or("", |(_authority, path)| path);
    }

    // scp-like syntax: `user@host:path`. A colon after the first slash belongs
    // to the path, not to a host separator.
    if let Some((host, path)) = raw.split_once(':')
        && !host.contains('/')
        && host.contains('@')
    {
        return path;
    }

    raw
}

/// A normalized `owner/repo` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoteIdentity(String);

impl RemoteIdentity {
    /// Normalizes `raw` and keeps it only when it has a usable `owner/repo`
    /// shape. Malformed remotes yield `None`.
    pub(crate) fn from_url(raw: &str) -> Option<Self> {
        let normalized = normalize_remote_url(raw);
        let (owner, repo) = normalized.rsplit_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self(normalized))
    }

    pub(crate) fn from_parts(owner: &str, repo: &str) -> Self {
        Self(format!("{owner}/{repo}"))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    /// The repository component: everything after the last `/`.
    pub(crate) fn repo_name(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, repo)| repo)
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
