//! Picks the registered project that a remote identity belongs to.

use crate::constants::ORIGIN_REMOTE;
use crate::remote::RemoteIdentity;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no project found with remote matching `{identity}`, use --project")]
pub(crate) struct NoMatchingProject {
    pub(crate) identity: String,
}

/// A project name together with the normalized identity of each of its remotes.
///
/// Remotes whose URL could not be normalized are simply absent from `remotes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProjectRemotes {
    pub(crate) name: String,
    pub(crate) remotes: BTreeMap<String, RemoteIdentity>,
}

impl ProjectRemotes {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remotes: BTreeMap::new(),
        }
    }

    pub(crate) fn with_remote(mut self, remote: &str, url: &str) -> Self {
        if let Some(identity) = RemoteIdentity::from_url(url) {
            self.remotes.insert(remote.to_string(), identity);
        }
        self
    }

    fn origin(&self) -> Option<&RemoteIdentity> {
        self.remotes.get(ORIGIN_REMOTE)
    }

    fn has_remote(&self, target: &RemoteIdentity) -> bool {
        self.remotes.values().any(|identity| identity == target)
    }
}

/// Returns the name of the project that best matches `target`.
///
/// Passes run in order and the first hit wins; within a pass, earlier entries of
/// `projects` win:
///
/// 1. the project's `origin` is exactly `target`;
/// 2. some remote is `target` and the `origin` repository name equals the
///    target's, which picks a personal fork over an unrelated repository that
///    merely tracks the same upstream;
/// 3. some remote, under any name, is `target`.
///
/// Pass 2 compares repository names only, so a fork that happens to share a
/// name with the target is preferred even when owners differ.
pub(crate) fn find_project_by_remote<'a>(
    target: &RemoteIdentity,
    projects: &'a [ProjectRemotes],
) -> Result<&'a str, NoMatchingProject> {
    if let Some(project) = projects
        .iter()
        .find(|project| project.origin() == Some(target))
    {
        tracing::debug!(project = %project.name, %target, "matched on origin");
        return Ok(&project.name);
    }

    if let Some(project) = projects.iter().find(|project| {
        project.has_remote(target)
            && project
                .origin()
                .is_some_and(|origin| origin.repo_name() == target.repo_name())
    }) {
        tracing::debug!(project = %project.name, %target, "matched fork via origin repo name");
        return Ok(&project.name);
    }

    if let Some(project) = projects.iter().find(|project| project.has_remote(target)) {
        tracing::debug!(project = %project.name, %target, "matched on non-origin remote");
        return Ok(&project.name);
    }

    Err(NoMatchingProject {
        identity: target.to_string(),
    })
}
