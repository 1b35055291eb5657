use crate::config::{ConfigPaths, list_projects, load_project};
use crate::git::{list_remotes, remote_url};
use crate::remote::RemoteIdentity;
use crate::resolve::{ProjectRemotes, find_project_by_remote};
use anyhow::{Result, bail};
use std::path::Path;

/// Reads the remotes of `repo`. Remotes that fail to resolve or normalize are
/// left out rather than failing the whole project.
pub(crate) fn read_project_remotes(name: &str, repo: &Path) -> Result<ProjectRemotes> {
    let mut project = ProjectRemotes::new(name);
    for remote in list_remotes(repo)? {
        match remote_url(repo, &remote) {
            Ok(url) => project = project.with_remote(&remote, &url),
            Err(err) => {
                tracing::debug!(project = name, %remote, error = %err, "skipping remote");
            }
        }
    }
    Ok(project)
}

/// Remote identities of every registered project, in project-name order.
/// Projects whose config or repository cannot be read are skipped.
pub(crate) fn collect_project_remotes(paths: &ConfigPaths) -> Result<Vec<ProjectRemotes>> {
    let mut projects = Vec::new();
    for name in list_projects(paths)? {
        let project = match load_project(paths, &name) {
            Ok(project) => project,
            Err(err) => {
                tracing::debug!(project = %name, error = %err, "skipping project");
                continue;
            }
        };
        match read_project_remotes(&name, &project.repo) {
            Ok(remotes) => projects.push(remotes),
            Err(err) => {
                tracing::debug!(project = %name, error = %err, "skipping project remotes");
            }
        }
    }
    Ok(projects)
}

/// Finds the registered project that owns `dir` by trying each of its remotes
/// against the registered projects, in the order git lists the remotes.
pub(crate) fn infer_project_from_dir(dir: &Path, projects: &[ProjectRemotes]) -> Result<String> {
    let Ok(remotes) = list_remotes(dir) else {
        bail!("not in a git repository, use --project");
    };

    for remote in remotes {
        let Some(identity) = remote_url(dir, &remote)
            .ok()
            .and_then(|url| RemoteIdentity::from_url(&url))
        else {
            continue;
        };
        if let Ok(name) = find_project_by_remote(&identity, projects) {
            return Ok(name.to_string());
        }
    }

    bail!("no registered project matches current repository, use --project");
}

/// The `--project` override when given, otherwise the project inferred from
/// `cwd`.
pub(crate) fn resolve_project_name(
    paths: &ConfigPaths,
    override_name: Option<&str>,
    cwd: &Path,
) -> Result<String> {
    if let Some(name) = override_name {
        return Ok(name.to_string());
    }
    let projects = collect_project_remotes(paths)?;
    infer_project_from_dir(cwd, &projects)
}
