use crate::constants::{
    APP_NAME, CONFIG_DIR_ENV, DEFAULT_BASE_BRANCH, GLOBAL_CONFIG_FILE, PROJECT_CONFIG_EXT,
    PROJECTS_SUBDIR, WORKTREES_SUBDIR,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Where configuration lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigPaths {
    root: PathBuf,
}

impl ConfigPaths {
    pub(crate) fn discover() -> Result<Self> {
        if let Some(dir) = env::var_os(CONFIG_DIR_ENV)
            && !dir.is_empty()
        {
            return Ok(Self::at(PathBuf::from(dir)));
        }
        let base = dirs::config_dir().context("could not determine the user config directory")?;
        Ok(Self::at(base.join(APP_NAME)))
    }

    pub(crate) fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn global_file(&self) -> PathBuf {
        self.root.join(GLOBAL_CONFIG_FILE)
    }

    pub(crate) fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_SUBDIR)
    }

    pub(crate) fn project_file(&self, name: &str) -> PathBuf {
        self.projects_dir().join(format!("{name}.{PROJECT_CONFIG_EXT}"))
    }
}

/// One tmux window of a session layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Window {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) command: String,
}

#[derive(Debug, Deserialize, Default)]
struct PartialGlobalConfig {
    worktree_dir: Option<String>,
    branch: Option<String>,
    projects_dir: Option<String>,
    #[serde(default)]
    layout: Vec<Window>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlobalConfig {
    pub(crate) worktree_dir: PathBuf,
    pub(crate) branch: String,
    /// Clone destination for `project add <url>`; the cwd when unset.
    pub(crate) projects_dir: Option<PathBuf>,
    pub(crate) layout: Vec<Window>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            worktree_dir: default_worktree_dir(),
            branch: DEFAULT_BASE_BRANCH.to_string(),
            projects_dir: None,
            layout: Vec::new(),
        }
    }
}

fn default_worktree_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".local").join("share"))
        .join(APP_NAME)
        .join(WORKTREES_SUBDIR)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl GlobalConfig {
    /// Reads the global file, falling back to defaults when it is missing and
    /// for every field left blank.
    pub(crate) fn load(paths: &ConfigPaths) -> Result<Self> {
        let mut config = Self::default();
        let path = paths.global_file();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(config),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config file {}", path.display()));
            }
        };
        let parsed: PartialGlobalConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        if let Some(worktree_dir) = non_blank(parsed.worktree_dir) {
            config.worktree_dir = expand_path(&worktree_dir);
        }
        if let Some(branch) = non_blank(parsed.branch) {
            config.branch = branch;
        }
        config.projects_dir = non_blank(parsed.projects_dir).map(|dir| expand_path(&dir));
        config.layout = parsed.layout;
        Ok(config)
    }
}

/// Per-project overrides. Unset fields fall through to [`GlobalConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProjectConfig {
    pub(crate) repo: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) worktree_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) branch: Option<String>,
    /// Repo-relative files copied into each new worktree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) copy: Vec<String>,
    /// Repo-relative files symlinked into each new worktree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) symlink: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) layout: Vec<Window>,
}

impl ProjectConfig {
    pub(crate) fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            ..Self::default()
        }
    }
}

/// A project's effective settings after merging its overrides onto the global
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedProject {
    pub(crate) name: String,
    pub(crate) repo: PathBuf,
    pub(crate) worktree_dir: PathBuf,
    pub(crate) branch: String,
    pub(crate) copy: Vec<String>,
    pub(crate) symlink: Vec<String>,
    pub(crate) layout: Vec<Window>,
}

impl ResolvedProject {
    pub(crate) fn merge(name: &str, global: GlobalConfig, project: ProjectConfig) -> Self {
        let worktree_dir = non_blank(project.worktree_dir)
            .map(|dir| expand_path(&dir))
            .unwrap_or(global.worktree_dir);
        let branch = non_blank(project.branch).unwrap_or(global.branch);
        let layout = if project.layout.is_empty() {
            global.layout
        } else {
            project.layout
        };
        Self {
            name: name.to_string(),
            repo: project.repo,
            worktree_dir,
            branch,
            copy: project.copy,
            symlink: project.symlink,
            layout,
        }
    }

    /// Directory of the worktree for `branch`: `<worktree_dir>/<project>/<branch>`.
    pub(crate) fn worktree_path(&self, branch: &str) -> PathBuf {
        self.worktree_dir
            .join(&self.name)
            .join(crate::git::safe_branch_dir(branch))
    }
}

pub(crate) fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("project name must not be empty");
    }
    if name == "." || name == ".." {
        bail!("project name `{name}` is invalid");
    }
    if name.contains('/') || name.contains('\\') {
        bail!("project name must not contain path separators");
    }
    Ok(())
}

pub(crate) fn load_project(paths: &ConfigPaths, name: &str) -> Result<ProjectConfig> {
    validate_project_name(name)?;
    let path = paths.project_file(name);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            bail!("project `{name}` is not registered");
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read project config {}", path.display()));
        }
    };
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse project config {}", path.display()))
}

pub(crate) fn save_project(
    paths: &ConfigPaths,
    name: &str,
    project: &ProjectConfig,
) -> Result<PathBuf> {
    validate_project_name(name)?;
    let dir = paths.projects_dir();
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = paths.project_file(name);
    let raw = toml::to_string_pretty(project).context("failed to serialize project config")?;
    fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Deletes a project's config file. Returns `false` when it did not exist.
pub(crate) fn remove_project(paths: &ConfigPaths, name: &str) -> Result<bool> {
    validate_project_name(name)?;
    let path = paths.project_file(name);
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Registered project names, sorted so that callers iterate in a stable order.
pub(crate) fn list_projects(paths: &ConfigPaths) -> Result<Vec<String>> {
    let dir = paths.projects_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", dir.display()));
        }
    };

    let mut names = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read {}", dir.display()))?
            .path();
        let extension = path.extension().and_then(|ext| ext.to_str());
        if !path.is_file() || extension != Some(PROJECT_CONFIG_EXT) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub(crate) fn resolve_project(paths: &ConfigPaths, name: &str) -> Result<ResolvedProject> {
    let global = GlobalConfig::load(paths)?;
    let project = load_project(paths, name)?;
    Ok(ResolvedProject::merge(name, global, project))
}

/// Replaces a leading `~` with the home directory.
pub(crate) fn expand_path(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(raw),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(raw),
    }
}
