pub(crate) const APP_NAME: &str = "copse";

pub(crate) const CONFIG_DIR_ENV: &str = "COPSE_CONFIG_DIR";
pub(crate) const LOG_FILTER_ENV: &str = "COPSE_LOG";
pub(crate) const GLOBAL_CONFIG_FILE: &str = "config.toml";
pub(crate) const PROJECTS_SUBDIR: &str = "projects";
pub(crate) const PROJECT_CONFIG_EXT: &str = "toml";
pub(crate) const WORKTREES_SUBDIR: &str = "worktrees";

pub(crate) const DEFAULT_BASE_BRANCH: &str = "main";
pub(crate) const ORIGIN_REMOTE: &str = "origin";

pub(crate) const HOSTED_DOMAIN: &str = "github.com";
pub(crate) const LINK_KIND_ISSUES: &str = "issues";
pub(crate) const LINK_KIND_PULL: &str = "pull";
pub(crate) const ISSUE_BRANCH_PREFIX: &str = "issue-";

pub(crate) const HEADS_REF_PREFIX: &str = "refs/heads/";
