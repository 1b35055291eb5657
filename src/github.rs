use crate::constants::HOSTED_DOMAIN;
use crate::process::{binary_available, run_checked};
use crate::remote::RemoteIdentity;
use anyhow::{Context, Result, bail};
use serde::Deserialize;

const GH_BIN: &str = "gh";

/// Head of a pull request. `clone_url` points at the contributor's fork when
/// `is_fork` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrHead {
    pub(crate) branch: String,
    pub(crate) clone_url: String,
    pub(crate) is_fork: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPrView {
    head_ref_name: String,
    head_repository: GhRepository,
    head_repository_owner: GhOwner,
    is_cross_repository: bool,
}

#[derive(Debug, Deserialize)]
struct GhRepository {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhOwner {
    login: String,
}

fn require_gh() -> Result<()> {
    if !binary_available(GH_BIN) {
        bail!("`{GH_BIN}` is not installed");
    }
    Ok(())
}

pub(crate) fn fetch_pr_head(repo: &RemoteIdentity, number: u64) -> Result<PrHead> {
    require_gh()?;
    let number = number.to_string();
    let output = run_checked(
        GH_BIN,
        &[
            "pr",
            "view",
            &number,
            "--repo",
            repo.as_str(),
            "--json",
            "headRefName,headRepository,headRepositoryOwner,isCrossRepository",
        ],
        None,
        "gh pr view",
    )?;
    parse_pr_view(&output.stdout)
}

pub(crate) fn parse_pr_view(raw: &str) -> Result<PrHead> {
    let view: GhPrView = serde_json::from_str(raw).context("failed to parse gh pr view output")?;
    Ok(PrHead {
        clone_url: format!(
            "https://{HOSTED_DOMAIN}/{}/{}.git",
            view.head_repository_owner.login, view.head_repository.name
        ),
        branch: view.head_ref_name,
        is_fork: view.is_cross_repository,
    })
}

/// Whether a merged pull request exists with `branch` as its head in `repo`.
pub(crate) fn is_pr_merged(repo: &RemoteIdentity, branch: &str) -> Result<bool> {
    require_gh()?;
    let output = run_checked(
        GH_BIN,
        &[
            "pr",
            "list",
            "--head",
            branch,
            "--state",
            "merged",
            "--repo",
            repo.as_str(),
            "--json",
            "number",
            "--limit",
            "1",
        ],
        None,
        "gh pr list",
    )?;
    parse_pr_list_nonempty(&output.stdout)
}

pub(crate) fn parse_pr_list_nonempty(raw: &str) -> Result<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(false);
    }
    let prs: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("failed to parse gh pr list output")?;
    Ok(!prs.is_empty())
}
