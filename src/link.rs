//! Parsing of hosted issue, pull request, and repository URLs.

use crate::constants::{HOSTED_DOMAIN, LINK_KIND_ISSUES, LINK_KIND_PULL};
use crate::remote::RemoteIdentity;
use std::fmt;
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum LinkError {
    #[error("not a recognized link: `{input}` is not a valid URL")]
    InvalidUrl { input: String },
    #[error(
        "not a recognized link: unsupported host `{host}` in `{input}`, expected {expected}",
        expected = HOSTED_DOMAIN
    )]
    UnsupportedHost { input: String, host: String },
    #[error("not a recognized link: unexpected path in `{input}`, want {expected}")]
    MalformedPath {
        input: String,
        expected: &'static str,
    },
    #[error(
        "not a recognized link: unexpected segment `{segment}` in `{input}`, want `issues` or `pull`"
    )]
    UnrecognizedKind { input: String, segment: String },
    #[error("not a recognized link: `{segment}` in `{input}` is not an issue or pull request number")]
    InvalidNumber { input: String, segment: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkKind {
    Issue,
    PullRequest,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue => write!(f, "issue"),
            Self::PullRequest => write!(f, "pull request"),
        }
    }
}

/// An issue or pull request on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) kind: LinkKind,
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) number: u64,
}

impl Link {
    pub(crate) fn identity(&self) -> RemoteIdentity {
        RemoteIdentity::from_parts(&self.owner, &self.repo)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Owner and name of a hosted repository plus its HTTPS clone URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepoUrl {
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) clone_url: String,
}

/// Cheap check used to decide whether an argument should be treated as a link
/// at all before attempting a full parse.
pub(crate) fn is_hosted_url(value: &str) -> bool {
    value.starts_with(&format!("https://{HOSTED_DOMAIN}/"))
}

/// Parses `https://<host>/owner/repo/{issues,pull}/<number>`.
///
/// Only the first four path segments matter; trailing segments such as
/// `/files`, query strings, and fragments are ignored.
pub(crate) fn parse_link(raw: &str) -> Result<Link, LinkError> {
    let segments = hosted_path_segments(raw)?;
    let [owner, repo, kind, number, ..] = segments.as_slice() else {
        return Err(LinkError::MalformedPath {
            input: raw.to_string(),
            expected: "/owner/repo/{issues,pull}/number",
        });
    };

    let kind = match kind.as_str() {
        LINK_KIND_ISSUES => LinkKind::Issue,
        LINK_KIND_PULL => LinkKind::PullRequest,
        other => {
            return Err(LinkError::UnrecognizedKind {
                input: raw.to_string(),
                segment: other.to_string(),
            });
        }
    };

    let number = number
        .parse::<u64>()
        .map_err(|_| LinkError::InvalidNumber {
            input: raw.to_string(),
            segment: number.clone(),
        })?;

    Ok(Link {
        kind,
        owner: owner.clone(),
        repo: repo.clone(),
        number,
    })
}

/// Parses a bare repository URL (`https://<host>/owner/repo[.git]`), also
/// accepting issue and pull request URLs by ignoring everything after the
/// repository segment.
pub(crate) fn parse_repo_url(raw: &str) -> Result<RepoUrl, LinkError> {
    let segments = hosted_path_segments(raw)?;
    let malformed = || LinkError::MalformedPath {
        input: raw.to_string(),
        expected: "/owner/repo",
    };
    let [owner, repo, ..] = segments.as_slice() else {
        return Err(malformed());
    };

    let repo = repo.strip_suffix(".git").unwrap_or(repo.as_str());
    if repo.is_empty() {
        return Err(malformed());
    }

    Ok(RepoUrl {
        owner: owner.clone(),
        repo: repo.to_string(),
        clone_url: format!("https://{HOSTED_DOMAIN}/{owner}/{repo}.git"),
    })
}

fn hosted_path_segments(raw: &str) -> Result<Vec<String>, LinkError> {
    let url = Url::parse(raw).map_err(|_| LinkError::InvalidUrl {
        input: raw.to_string(),
    })?;

    let host = url.host_str().unwrap_or_default();
    if host != HOSTED_DOMAIN {
        return Err(LinkError::UnsupportedHost {
            input: raw.to_string(),
            host: host.to_string(),
        });
    }

    Ok(url
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect())
}
