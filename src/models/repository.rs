use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Sentinel stored when a date or license is not available.
pub const UNKNOWN: &str = "unknown";

const GITHUB_HOST: &str = "github.com";

/// Canonical `owner/name` identifier of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Normalizes a repository URL or `owner/name` string.
    ///
    /// Accepts `https://github.com/owner/repo`, `http://...`, `git@github.com:owner/repo.git`,
    /// bare `github.com/owner/repo` as well as `owner/repo`. Trailing `.git`, trailing slashes,
    /// query strings and deeper paths (`/tree/main`) are dropped.
    pub fn parse(input: &str) -> Result<Self> {
        let mut rest = input.trim();

        for prefix in ["https://", "http://", "git@"] {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }
        rest = rest.strip_prefix("www.").unwrap_or(rest);

        if let Some(stripped) = rest
            .strip_prefix(GITHUB_HOST)
            .and_then(|r| r.strip_prefix('/').or_else(|| r.strip_prefix(':')))
        {
            rest = stripped;
        }

        let rest = rest.split(['?', '#']).next().unwrap_or("");
        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let rest = rest.trim_matches('/');

        if rest.is_empty() {
            return Err(Error::MalformedUrl(format!(
                "'{}' does not name a repository",
                input
            )));
        }

        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().unwrap_or_default();
        let name = segments.next().unwrap_or_default();

        if owner.contains('.') || owner.contains(':') {
            return Err(Error::MalformedUrl(format!(
                "'{}' is not a {} repository",
                input, GITHUB_HOST
            )));
        }
        if owner.is_empty() || name.is_empty() {
            return Err(Error::MalformedUrl(format!(
                "'{}' must have the form owner/repo",
                input
            )));
        }

        let name = name.strip_suffix(".git").unwrap_or(name);

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// URL used as the unique key of the output collection.
    pub fn canonical_url(&self) -> String {
        format!("https://{}/{}/{}", GITHUB_HOST, self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Objective facts about a repository, fetched fresh on every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryMetadata {
    pub star_count: u64,
    pub commit_count: u64,
    pub last_commit_date: String,
    pub open_issues_count: u64,
    pub license: String,
}

impl Default for RepositoryMetadata {
    fn default() -> Self {
        Self {
            star_count: 0,
            commit_count: 0,
            last_commit_date: UNKNOWN.to_string(),
            open_issues_count: 0,
            license: UNKNOWN.to_string(),
        }
    }
}

impl RepositoryMetadata {
    /// Assembles metadata from the individual lookups, substituting zero or
    /// [`UNKNOWN`] for anything that is missing.
    pub fn from_parts(
        view: Option<RepoView>,
        commit_count: Option<u64>,
        open_issues_count: Option<u64>,
    ) -> Self {
        let view = view.unwrap_or_default();

        let last_commit_date = view
            .pushed_at
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let license = view
            .license_info
            .and_then(|l| l.key.or(l.name))
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            star_count: view.stargazer_count.unwrap_or(0),
            commit_count: commit_count.unwrap_or(0),
            last_commit_date,
            open_issues_count: open_issues_count.unwrap_or(0),
            license,
        }
    }
}

/// Subset of `gh repo view --json stargazerCount,pushedAt,licenseInfo`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoView {
    #[serde(default)]
    pub stargazer_count: Option<u64>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub license_info: Option<LicenseInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseInfo {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `gh repo list --json url`.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedRepo {
    pub url: String,
}
