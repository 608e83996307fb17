use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::github::paginator::{collect_pages, count_items};
use crate::github::platform::{HostingPlatform, SearchFilter};
use crate::models::{OwnedRepo, RepoId, RepoView, SearchHit, SEARCH_FIELDS};
use crate::process;

const GH: &str = "gh";

/// [`HostingPlatform`] backed by the `gh` CLI and its existing login session.
#[derive(Debug, Default, Clone)]
pub struct GhCli;

impl GhCli {
    pub fn new() -> Self {
        Self
    }

    async fn gh(&self, op: &str, args: Vec<String>) -> Result<String> {
        let result = process::run(GH, &args, None).await?;
        if !result.success() {
            return Err(Error::GitHubCli(format!(
                "{} failed (exit={}): {}",
                op,
                result.exit_code,
                result.stderr.trim()
            )));
        }
        Ok(result.stdout)
    }

    async fn gh_json<T: DeserializeOwned>(&self, op: &str, args: Vec<String>) -> Result<Vec<T>> {
        let stdout = self.gh(op, args).await?;
        collect_pages(stdout.as_bytes())
    }
}

pub(crate) fn search_args(term: &str, filter: &SearchFilter) -> Vec<String> {
    let mut args = vec![
        "search".to_string(),
        "repos".to_string(),
        term.to_string(),
        "--limit".to_string(),
        filter.limit.to_string(),
        "--json".to_string(),
        SEARCH_FIELDS.to_string(),
    ];

    if let Some(date) = filter.created_since {
        args.push("--created".to_string());
        args.push(format!(">={}", date.format("%Y-%m-%d")));
    }
    if let Some(date) = filter.updated_since {
        args.push("--updated".to_string());
        args.push(format!(">={}", date.format("%Y-%m-%d")));
    }
    if let Some((min, max)) = filter.stars {
        args.push("--stars".to_string());
        args.push(format!("{}..{}", min, max));
    }
    if let Some(ref language) = filter.language {
        args.push("--language".to_string());
        args.push(language.clone());
    }

    args
}

#[async_trait]
impl HostingPlatform for GhCli {
    async fn list_owner_repos(&self, owner: &str, limit: u32) -> Result<Vec<OwnedRepo>> {
        tracing::info!("Listing repositories for: {}", owner);
        let args = vec![
            "repo".to_string(),
            "list".to_string(),
            owner.to_string(),
            "--limit".to_string(),
            limit.to_string(),
            "--json".to_string(),
            "url".to_string(),
        ];
        self.gh_json("repo list", args).await
    }

    async fn search_repos(&self, term: &str, filter: &SearchFilter) -> Result<Vec<SearchHit>> {
        self.gh_json("search repos", search_args(term, filter)).await
    }

    async fn repo_view(&self, repo: &RepoId) -> Result<RepoView> {
        let args = vec![
            "repo".to_string(),
            "view".to_string(),
            repo.full_name(),
            "--json".to_string(),
            "stargazerCount,pushedAt,licenseInfo".to_string(),
        ];
        let stdout = self.gh("repo view", args).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| Error::ParseError(format!("Invalid repo view for {}: {}", repo, e)))
    }

    async fn commit_count(&self, repo: &RepoId) -> Result<u64> {
        tracing::debug!("Counting commits for: {}", repo);
        let args = vec![
            "api".to_string(),
            format!("repos/{}/commits", repo.full_name()),
            "--paginate".to_string(),
            "--method".to_string(),
            "GET".to_string(),
            "-f".to_string(),
            "per_page=100".to_string(),
        ];
        let stdout = self.gh("api commits", args).await?;
        count_items(stdout.as_bytes())
    }

    async fn open_issues_count(&self, repo: &RepoId) -> Result<Option<u64>> {
        let args = vec![
            "api".to_string(),
            format!("repos/{}", repo.full_name()),
            "--jq".to_string(),
            ".open_issues_count".to_string(),
        ];
        let stdout = self.gh("api repo", args).await?;
        Ok(stdout.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_search_args_include_qualifiers() {
        let filter = SearchFilter::new("hidden gems", 5)
            .stars(1, 20)
            .created_since(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap())
            .language("rust");
        let args = search_args("parser", &filter);

        assert_eq!(&args[..5], &["search", "repos", "parser", "--limit", "5"]);
        let joined = args.join(" ");
        assert!(joined.contains("--created >=2021-01-01"));
        assert!(joined.contains("--stars 1..20"));
        assert!(joined.contains("--language rust"));
        assert!(!joined.contains("--updated"));
    }
}
