use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::github::platform::{HostingPlatform, SearchFilter};
use crate::models::{OwnedRepo, RepoId, RepoView, SearchHit};

/// In-memory platform returning preconfigured responses.
#[derive(Default)]
pub struct MockPlatform {
    owners: Mutex<HashMap<String, Vec<OwnedRepo>>>,
    /// key: "{term}:{label}"
    searches: Mutex<HashMap<String, Vec<SearchHit>>>,
    views: Mutex<HashMap<String, RepoView>>,
    commits: Mutex<HashMap<String, u64>>,
    issues: Mutex<HashMap<String, u64>>,
    /// Recorded search calls: (term, filter)
    pub search_calls: Mutex<Vec<(String, SearchFilter)>>,
    pub owner_calls: Mutex<Vec<(String, u32)>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_owner(&self, owner: &str, urls: &[&str]) {
        let repos = urls
            .iter()
            .map(|u| OwnedRepo { url: u.to_string() })
            .collect();
        self.owners.lock().unwrap().insert(owner.to_string(), repos);
    }

    pub fn set_search(&self, term: &str, label: &str, hits: Vec<SearchHit>) {
        self.searches
            .lock()
            .unwrap()
            .insert(format!("{}:{}", term, label), hits);
    }

    pub fn set_repo(&self, full_name: &str, stars: u64, commits: u64, issues: u64) {
        let view = RepoView {
            stargazer_count: Some(stars),
            pushed_at: Some("2024-06-01T12:00:00Z".to_string()),
            license_info: None,
        };
        self.views.lock().unwrap().insert(full_name.to_string(), view);
        self.commits.lock().unwrap().insert(full_name.to_string(), commits);
        self.issues.lock().unwrap().insert(full_name.to_string(), issues);
    }
}

pub fn hit(full_name: &str, stars: u64) -> SearchHit {
    SearchHit {
        full_name: full_name.to_string(),
        description: None,
        star_count: stars,
        fork_count: 0,
        last_push_date: None,
        url: format!("https://github.com/{}", full_name),
    }
}

#[async_trait]
impl HostingPlatform for MockPlatform {
    async fn list_owner_repos(&self, owner: &str, limit: u32) -> Result<Vec<OwnedRepo>> {
        self.owner_calls
            .lock()
            .unwrap()
            .push((owner.to_string(), limit));
        self.owners
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .ok_or_else(|| Error::GitHubCli(format!("mock: unknown owner {}", owner)))
    }

    async fn search_repos(&self, term: &str, filter: &SearchFilter) -> Result<Vec<SearchHit>> {
        self.search_calls
            .lock()
            .unwrap()
            .push((term.to_string(), filter.clone()));
        self.searches
            .lock()
            .unwrap()
            .get(&format!("{}:{}", term, filter.label))
            .cloned()
            .ok_or_else(|| Error::GitHubCli("mock: search failed".to_string()))
    }

    async fn repo_view(&self, repo: &RepoId) -> Result<RepoView> {
        self.views
            .lock()
            .unwrap()
            .get(&repo.full_name())
            .cloned()
            .ok_or_else(|| Error::GitHubCli("mock: repo not found".to_string()))
    }

    async fn commit_count(&self, repo: &RepoId) -> Result<u64> {
        self.commits
            .lock()
            .unwrap()
            .get(&repo.full_name())
            .copied()
            .ok_or_else(|| Error::GitHubCli("mock: repo not found".to_string()))
    }

    async fn open_issues_count(&self, repo: &RepoId) -> Result<Option<u64>> {
        Ok(self.issues.lock().unwrap().get(&repo.full_name()).copied())
    }
}
