use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{OwnedRepo, RepoId, RepoView, SearchHit};

/// Qualifiers applied to one repository search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub label: &'static str,
    pub limit: u32,
    pub created_since: Option<NaiveDate>,
    pub updated_since: Option<NaiveDate>,
    pub stars: Option<(u32, u32)>,
    pub language: Option<String>,
}

impl SearchFilter {
    pub fn new(label: &'static str, limit: u32) -> Self {
        Self {
            label,
            limit,
            created_since: None,
            updated_since: None,
            stars: None,
            language: None,
        }
    }

    pub fn created_since(mut self, date: NaiveDate) -> Self {
        self.created_since = Some(date);
        self
    }

    pub fn updated_since(mut self, date: NaiveDate) -> Self {
        self.updated_since = Some(date);
        self
    }

    pub fn stars(mut self, min: u32, max: u32) -> Self {
        self.stars = Some((min, max));
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Source-hosting platform operations used by discovery and classification.
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    async fn list_owner_repos(&self, owner: &str, limit: u32) -> Result<Vec<OwnedRepo>>;

    async fn search_repos(&self, term: &str, filter: &SearchFilter) -> Result<Vec<SearchHit>>;

    async fn repo_view(&self, repo: &RepoId) -> Result<RepoView>;

    /// Total number of commits on the default branch.
    async fn commit_count(&self, repo: &RepoId) -> Result<u64>;

    async fn open_issues_count(&self, repo: &RepoId) -> Result<Option<u64>>;
}
