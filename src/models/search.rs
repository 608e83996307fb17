use serde::{Deserialize, Serialize};

/// JSON fields requested from `gh search repos`.
pub const SEARCH_FIELDS: &str = "fullName,description,stargazersCount,forksCount,pushedAt,url";

/// One repository returned by a search query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "stargazersCount", default)]
    pub star_count: u64,
    #[serde(rename = "forksCount", default)]
    pub fork_count: u64,
    #[serde(rename = "pushedAt", default)]
    pub last_push_date: Option<String>,
    pub url: String,
}
