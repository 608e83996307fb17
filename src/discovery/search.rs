use std::collections::HashSet;

use chrono::NaiveDate;

use crate::config::SearchConfig;
use crate::discovery::split_list;
use crate::error::{Error, Result};
use crate::github::{HostingPlatform, SearchFilter};
use crate::models::SearchHit;

const HIDDEN_GEM_STARS: (u32, u32) = (1, 20);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// The four searches run for every term.
pub fn search_variants(config: &SearchConfig) -> Vec<SearchFilter> {
    let limit = config.limit_per_search;
    let (min_stars, max_stars) = HIDDEN_GEM_STARS;

    // gh rejects a zero limit
    vec![
        SearchFilter::new("general", limit).created_since(date(2020, 1, 1)),
        SearchFilter::new("language", (limit / 2).max(1))
            .created_since(date(2020, 1, 1))
            .language(config.language.clone()),
        SearchFilter::new("hidden gems", (limit / 3).max(1))
            .stars(min_stars, max_stars)
            .created_since(date(2021, 1, 1)),
        SearchFilter::new("recently updated", (limit / 3).max(1))
            .updated_since(date(2024, 1, 1)),
    ]
}

/// Deduplicates by full name, orders by ascending star count and keeps the
/// first `total` URLs, so low-star repositories are favoured.
pub fn select_urls(hits: Vec<SearchHit>, total: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<SearchHit> = hits
        .into_iter()
        .filter(|hit| seen.insert(hit.full_name.clone()))
        .collect();

    unique.sort_by_key(|hit| hit.star_count);
    unique.into_iter().take(total).map(|hit| hit.url).collect()
}

/// Runs every search variant for each comma-separated term and returns the
/// selected repository URLs. Failed searches are logged and skipped.
pub async fn search_term_urls(
    platform: &dyn HostingPlatform,
    terms: &str,
    config: &SearchConfig,
) -> Result<Vec<String>> {
    let terms = split_list(terms);
    if terms.is_empty() {
        return Err(Error::InvalidInput("no search terms were given".to_string()));
    }

    let variants = search_variants(config);
    let mut hits = Vec::new();

    for term in &terms {
        for filter in &variants {
            match platform.search_repos(term, filter).await {
                Ok(found) => {
                    tracing::info!("'{}' ({}): {} results", term, filter.label, found.len());
                    hits.extend(found);
                }
                Err(e) => {
                    tracing::warn!("Search '{}' ({}) failed: {}", term, filter.label, e);
                }
            }
        }
    }

    let found = hits.len();
    let urls = select_urls(hits, config.total_desired as usize);
    tracing::info!("Selected {} of {} search results", urls.len(), found);
    Ok(urls)
}
