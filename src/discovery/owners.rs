use crate::discovery::{dedup_preserving_order, split_list};
use crate::error::{Error, Result};
use crate::github::HostingPlatform;

/// Repositories listed per account.
pub const OWNER_REPO_LIMIT: u32 = 500;

/// Lists every repository of the given comma-separated accounts.
///
/// A failing account is logged and contributes nothing; only an empty owner
/// list is an error.
pub async fn list_owner_urls(platform: &dyn HostingPlatform, owners: &str) -> Result<Vec<String>> {
    let owners = split_list(owners);
    if owners.is_empty() {
        return Err(Error::InvalidInput(
            "no valid owner names were given".to_string(),
        ));
    }

    let mut urls = Vec::new();
    for owner in &owners {
        match platform.list_owner_repos(owner, OWNER_REPO_LIMIT).await {
            Ok(repos) => {
                tracing::info!("{}: {} repositories", owner, repos.len());
                urls.extend(repos.into_iter().map(|r| r.url));
            }
            Err(e) => {
                tracing::warn!("Failed to list repositories for {}: {}", owner, e);
            }
        }
    }

    let urls = dedup_preserving_order(urls);
    tracing::info!(
        "Collected {} unique repositories from {} owners",
        urls.len(),
        owners.len()
    );
    Ok(urls)
}
