use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::EnrichedRecord;

const OVERRATED_STAR_QUANTILE: f64 = 0.8;
const OVERRATED_QUALITY_QUANTILE: f64 = 0.4;
const TOP_DOMAINS: usize = 10;

/// The model's own verdict on a repository; an underrated flag wins over an
/// overrated one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Underrated,
    Overrated,
    Normal,
}

impl Category {
    pub fn from_flags(underrated: bool, overrated: bool) -> Self {
        if underrated {
            Category::Underrated
        } else if overrated {
            Category::Overrated
        } else {
            Category::Normal
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Underrated => "Underrated",
            Category::Overrated => "Overrated",
            Category::Normal => "Normal",
        };
        f.write_str(label)
    }
}

/// One classified repository with its derived scores. Field order is the
/// column order of the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRepository {
    pub repo_name: String,
    pub github_url: String,
    pub star_count: u64,
    pub code_quality: u8,
    pub innovativeness: u8,
    pub usefulness: u8,
    pub user_friendliness: u8,
    pub overall_quality: f64,
    pub value_score: f64,
    pub category: Category,
    pub project_domain: String,
    pub motivation: String,
}

impl ScoredRepository {
    fn from_record(record: &EnrichedRecord) -> Self {
        let c = &record.classification;
        let overall_quality = c.overall_quality();
        Self {
            repo_name: repo_name(&record.github_url),
            github_url: record.github_url.clone(),
            star_count: record.metadata.star_count,
            code_quality: c.code_quality,
            innovativeness: c.innovativeness,
            usefulness: c.usefulness,
            user_friendliness: c.user_friendliness,
            overall_quality,
            value_score: value_score(overall_quality, record.metadata.star_count),
            category: Category::from_flags(c.underrated, c.overrated),
            project_domain: c.project_domain.clone(),
            motivation: c.motivation.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// Summary of an output collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub skipped_records: usize,
    pub distinct_domains: usize,
    pub top_undervalued: Vec<ScoredRepository>,
    pub underrated_total: usize,
    pub flagged_underrated: Vec<ScoredRepository>,
    pub potentially_overrated: Vec<ScoredRepository>,
    pub top_domains: Vec<DomainCount>,
    /// Every scored repository, highest value score first.
    pub repositories: Vec<ScoredRepository>,
}

/// Quality per log-star: higher means more undervalued.
pub fn value_score(overall_quality: f64, star_count: u64) -> f64 {
    overall_quality / (star_count as f64 + 10.0).log10()
}

/// `owner/repo` part of a GitHub URL.
pub fn repo_name(github_url: &str) -> String {
    let trimmed = github_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let path = trimmed.strip_prefix("github.com/").unwrap_or(trimmed);
    path.trim_matches('/').to_string()
}

/// Linear-interpolated quantile of `values`, `q` in `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn build_report(records: &[Value], top: usize) -> CollectionReport {
    let mut skipped_records = 0;
    let scored: Vec<ScoredRepository> = records
        .iter()
        .filter_map(|value| match EnrichedRecord::deserialize(value) {
            Ok(record) => Some(ScoredRepository::from_record(&record)),
            Err(e) => {
                tracing::debug!("Skipping record without classification fields: {}", e);
                skipped_records += 1;
                None
            }
        })
        .collect();

    let distinct_domains = scored
        .iter()
        .map(|r| r.project_domain.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut repositories = scored.clone();
    repositories.sort_by(|a, b| b.value_score.total_cmp(&a.value_score));
    let top_undervalued = repositories.iter().take(top).cloned().collect();

    let underrated: Vec<_> = scored
        .iter()
        .filter(|r| r.category == Category::Underrated)
        .cloned()
        .collect();
    let underrated_total = underrated.len();
    let flagged_underrated = underrated.into_iter().take(top).collect();

    let stars: Vec<f64> = scored.iter().map(|r| r.star_count as f64).collect();
    let quality: Vec<f64> = scored.iter().map(|r| r.overall_quality).collect();
    let potentially_overrated = match (
        quantile(&stars, OVERRATED_STAR_QUANTILE),
        quantile(&quality, OVERRATED_QUALITY_QUANTILE),
    ) {
        (Some(star_cut), Some(quality_cut)) => scored
            .iter()
            .filter(|r| r.star_count as f64 > star_cut && r.overall_quality < quality_cut)
            .take(top)
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in &scored {
        *counts.entry(r.project_domain.as_str()).or_default() += 1;
    }
    let mut top_domains: Vec<DomainCount> = counts
        .into_iter()
        .map(|(domain, count)| DomainCount {
            domain: domain.to_string(),
            count,
        })
        .collect();
    top_domains.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
    top_domains.truncate(TOP_DOMAINS);

    CollectionReport {
        generated_at: Utc::now(),
        total_records: scored.len(),
        skipped_records,
        distinct_domains,
        top_undervalued,
        underrated_total,
        flagged_underrated,
        potentially_overrated,
        top_domains,
        repositories,
    }
}

/// Writes every scored repository as CSV with a header row, in report order.
pub fn write_csv<W: Write>(report: &CollectionReport, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for repo in &report.repositories {
        out.serialize(repo)?;
    }
    out.flush()?;
    Ok(())
}
