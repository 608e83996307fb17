use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;

use crate::analysis::pipeline::Classifier;
use crate::discovery::read_url_list;
use crate::error::Result;
use crate::storage::OutputCollection;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Succeeded,
    Failed(String),
}

/// Something that classifies one repository URL.
#[async_trait]
pub trait RepositoryRunner: Send + Sync {
    async fn run(&self, url: &str) -> RunStatus;
}

/// Runs `<exe> classify <url>` as a fresh process per repository.
pub struct ProcessRunner {
    exe: PathBuf,
    output: PathBuf,
}

impl ProcessRunner {
    pub fn new(exe: PathBuf, output: PathBuf) -> Self {
        Self { exe, output }
    }

    /// Re-invokes the running binary.
    pub fn current(output: PathBuf) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, output))
    }
}

#[async_trait]
impl RepositoryRunner for ProcessRunner {
    async fn run(&self, url: &str) -> RunStatus {
        let status = Command::new(&self.exe)
            .arg("classify")
            .arg(url)
            .env("REPOCLASS_OUTPUT", &self.output)
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => RunStatus::Succeeded,
            Ok(s) => RunStatus::Failed(format!("exit code {}", s.code().unwrap_or(-1))),
            Err(e) => RunStatus::Failed(format!("failed to start classifier: {}", e)),
        }
    }
}

#[async_trait]
impl RepositoryRunner for Classifier {
    async fn run(&self, url: &str) -> RunStatus {
        match self.classify(url).await {
            Ok(_) => RunStatus::Succeeded,
            Err(e) => RunStatus::Failed(e.to_string()),
        }
    }
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: Vec<(String, String)>,
}

/// Resets the output collection, then classifies every URL of `urls_path`
/// in order, continuing past failures.
pub async fn run_batch(
    urls_path: &Path,
    collection: &OutputCollection,
    runner: &dyn RepositoryRunner,
) -> Result<BatchReport> {
    let urls = read_url_list(urls_path)?;
    collection.run_blocking(|c| c.reset()).await?;
    tracing::info!("Classifying {} repositories from {}", urls.len(), urls_path.display());

    let pb = ProgressBar::new(urls.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut report = BatchReport::default();
    for (i, url) in urls.iter().enumerate() {
        tracing::info!("[{}/{}] {}", i + 1, urls.len(), url);
        report.processed += 1;

        match runner.run(url).await {
            RunStatus::Succeeded => report.succeeded += 1,
            RunStatus::Failed(reason) => {
                tracing::warn!("Classification failed for {}: {}", url, reason);
                report.failed.push((url.clone(), reason));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Batch complete");

    tracing::info!(
        "Processed {} repositories: {} succeeded, {} failed",
        report.processed,
        report.succeeded,
        report.failed.len()
    );
    for (url, reason) in &report.failed {
        tracing::info!("  failed: {} ({})", url, reason);
    }

    Ok(report)
}
