use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use repoclass::analysis::report::CollectionReport;
use repoclass::analysis::{build_report, run_batch, write_csv, ProcessRunner, RepositoryRunner};
use repoclass::discovery::{list_owner_urls, search_term_urls, write_url_list};
use repoclass::process::ensure_tools;
use repoclass::{
    ClassifierConfig, Classifier, ClassifyOutcome, Config, GhCli, LlmCli, OutputCollection,
    Repomix, SearchConfig,
};

#[derive(Parser, Debug)]
#[command(name = "repoclass")]
#[command(version = "0.1.0")]
#[command(about = "Discover GitHub repositories and classify them with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every repository of the given accounts
    ListOwners {
        /// Comma-separated account names
        owners: String,

        /// Output file for the URL list
        #[arg(short, long, default_value = "inputs.json")]
        output: PathBuf,
    },

    /// Search repositories by free-text terms, favouring low-star projects
    Search {
        /// Comma-separated search terms
        terms: String,

        /// Results requested per search
        #[arg(short, long, default_value = "15")]
        limit: u32,

        /// Number of URLs to keep after sorting
        #[arg(short, long, default_value = "50")]
        total: u32,

        /// Output file for the URL list
        #[arg(short, long, default_value = "inputs.json")]
        output: PathBuf,
    },

    /// Classify one repository and append it to the output collection
    Classify {
        /// Repository URL or owner/repo
        repository_url: String,
    },

    /// Reset the output collection and classify every URL of a JSON array file
    ClassifyBatch {
        /// JSON array of repository URLs
        urls: PathBuf,

        /// Classify inside this process instead of one process per repository
        #[arg(long)]
        in_process: bool,
    },

    /// Summarize the output collection
    Report {
        /// Output collection to read (defaults to the configured one)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format (json, text, markdown, csv)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Entries per ranking
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

const CLASSIFY_TOOLS: &[&str] = &["gh", "llm", "repomix"];

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repoclass=info")),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = match parse_cli(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return Ok(code),
    };

    match run(cli.command).await {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

/// Parses arguments; usage errors exit 1 so they never collide with the
/// packaging exit code.
fn parse_cli<I, T>(args: I) -> Result<Cli, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        ExitCode::from(usage_exit_code(&e))
    })
}

fn usage_exit_code(error: &clap::Error) -> u8 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

async fn run(command: Command) -> repoclass::Result<ExitCode> {
    let config = Config::from_env();

    match command {
        Command::ListOwners { owners, output } => {
            ensure_tools(&["gh"]).await?;
            let urls = list_owner_urls(&GhCli::new(), &owners).await?;
            write_url_list(&output, &urls)?;
        }

        Command::Search {
            terms,
            limit,
            total,
            output,
        } => {
            let search_config = SearchConfig::new(&config, limit, total)?;
            ensure_tools(&["gh"]).await?;
            let urls = search_term_urls(&GhCli::new(), &terms, &search_config).await?;
            write_url_list(&output, &urls)?;
        }

        Command::Classify { repository_url } => {
            ensure_tools(CLASSIFY_TOOLS).await?;
            match build_classifier(&config)?.classify(&repository_url).await? {
                ClassifyOutcome::Skipped { github_url } => {
                    tracing::info!("Nothing to do for {}", github_url);
                }
                ClassifyOutcome::Persisted {
                    github_url, model, ..
                } => {
                    tracing::info!("Classified {} with {}", github_url, model);
                }
            }
        }

        Command::ClassifyBatch { urls, in_process } => {
            ensure_tools(CLASSIFY_TOOLS).await?;
            let collection = OutputCollection::new(&config.output_path);

            // Rejects a bad model policy before any child process starts
            let classifier = build_classifier(&config)?;
            let runner: Box<dyn RepositoryRunner> = if in_process {
                Box::new(classifier)
            } else {
                Box::new(ProcessRunner::current(config.output_path.clone())?)
            };

            // Per-repository failures are reported, not propagated
            match run_batch(&urls, &collection, runner.as_ref()).await {
                Ok(report) if !report.failed.is_empty() => {
                    tracing::warn!(
                        "{} of {} repositories failed",
                        report.failed.len(),
                        report.processed
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Batch aborted: {}", e);
                    return Ok(ExitCode::from(e.exit_code()));
                }
            }
        }

        Command::Report {
            input,
            format,
            output,
            top,
        } => {
            let collection = OutputCollection::new(input.unwrap_or(config.output_path));
            let report = build_report(&collection.load()?, top);
            if let Err(e) = output_report(&report, &format, output.as_deref()) {
                tracing::error!("Failed to write report: {}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn build_classifier(config: &Config) -> repoclass::Result<Classifier> {
    Ok(Classifier::new(
        Arc::new(GhCli::new()),
        Arc::new(LlmCli::new()),
        Arc::new(Repomix::new()),
        OutputCollection::new(&config.output_path),
        ClassifierConfig::try_from(config)?,
    ))
}

fn output_report(
    report: &CollectionReport,
    format: &str,
    path: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let output = match format {
        "json" => serde_json::to_string_pretty(report)?,
        "markdown" => format_markdown(report),
        "csv" => {
            let mut buf = Vec::new();
            write_csv(report, &mut buf)?;
            String::from_utf8(buf)?
        }
        _ => format_text(report),
    };

    if let Some(path) = path {
        std::fs::write(path, &output)?;
        tracing::info!("Report written to: {}", path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(report: &CollectionReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n=== Classified Repositories: {} across {} domains ===\n",
        report.total_records, report.distinct_domains
    ));
    if report.skipped_records > 0 {
        output.push_str(&format!(
            "({} records without classification fields were skipped)\n",
            report.skipped_records
        ));
    }

    output.push_str("\nTop Undervalued:\n");
    for (i, repo) in report.top_undervalued.iter().enumerate() {
        output.push_str(&format!(
            "  {:>2}. {} ({} stars): quality {:.2}, value {:.3} [{}]\n",
            i + 1,
            repo.repo_name,
            repo.star_count,
            repo.overall_quality,
            repo.value_score,
            repo.project_domain
        ));
    }

    output.push_str(&format!(
        "\nFlagged Underrated ({} total):\n",
        report.underrated_total
    ));
    for repo in &report.flagged_underrated {
        output.push_str(&format!(
            "  - {} ({} stars, code quality {}): {}\n",
            repo.repo_name, repo.star_count, repo.code_quality, repo.motivation
        ));
    }

    if !report.potentially_overrated.is_empty() {
        output.push_str("\nPotentially Overrated:\n");
        for repo in &report.potentially_overrated {
            output.push_str(&format!(
                "  - {} ({} stars): quality {:.2}\n",
                repo.repo_name, repo.star_count, repo.overall_quality
            ));
        }
    }

    if !report.top_domains.is_empty() {
        output.push_str("\nDomains:\n");
        for domain in &report.top_domains {
            output.push_str(&format!("  {}: {}\n", domain.domain, domain.count));
        }
    }

    output.push_str(&format!(
        "\nGenerated on: {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(report: &CollectionReport) -> String {
    let mut output = String::new();

    output.push_str("# Classified Repositories\n\n");
    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| Repositories | {} |\n", report.total_records));
    output.push_str(&format!("| Domains | {} |\n", report.distinct_domains));
    output.push_str(&format!(
        "| Flagged Underrated | {} |\n",
        report.underrated_total
    ));

    output.push_str("\n## Top Undervalued\n\n");
    output.push_str("| Rank | Repository | Stars | Quality | Value | Domain |\n");
    output.push_str("|------|------------|-------|---------|-------|--------|\n");
    for (i, repo) in report.top_undervalued.iter().enumerate() {
        output.push_str(&format!(
            "| {} | [{}]({}) | {} | {:.2} | {:.3} | {} |\n",
            i + 1,
            repo.repo_name,
            repo.github_url,
            repo.star_count,
            repo.overall_quality,
            repo.value_score,
            repo.project_domain
        ));
    }

    if !report.flagged_underrated.is_empty() {
        output.push_str("\n## Flagged Underrated\n\n");
        for repo in &report.flagged_underrated {
            output.push_str(&format!(
                "- **[{}]({})** ({} stars): {}\n",
                repo.repo_name, repo.github_url, repo.star_count, repo.motivation
            ));
        }
    }

    if !report.potentially_overrated.is_empty() {
        output.push_str("\n## Potentially Overrated\n\n");
        for repo in &report.potentially_overrated {
            output.push_str(&format!(
                "- **[{}]({})** ({} stars): quality {:.2}\n",
                repo.repo_name, repo.github_url, repo.star_count, repo.overall_quality
            ));
        }
    }

    if !report.top_domains.is_empty() {
        output.push_str("\n## Domains\n\n");
        output.push_str("| Domain | Repositories |\n|--------|--------------|\n");
        for domain in &report.top_domains {
            output.push_str(&format!("| {} | {} |\n", domain.domain, domain.count));
        }
    }

    output.push_str(&format!(
        "\n---\n*Generated on {}*\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse_exit_code(args: &[&str]) -> u8 {
        match Cli::try_parse_from(args) {
            Ok(_) => panic!("expected {:?} to be rejected", args),
            Err(e) => usage_exit_code(&e),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_usage_errors_exit_one() {
        assert_eq!(parse_exit_code(&["repoclass", "classify"]), 1);
        assert_eq!(parse_exit_code(&["repoclass", "classify-batch"]), 1);
        assert_eq!(parse_exit_code(&["repoclass", "search"]), 1);
        assert_eq!(parse_exit_code(&["repoclass", "search", "-l", "-3", "foo"]), 1);
        assert_eq!(parse_exit_code(&["repoclass", "search", "-t", "many", "foo"]), 1);
        assert_eq!(parse_exit_code(&["repoclass"]), 1);
    }

    #[test]
    fn test_help_and_version_exit_zero() {
        assert_eq!(parse_exit_code(&["repoclass", "--help"]), 0);
        assert_eq!(parse_exit_code(&["repoclass", "--version"]), 0);
        assert_eq!(parse_exit_code(&["repoclass", "search", "--help"]), 0);
    }

    #[test]
    fn test_zero_limit_is_an_input_error() {
        let cli = Cli::try_parse_from(["repoclass", "search", "-l", "0", "foo"]).unwrap();
        let Command::Search { limit, total, .. } = cli.command else {
            panic!("expected search");
        };
        assert_eq!(limit, 0);

        let err = SearchConfig::new(&Config::from_env(), limit, total).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_parses_report_defaults() {
        let cli = Cli::try_parse_from(["repoclass", "report", "-f", "csv"]).unwrap();
        match cli.command {
            Command::Report { input, format, output, top } => {
                assert!(input.is_none());
                assert_eq!(format, "csv");
                assert!(output.is_none());
                assert_eq!(top, 10);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
