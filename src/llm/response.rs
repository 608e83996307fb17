use serde_json::Value;

use crate::config::ErrorJsonPolicy;
use crate::llm::parser::parse_structured;
use crate::process::SessionResult;

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "ratelimit",
    "429",
    "quota",
    "resource_exhausted",
    "resource exhausted",
    "too many requests",
];

const ERROR_MARKERS: &[&str] = &["error", "exception", "traceback"];

/// Result of one model call, decided once from the raw tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Ok(Value),
    RateLimited,
    Failed(String),
}

impl ModelOutcome {
    /// Classifies a model reply.
    ///
    /// Rate-limit markers win over everything else. Otherwise a reply that
    /// parses as JSON succeeds; when the output also mentions an error the
    /// decision is left to `policy`.
    pub fn from_session(result: &SessionResult, policy: ErrorJsonPolicy) -> Self {
        let combined = result.combined();
        let lowered = combined.to_lowercase();
        // The structured reply is on stdout; stderr carries diagnostics only.
        let parsed = parse_structured(&result.stdout).ok();

        // A parsed reply may legitimately talk about rate limits or quotas, so
        // only diagnostics and unparseable output are scanned for them. Error
        // words inside a parsed reply are left to `ErrorJsonPolicy` below.
        let rate_limit_text = if parsed.is_some() {
            result.stderr.to_lowercase()
        } else {
            lowered.clone()
        };
        if RATE_LIMIT_MARKERS.iter().any(|m| rate_limit_text.contains(m)) {
            return ModelOutcome::RateLimited;
        }

        let error_reported =
            !result.success() || ERROR_MARKERS.iter().any(|m| lowered.contains(m));

        match (error_reported, parsed) {
            (false, Some(value)) => ModelOutcome::Ok(value),
            (true, Some(value)) => match policy {
                ErrorJsonPolicy::Accept => {
                    tracing::warn!("Model output mentions an error but contains valid JSON; accepting it");
                    ModelOutcome::Ok(value)
                }
                ErrorJsonPolicy::Reject => ModelOutcome::Failed(first_line(&combined)),
            },
            (true, None) => ModelOutcome::Failed(first_line(&combined)),
            (false, None) => ModelOutcome::Failed(format!(
                "Response is not valid JSON: {}",
                first_line(&combined)
            )),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelOutcome::RateLimited)
    }
}

fn first_line(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("empty response");
    line.chars().take(200).collect()
}
