use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::llm::prompts::{TemplateDefinition, STARS_PARAM};
use crate::llm::provider::{LanguageModel, ModelInvocation};
use crate::process::{self, SessionResult};

const LLM: &str = "llm";

/// [`LanguageModel`] backed by the `llm` command-line tool.
///
/// Provider credentials and plugins are whatever `llm` already has configured.
#[derive(Debug, Default, Clone)]
pub struct LlmCli;

impl LlmCli {
    pub fn new() -> Self {
        Self
    }
}

/// Template names from `llm templates list`, whose entries look like
/// `name : system: ...` with wrapped continuation lines indented.
pub(crate) fn parse_template_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| line.split(" : ").next())
        .map(|name| name.trim().trim_end_matches(':').trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

pub(crate) fn invocation_args(invocation: &ModelInvocation) -> Vec<String> {
    vec![
        "-t".to_string(),
        invocation.template.clone(),
        "-m".to_string(),
        invocation.model.clone(),
        "-p".to_string(),
        STARS_PARAM.to_string(),
        invocation.stars.to_string(),
    ]
}

#[async_trait]
impl LanguageModel for LlmCli {
    async fn template_exists(&self, name: &str) -> Result<bool> {
        let args = vec!["templates".to_string(), "list".to_string()];
        let result = process::run(LLM, &args, None).await?;
        if !result.success() {
            return Err(Error::Template(format!(
                "llm templates list failed: {}",
                result.stderr.trim()
            )));
        }
        Ok(parse_template_names(&result.stdout).iter().any(|n| n == name))
    }

    async fn save_template(&self, template: &TemplateDefinition) -> Result<()> {
        tracing::info!("Saving model template: {}", template.name);
        let args = vec![
            "--system".to_string(),
            template.system.clone(),
            "--schema".to_string(),
            serde_json::to_string(&template.schema)?,
            "--save".to_string(),
            template.name.clone(),
        ];
        let result = process::run(LLM, &args, None).await?;
        if !result.success() {
            return Err(Error::Template(format!(
                "failed to save template {}: {}",
                template.name,
                result.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn run(&self, invocation: &ModelInvocation) -> Result<SessionResult> {
        let result =
            process::run(LLM, &invocation_args(invocation), Some(&invocation.input)).await?;
        if !result.success() {
            tracing::warn!(
                "llm exited with code {} using {}",
                result.exit_code,
                invocation.model
            );
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        LLM
    }
}
