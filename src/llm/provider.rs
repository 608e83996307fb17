use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::prompts::TemplateDefinition;
use crate::process::SessionResult;

/// One call of a saved template against a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInvocation {
    pub model: String,
    pub template: String,
    pub stars: u64,
    /// File streamed to the model as the prompt body.
    pub input: PathBuf,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn template_exists(&self, name: &str) -> Result<bool>;

    async fn save_template(&self, template: &TemplateDefinition) -> Result<()>;

    /// Runs the invocation and returns whatever the tool printed.
    async fn run(&self, invocation: &ModelInvocation) -> Result<SessionResult>;

    fn name(&self) -> &str;
}
