pub mod provider;
pub mod cli;
pub mod prompts;
pub mod parser;
pub mod response;
pub mod retry;
#[cfg(test)]
pub mod mock;

pub use provider::{LanguageModel, ModelInvocation};
pub use cli::LlmCli;
pub use prompts::TemplateDefinition;
pub use response::ModelOutcome;
pub use retry::{invoke_with_fallback, ModelReply, RetryPolicy};
