use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use crate::config::{ClassifierConfig, ErrorJsonPolicy};
use crate::error::{Error, Result};
use crate::llm::provider::{LanguageModel, ModelInvocation};
use crate::llm::response::ModelOutcome;

/// Models and timing used when the primary model is rate limited.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub primary_model: String,
    pub fallback_model: String,
    pub cooldown: Duration,
    pub error_json_policy: ErrorJsonPolicy,
}

impl From<&ClassifierConfig> for RetryPolicy {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
            cooldown: config.cooldown,
            error_json_policy: config.error_json_policy,
        }
    }
}

/// Structured data returned by the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub model: String,
    pub data: Value,
}

/// Calls the primary model, then on a rate limit the fallback model once,
/// then after one cooldown the fallback model a final time.
pub async fn invoke_with_fallback(
    model: &dyn LanguageModel,
    policy: &RetryPolicy,
    template: &str,
    stars: u64,
    input: &Path,
) -> Result<ModelReply> {
    let invocation = |model_id: &str| ModelInvocation {
        model: model_id.to_string(),
        template: template.to_string(),
        stars,
        input: input.to_path_buf(),
    };

    tracing::info!("Classifying with {} ({})", policy.primary_model, model.name());
    let mut answered_by = policy.primary_model.clone();
    let mut outcome = call(model, &invocation(&policy.primary_model), policy).await?;

    if outcome.is_rate_limited() {
        tracing::warn!(
            "{} is rate limited, retrying with {}",
            policy.primary_model,
            policy.fallback_model
        );
        answered_by = policy.fallback_model.clone();
        outcome = call(model, &invocation(&policy.fallback_model), policy).await?;
    }

    if outcome.is_rate_limited() {
        tracing::warn!(
            "{} is rate limited, waiting {:?} before the last attempt",
            policy.fallback_model,
            policy.cooldown
        );
        sleep(policy.cooldown).await;
        outcome = call(model, &invocation(&policy.fallback_model), policy).await?;
    }

    match outcome {
        ModelOutcome::Ok(data) => Ok(ModelReply {
            model: answered_by,
            data,
        }),
        ModelOutcome::RateLimited => Err(Error::ModelUnavailable),
        ModelOutcome::Failed(message) => Err(Error::ModelFailed(message)),
    }
}

async fn call(
    model: &dyn LanguageModel,
    invocation: &ModelInvocation,
    policy: &RetryPolicy,
) -> Result<ModelOutcome> {
    let result = model.run(invocation).await?;
    Ok(ModelOutcome::from_session(&result, policy.error_json_policy))
}
