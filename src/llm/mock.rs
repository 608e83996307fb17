use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::prompts::TemplateDefinition;
use crate::llm::provider::{LanguageModel, ModelInvocation};
use crate::process::SessionResult;

/// Test model that replays queued responses in order.
#[derive(Default)]
pub struct MockModel {
    responses: Mutex<Vec<SessionResult>>,
    templates: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<ModelInvocation>>,
    pub saved_templates: Mutex<Vec<TemplateDefinition>>,
    pub template_checks: Mutex<usize>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_response(&self, stdout: &str, stderr: &str, exit_code: i32) {
        self.responses.lock().unwrap().push(SessionResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
        });
    }

    pub fn add_template(&self, name: &str) {
        self.templates.lock().unwrap().insert(name.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.model.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn template_exists(&self, name: &str) -> Result<bool> {
        *self.template_checks.lock().unwrap() += 1;
        Ok(self.templates.lock().unwrap().contains(name))
    }

    async fn save_template(&self, template: &TemplateDefinition) -> Result<()> {
        self.templates.lock().unwrap().insert(template.name.clone());
        self.saved_templates.lock().unwrap().push(template.clone());
        Ok(())
    }

    async fn run(&self, invocation: &ModelInvocation) -> Result<SessionResult> {
        self.calls.lock().unwrap().push(invocation.clone());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(SessionResult {
                stdout: String::new(),
                stderr: "mock: no response configured".to_string(),
                exit_code: 1,
            })
        } else {
            Ok(responses.remove(0))
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
