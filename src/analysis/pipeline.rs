use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::github::HostingPlatform;
use crate::llm::{invoke_with_fallback, LanguageModel, RetryPolicy, TemplateDefinition};
use crate::models::{EnrichedRecord, RepoId, RepositoryMetadata};
use crate::packer::{PackedArtifact, Packer};
use crate::storage::OutputCollection;

/// How a single classification run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome {
    /// A record for this URL already exists.
    Skipped { github_url: String },
    Persisted {
        github_url: String,
        model: String,
        enriched: bool,
    },
}

/// Classifies one repository at a time and appends the result to the output collection.
pub struct Classifier {
    platform: Arc<dyn HostingPlatform>,
    model: Arc<dyn LanguageModel>,
    packer: Arc<dyn Packer>,
    collection: OutputCollection,
    config: ClassifierConfig,
    retry: RetryPolicy,
    template_ready: OnceCell<()>,
}

impl Classifier {
    pub fn new(
        platform: Arc<dyn HostingPlatform>,
        model: Arc<dyn LanguageModel>,
        packer: Arc<dyn Packer>,
        collection: OutputCollection,
        config: ClassifierConfig,
    ) -> Self {
        let retry = RetryPolicy::from(&config);
        Self {
            platform,
            model,
            packer,
            collection,
            config,
            retry,
            template_ready: OnceCell::new(),
        }
    }

    pub fn collection(&self) -> &OutputCollection {
        &self.collection
    }

    pub async fn classify(&self, url: &str) -> Result<ClassifyOutcome> {
        // Step 1: Normalize the URL
        let repo = RepoId::parse(url)?;
        let github_url = repo.canonical_url();
        tracing::info!("Classifying {}", repo);

        // Step 2: Make sure the model template exists
        self.ensure_template().await?;

        // Step 3: Fetch metadata
        let metadata = self.fetch_metadata(&repo).await;
        tracing::info!(
            "{}: {} stars, {} commits, {} open issues, license {}",
            repo,
            metadata.star_count,
            metadata.commit_count,
            metadata.open_issues_count,
            metadata.license
        );

        // Step 4: Skip repositories that are already classified
        let url = github_url.clone();
        if self.collection.run_blocking(move |c| c.contains(&url)).await? {
            tracing::info!("{} is already classified, skipping", github_url);
            return Ok(ClassifyOutcome::Skipped { github_url });
        }

        // Step 5: Pack the source tree; the artifact is removed on every exit path
        let artifact = PackedArtifact::new(
            &self.config.temp_dir,
            &self.config.temp_prefix,
            &repo.full_name(),
        );
        if let Err(e) = self.packer.pack(&github_url, artifact.path()).await {
            tracing::error!("Packaging failed for {}: {}", github_url, e);
            drop(artifact);
            return Err(match e {
                Error::Packaging(_) => e,
                other => Error::Packaging(format!("{} ({})", github_url, other)),
            });
        }

        // Step 6: Ask the model, falling back on rate limits
        let reply = invoke_with_fallback(
            self.model.as_ref(),
            &self.retry,
            &self.config.template_name,
            metadata.star_count,
            artifact.path(),
        )
        .await?;

        // Step 7: Merge the judgment with the metadata
        let (record, enriched) = match EnrichedRecord::merge(&reply.data, &metadata, &github_url) {
            Ok(record) => (serde_json::to_value(&record)?, true),
            Err(e) => {
                tracing::warn!("Classification of {} is incomplete: {}", github_url, e);
                match EnrichedRecord::annotate(&reply.data, &metadata, &github_url) {
                    Ok(record) => (record, false),
                    Err(e) => {
                        tracing::warn!("Saving the reply for {} unenriched: {}", github_url, e);
                        (reply.data, false)
                    }
                }
            }
        };

        // Step 8: Persist
        let appended = self
            .collection
            .run_blocking(move |c| {
                c.ensure_exists()?;
                c.append(record)
            })
            .await?;
        if !appended {
            return Ok(ClassifyOutcome::Skipped { github_url });
        }
        tracing::info!(
            "Saved classification of {} to {}",
            github_url,
            self.collection.path().display()
        );

        Ok(ClassifyOutcome::Persisted {
            github_url,
            model: reply.model,
            enriched,
        })
    }

    async fn ensure_template(&self) -> Result<()> {
        self.template_ready
            .get_or_try_init(|| async {
                let name = &self.config.template_name;
                if self.model.template_exists(name).await? {
                    tracing::debug!("Reusing model template {}", name);
                } else {
                    self.model
                        .save_template(&TemplateDefinition::classification(name.clone()))
                        .await?;
                }
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    // Lookups never fail the run; missing values become defaults.
    async fn fetch_metadata(&self, repo: &RepoId) -> RepositoryMetadata {
        let view = self
            .platform
            .repo_view(repo)
            .await
            .map_err(|e| tracing::warn!("Repository view failed for {}: {}", repo, e))
            .ok();

        let commit_count = self
            .platform
            .commit_count(repo)
            .await
            .map_err(|e| tracing::warn!("Commit count failed for {}: {}", repo, e))
            .ok();

        let open_issues = self
            .platform
            .open_issues_count(repo)
            .await
            .map_err(|e| tracing::warn!("Open issue count failed for {}: {}", repo, e))
            .ok()
            .flatten();

        RepositoryMetadata::from_parts(view, commit_count, open_issues)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ErrorJsonPolicy;
    use crate::github::mock::MockPlatform;
    use crate::llm::mock::MockModel;
    use crate::packer::mock::MockPacker;
    use std::time::Duration;

    pub(crate) const REPLY: &str = r#"{"project_domain":"cli tool","motivation":"x","tech_stack":"go","code_quality":7,"innovativeness":5,"usefulness":6,"user_friendliness":8,"underrated":0,"overrated":0}"#;

    pub(crate) struct Harness {
        pub dir: tempfile::TempDir,
        pub platform: Arc<MockPlatform>,
        pub model: Arc<MockModel>,
        pub packer: Arc<MockPacker>,
        pub classifier: Classifier,
    }

    pub(crate) fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let model = Arc::new(MockModel::new());
        let packer = Arc::new(MockPacker::new());
        let config = ClassifierConfig {
            primary_model: "primary".to_string(),
            fallback_model: "fallback".to_string(),
            template_name: "repo-classifier".to_string(),
            temp_prefix: "pack-".to_string(),
            temp_dir: dir.path().to_path_buf(),
            cooldown: Duration::from_secs(60),
            error_json_policy: ErrorJsonPolicy::Accept,
        };
        let collection = OutputCollection::new(dir.path().join("classified_repos.json"));
        let classifier = Classifier::new(
            platform.clone(),
            model.clone(),
            packer.clone(),
            collection,
            config,
        );
        Harness {
            dir,
            platform,
            model,
            packer,
            classifier,
        }
    }

    fn leftover_artifacts(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("pack-"))
            .count()
    }

    #[tokio::test]
    async fn test_end_to_end_classification() {
        let h = harness();
        h.platform.set_repo("acme/tool", 42, 120, 3);
        h.model.enqueue_response(REPLY, "", 0);

        let outcome = h
            .classifier
            .classify("https://github.com/acme/tool.git/")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ClassifyOutcome::Persisted {
                github_url: "https://github.com/acme/tool".to_string(),
                model: "primary".to_string(),
                enriched: true,
            }
        );

        let records = h.classifier.collection().load().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["star_count"], 42);
        assert_eq!(record["commit_count"], 120);
        assert_eq!(record["open_issues_count"], 3);
        assert_eq!(record["license"], "unknown");
        assert_eq!(record["github_url"], "https://github.com/acme/tool");
        assert_eq!(record["project_domain"], "cli tool");
        assert_eq!(record["user_friendliness"], 8);

        let calls = h.model.calls.lock().unwrap();
        assert_eq!(calls[0].stars, 42);
        assert_eq!(calls[0].template, "repo-classifier");
        assert_eq!(h.packer.packed.lock().unwrap()[0].0, "https://github.com/acme/tool");
        assert_eq!(leftover_artifacts(h.dir.path()), 0);
    }

    #[tokio::test]
    async fn test_template_saved_once_per_process() {
        let h = harness();
        h.platform.set_repo("acme/one", 1, 1, 0);
        h.platform.set_repo("acme/two", 2, 1, 0);
        h.model.enqueue_response(REPLY, "", 0);
        h.model.enqueue_response(REPLY, "", 0);

        h.classifier.classify("acme/one").await.unwrap();
        h.classifier.classify("acme/two").await.unwrap();

        let saved = h.model.saved_templates.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "repo-classifier");
        assert_eq!(*h.model.template_checks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_template_is_reused() {
        let h = harness();
        h.model.add_template("repo-classifier");
        h.platform.set_repo("acme/tool", 1, 1, 0);
        h.model.enqueue_response(REPLY, "", 0);

        h.classifier.classify("acme/tool").await.unwrap();
        assert!(h.model.saved_templates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_already_classified_is_skipped() {
        let h = harness();
        h.platform.set_repo("acme/tool", 42, 1, 0);
        h.model.enqueue_response(REPLY, "", 0);

        h.classifier.classify("https://github.com/acme/tool").await.unwrap();
        let before = std::fs::read_to_string(h.classifier.collection().path()).unwrap();

        let outcome = h.classifier.classify("acme/tool").await.unwrap();
        assert_eq!(
            outcome,
            ClassifyOutcome::Skipped {
                github_url: "https://github.com/acme/tool".to_string()
            }
        );

        let after = std::fs::read_to_string(h.classifier.collection().path()).unwrap();
        assert_eq!(before, after);
        assert_eq!(h.model.call_count(), 1);
        assert_eq!(h.packer.packed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_metadata_defaults_to_zero() {
        let h = harness();
        h.model.enqueue_response(REPLY, "", 0);

        h.classifier.classify("acme/unknown").await.unwrap();

        let record = &h.classifier.collection().load().unwrap()[0];
        assert_eq!(record["star_count"], 0);
        assert_eq!(record["commit_count"], 0);
        assert_eq!(record["open_issues_count"], 0);
        assert_eq!(record["last_commit_date"], "unknown");
        assert_eq!(record["license"], "unknown");
        assert_eq!(h.model.calls.lock().unwrap()[0].stars, 0);
    }

    #[tokio::test]
    async fn test_packaging_failure_leaves_collection_unchanged() {
        let h = harness();
        h.platform.set_repo("acme/broken", 5, 1, 0);
        h.packer.fail_for("https://github.com/acme/broken");

        let err = h.classifier.classify("acme/broken").await.unwrap_err();

        assert!(matches!(err, Error::Packaging(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(h.classifier.collection().load().unwrap().is_empty());
        assert_eq!(h.model.call_count(), 0);
        assert_eq!(leftover_artifacts(h.dir.path()), 0);
    }

    #[tokio::test]
    async fn test_fallback_reply_is_persisted() {
        let h = harness();
        h.platform.set_repo("acme/tool", 9, 1, 0);
        h.model.enqueue_response("", "Error: 429 rate limit exceeded", 1);
        h.model.enqueue_response(
            &REPLY.replace("\"cli tool\"", "\"from fallback\""),
            "",
            0,
        );

        let outcome = h.classifier.classify("acme/tool").await.unwrap();
        assert!(matches!(outcome, ClassifyOutcome::Persisted { ref model, .. } if model == "fallback"));

        let record = &h.classifier.collection().load().unwrap()[0];
        assert_eq!(record["project_domain"], "from fallback");
        assert_eq!(record["code_quality"], 7);
        assert_eq!(record["star_count"], 9);
    }

    #[tokio::test]
    async fn test_unenriched_reply_is_still_saved() {
        let h = harness();
        h.platform.set_repo("acme/odd", 3, 1, 0);
        h.model.enqueue_response(r#"{"project_domain": "partial"}"#, "", 0);

        let outcome = h.classifier.classify("acme/odd").await.unwrap();
        assert!(matches!(outcome, ClassifyOutcome::Persisted { enriched: false, .. }));

        let records = h.classifier.collection().load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["project_domain"], "partial");
        assert_eq!(records[0]["github_url"], "https://github.com/acme/odd");
        assert_eq!(records[0]["star_count"], 3);
    }

    #[tokio::test]
    async fn test_partial_reply_is_keyed_and_not_reclassified() {
        let h = harness();
        h.platform.set_repo("acme/odd", 3, 7, 2);
        let mut reply: serde_json::Value = serde_json::from_str(REPLY).unwrap();
        reply.as_object_mut().unwrap().remove("overrated");
        h.model.enqueue_response(&reply.to_string(), "", 0);
        h.model.enqueue_response(REPLY, "", 0);

        let first = h.classifier.classify("acme/odd").await.unwrap();
        assert!(matches!(first, ClassifyOutcome::Persisted { enriched: false, .. }));

        let second = h.classifier.classify("https://github.com/acme/odd").await.unwrap();
        assert_eq!(
            second,
            ClassifyOutcome::Skipped {
                github_url: "https://github.com/acme/odd".to_string()
            }
        );

        let records = h.classifier.collection().load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["github_url"], "https://github.com/acme/odd");
        assert_eq!(records[0]["star_count"], 3);
        assert_eq!(records[0]["commit_count"], 7);
        assert_eq!(records[0]["open_issues_count"], 2);
        assert_eq!(records[0]["license"], "unknown");
        assert_eq!(h.model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_object_reply_is_saved_as_is() {
        let h = harness();
        h.platform.set_repo("acme/list", 1, 1, 0);
        h.model.enqueue_response("[1, 2, 3]", "", 0);

        let outcome = h.classifier.classify("acme/list").await.unwrap();
        assert!(matches!(outcome, ClassifyOutcome::Persisted { enriched: false, .. }));
        assert_eq!(h.classifier.collection().load().unwrap()[0], serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_model_failure_aborts_without_record() {
        let h = harness();
        h.platform.set_repo("acme/tool", 3, 1, 0);
        h.model.enqueue_response("", "Error: Unknown model: primary", 1);

        let err = h.classifier.classify("acme/tool").await.unwrap_err();
        assert!(matches!(err, Error::ModelFailed(_)));
        assert!(h.classifier.collection().load().unwrap().is_empty());
        assert_eq!(leftover_artifacts(h.dir.path()), 0);
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected_early() {
        let h = harness();
        let err = h.classifier.classify("https://github.com/").await.unwrap_err();
        assert!(matches!(err, Error::MalformedUrl(_)));
        assert_eq!(*h.model.template_checks.lock().unwrap(), 0);
    }
}
