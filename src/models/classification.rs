use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repository::RepositoryMetadata;

/// The model's structured judgment of a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub project_domain: String,
    pub motivation: String,
    pub tech_stack: String,
    #[serde(deserialize_with = "score")]
    pub code_quality: u8,
    #[serde(deserialize_with = "score")]
    pub innovativeness: u8,
    #[serde(deserialize_with = "score")]
    pub usefulness: u8,
    #[serde(deserialize_with = "score")]
    pub user_friendliness: u8,
    #[serde(deserialize_with = "flag")]
    pub underrated: bool,
    #[serde(deserialize_with = "flag")]
    pub overrated: bool,
}

impl Classification {
    pub fn overall_quality(&self) -> f64 {
        f64::from(
            u16::from(self.code_quality)
                + u16::from(self.innovativeness)
                + u16::from(self.usefulness)
                + u16::from(self.user_friendliness),
        ) / 4.0
    }
}

/// Unit of persistence: classification, metadata and the canonical URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub classification: Classification,
    #[serde(flatten)]
    pub metadata: RepositoryMetadata,
    pub github_url: String,
}

impl EnrichedRecord {
    /// Merges a raw model reply with fetched metadata.
    ///
    /// Fails when the reply is not an object carrying every classification field.
    pub fn merge(
        reply: &serde_json::Value,
        metadata: &RepositoryMetadata,
        github_url: &str,
    ) -> Result<Self, serde_json::Error> {
        let classification = Classification::deserialize(reply)?;
        Ok(Self {
            classification,
            metadata: metadata.clone(),
            github_url: github_url.to_string(),
        })
    }

    /// Adds metadata and `github_url` to a reply object that lacks some
    /// classification fields. Metadata keys replace same-named reply keys.
    ///
    /// Fails only when the reply is not a JSON object.
    pub fn annotate(
        reply: &Value,
        metadata: &RepositoryMetadata,
        github_url: &str,
    ) -> Result<Value, serde_json::Error> {
        let mut object = reply
            .as_object()
            .cloned()
            .ok_or_else(|| <serde_json::Error as de::Error>::custom("reply is not a JSON object"))?;

        if let Value::Object(fields) = serde_json::to_value(metadata)? {
            object.extend(fields);
        }
        object.insert("github_url".to_string(), Value::String(github_url.to_string()));
        Ok(Value::Object(object))
    }
}

// Scores arrive as integers, floats or numeric strings; out-of-range values are clamped to 1..=10.
fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Int(i) => i as f64,
        Raw::Float(f) => f,
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid score '{}'", s)))?,
    };

    if !value.is_finite() {
        return Err(de::Error::custom("score is not a finite number"));
    }
    Ok(value.round().clamp(1.0, 10.0) as u8)
}

// Models answer booleans as true/false, 0/1 or strings.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Int(i) => Ok(i != 0),
        Raw::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(de::Error::custom(format!("invalid flag '{}'", other))),
        },
    }
}
