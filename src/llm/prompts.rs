use serde_json::{json, Value};

/// Template parameter carrying the repository's star count.
pub const STARS_PARAM: &str = "stars";

pub const SYSTEM_PROMPT: &str = r#"You are an experienced software engineer reviewing an open-source repository.
The input is the repository's source tree packed into a single text document.
The repository currently has $stars GitHub stars.

You must respond with ONLY a JSON object matching this exact schema, with no prose and no markdown fences:
{
    "project_domain": "string (short phrase, e.g. 'cli tool', 'web framework', 'game engine')",
    "motivation": "string (one or two sentences on the problem the project solves)",
    "tech_stack": "string (main languages and frameworks, comma separated)",
    "code_quality": 1-10,
    "innovativeness": 1-10,
    "usefulness": 1-10,
    "user_friendliness": 1-10,
    "underrated": true|false,
    "overrated": true|false
}

Guidelines:
- Judge the code itself: structure, tests, documentation, error handling
- innovativeness rewards novel ideas or approaches, not novelty of the language
- underrated is true when the quality and usefulness are high relative to $stars stars
- overrated is true when $stars stars clearly exceeds what the code delivers
- Use the full 1-10 range; 5 is an average project"#;

/// JSON schema the model output is constrained to.
pub fn classification_schema() -> Value {
    let text = json!({ "type": "string" });
    let score = json!({ "type": "integer", "minimum": 1, "maximum": 10 });
    let flag = json!({ "type": "boolean" });

    json!({
        "type": "object",
        "properties": {
            "project_domain": text,
            "motivation": text,
            "tech_stack": text,
            "code_quality": score,
            "innovativeness": score,
            "usefulness": score,
            "user_friendliness": score,
            "underrated": flag,
            "overrated": flag
        },
        "required": [
            "project_domain",
            "motivation",
            "tech_stack",
            "code_quality",
            "innovativeness",
            "usefulness",
            "user_friendliness",
            "underrated",
            "overrated"
        ]
    })
}

/// A named, saved bundle of system prompt and output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefinition {
    pub name: String,
    pub system: String,
    pub schema: Value,
}

impl TemplateDefinition {
    pub fn classification(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: SYSTEM_PROMPT.to_string(),
            schema: classification_schema(),
        }
    }
}
