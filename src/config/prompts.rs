//! Prompt templates for Coursemate.
//!
//! Prompts can be customized by placing an `assistant.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the course assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// System instructions sent with every LLM call.
    pub system: String,
    /// Wrapper for the user's question. Receives `{{question}}`.
    pub query: String,
    /// Answer returned when the model produces no text.
    pub fallback_answer: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant specialized in course materials and educational content, with access to a search tool over course transcripts.

Search tool usage:
- Use the search tool only for questions about specific course content or detailed course materials
- Up to two searches per query, for comparisons or multi-part questions
- For simple single-topic questions, one search is sufficient
- Synthesize search results into accurate, fact-based answers
- If a search yields no results, say so plainly without offering alternatives

Response protocol:
- General knowledge questions: answer from your own knowledge without searching
- Course-specific questions: search first, then answer
- No meta-commentary: give the answer only, never describe your searches or reasoning
- Do not say "based on the search results"

Every answer must be:
1. Brief and focused
2. Educational
3. Clear
4. Supported by examples when they help understanding

Provide only the direct answer to what was asked."#
                .to_string(),
            query: "Answer this question about course materials: {{question}}".to_string(),
            fallback_answer:
                "I was unable to generate a complete response. Please try rephrasing your question."
                    .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in a single left-to-right pass, so text
    /// coming from a value is never expanded again. Unknown placeholders are
    /// left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            match after_open.find("}}") {
                Some(end) => {
                    let key = &after_open[..end];
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Wrap a user question in the configured query template.
    pub fn render_query(&self, question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        self.render_with_custom(&self.assistant.query, &vars)
    }

    /// System instructions with custom variables applied.
    pub fn system(&self) -> String {
        self.render_with_custom(&self.assistant.system, &HashMap::new())
    }
}
