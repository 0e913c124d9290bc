use pollmcp_core::prompts::{
    GetPromptResult, Prompt, PromptArgument, PromptContent, PromptMessage,
};
use serde_json::{Map, Value};

struct PromptTemplate {
    prompt: Prompt,
    template: &'static str,
}

pub struct MockPrompts {
    templates: Vec<PromptTemplate>,
}

impl Default for MockPrompts {
    fn default() -> Self {
        Self::new()
    }
}

fn argument(name: &str, description: &str) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: Some(description.to_string()),
        required: true,
    }
}

impl MockPrompts {
    pub fn new() -> Self {
        Self {
            templates: vec![
                PromptTemplate {
                    prompt: Prompt {
                        name: "greeting".to_string(),
                        description: Some("A pleasant greeting message.".to_string()),
                        arguments: vec![argument("name", "Who to greet")],
                    },
                    template: "Hello, {{name}}!",
                },
                PromptTemplate {
                    prompt: Prompt {
                        name: "confirm".to_string(),
                        description: Some("Ask the user to confirm something.".to_string()),
                        arguments: vec![argument("question", "What needs confirming")],
                    },
                    template: "Please confirm: {{question}}",
                },
                PromptTemplate {
                    prompt: Prompt {
                        name: "farewell".to_string(),
                        description: Some("A warm farewell message.".to_string()),
                        arguments: vec![argument("name", "Who is leaving")],
                    },
                    template: "Goodbye, {{name}}. Take care!",
                },
            ],
        }
    }

    pub fn list(&self) -> Vec<Prompt> {
        self.templates.iter().map(|t| t.prompt.clone()).collect()
    }

    /// Render a prompt, replacing `{{key}}` for every supplied argument.
    /// Placeholders without an argument are left as they are.
    pub fn render(&self, name: &str, arguments: &Map<String, Value>) -> Option<GetPromptResult> {
        let entry = self.templates.iter().find(|t| t.prompt.name == name)?;
        let text = arguments
            .iter()
            .fold(entry.template.to_string(), |rendered, (key, value)| {
                let replacement = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                rendered.replace(&format!("{{{{{key}}}}}"), &replacement)
            });

        Some(GetPromptResult {
            description: entry.prompt.description.clone(),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent {
                    content_type: "text".to_string(),
                    text,
                },
            }],
        })
    }
}
