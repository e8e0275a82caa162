use crate::knowledge::CategoryKnowledge;
use crate::models::Category;

/// Values interpolated into the prompt templates.
#[derive(Debug, Clone, Default)]
pub struct PromptVariables {
    pub target_url: String,
    pub vulnerability: String,
    pub details: String,
    pub category: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub knowledge_context: Option<String>,
    pub knowledge_payloads: Option<String>,
    pub knowledge_example: Option<String>,
}

impl PromptVariables {
    pub fn new(
        target_url: &str,
        vulnerability: &str,
        details: &str,
        category: Category,
        attempt: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            target_url: target_url.to_string(),
            vulnerability: vulnerability.to_string(),
            details: details.to_string(),
            category: category.to_string(),
            attempt,
            max_attempts,
            ..Default::default()
        }
    }

    /// Attach category knowledge; an empty entry contributes nothing.
    pub fn with_knowledge(mut self, knowledge: &CategoryKnowledge) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        self.knowledge_context = non_empty(&knowledge.context);
        self.knowledge_payloads = (!knowledge.payloads.is_empty())
            .then(|| knowledge.payloads.iter().map(|p| format!("- {}", p)).collect::<Vec<_>>().join("\n"));
        self.knowledge_example = non_empty(&knowledge.example);
        self
    }
}

const SYSTEM_TEMPLATE: &str = r#"You write browser exploit plans that reproduce a reported web vulnerability against {{TARGET_URL}}.

A plan is a JSON document and nothing else:
{"routines": [{"name": "main", "async": true, "actions": [ ... ]}]}

The routine "main" is the entry point and must be marked "async": true. Extra routines
may be declared and invoked with {"op": "call", "routine": "<name>"}.

Capabilities available to the plan (nothing else is reachable):
- page: one fresh, isolated browser page
  {"op": "navigate", "path": "/relative/path"}   relative to the target
  {"op": "navigate", "url": "{{TARGET_URL}}/..."} must stay on the target origin
  {"op": "fill", "selector": "<css>", "value": "<text>"}
  {"op": "click", "selector": "<css>"}
  {"op": "press", "key": "Enter"}
  {"op": "wait", "ms": 500}                      capped at 10000
  {"op": "wait_for_load"}
- screenshot helper: saves {timestamp}_{label}.png into the results directory
  {"op": "screenshot", "label": "<label>", "into": "screenshots"}
- result record {success, evidence, screenshots, steps_to_reproduce, console_logs}
  {"op": "append", "into": "steps_to_reproduce" | "evidence" | "console_logs", "text": "..."}
  {"op": "set_success"}
- control flow
  {"op": "check", "condition": {...}, "then": [...], "else": [...]}
  {"op": "for_each", "values": ["..."], "as": "payload", "do": [...], "stop_on_success": true}
  {"op": "return"}
  Inside for_each, "{{payload}}" in any string is replaced by the current value.
- conditions: {"url_contains": "..."}, {"content_contains": "..."}, {"element_exists": "<css>"},
  {"dialog_seen": ""}, {"console_contains": "..."}, {"header_missing": "<name>"}, {"status_is": 200}

Every plan must:
1. Start by navigating to the target and taking an "initial_state" screenshot.
2. Record every step in "steps_to_reproduce".
3. Take screenshots at key points.
4. On success, call set_success and append what proves it to "evidence".
Console messages from the page are collected automatically.

Limits: at most 200 actions executed, 50 values per for_each, nesting depth 8.
{{KNOWLEDGE}}"#;

const USER_TEMPLATE: &str = r#"Create a plan for:
Vulnerability: {{VULNERABILITY}}
Details: {{DETAILS}}
Category: {{CATEGORY}}
{{ATTEMPT_NOTE}}
Respond with the JSON document only, without markdown fences."#;

/// Capability contract, category knowledge (empty when absent) and output rules.
pub fn system_prompt(vars: &PromptVariables) -> String {
    let mut knowledge = String::new();
    if let Some(context) = &vars.knowledge_context {
        knowledge.push_str(&format!("\nContext for this vulnerability type:\n{}\n", context.trim()));
    }
    if let Some(payloads) = &vars.knowledge_payloads {
        knowledge.push_str(&format!("\nCommon payloads:\n{}\n", payloads));
    }
    if let Some(example) = &vars.knowledge_example {
        knowledge.push_str(&format!("\nExample actions:\n{}\n", example.trim()));
    }

    interpolate(SYSTEM_TEMPLATE, vars).replace("{{KNOWLEDGE}}", &knowledge)
}

pub fn user_prompt(vars: &PromptVariables) -> String {
    let attempt_note = if vars.attempt > 1 {
        format!(
            "This is attempt {} of {}. Earlier plans did not demonstrate the issue; use different entry points or payloads.\n",
            vars.attempt, vars.max_attempts
        )
    } else {
        String::new()
    };
    interpolate(USER_TEMPLATE, vars).replace("{{ATTEMPT_NOTE}}", &attempt_note)
}

fn interpolate(template: &str, vars: &PromptVariables) -> String {
    let replacements: &[(&str, &str)] = &[
        ("{{TARGET_URL}}", &vars.target_url),
        ("{{VULNERABILITY}}", &vars.vulnerability),
        ("{{DETAILS}}", &vars.details),
        ("{{CATEGORY}}", &vars.category),
    ];
    let mut result = template.to_string();
    for (placeholder, value) in replacements {
        result = result.replace(placeholder, value);
    }
    result
}
