use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// Value bound to a placeholder. Lists render one item per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptValue {
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for PromptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::List(items) => f.write_str(&items.join("\n")),
        }
    }
}

impl From<String> for PromptValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PromptValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for PromptValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptVariables(BTreeMap<String, PromptValue>);

impl PromptVariables {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PromptValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PromptValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PromptValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub template: String,
}

/// Ordered list of role-tagged message templates with `{name}` placeholders.
///
/// `{{` and `}}` produce literal braces. Templates are parsed when rendered,
/// so a malformed template surfaces as [`ChainError::InvalidTemplate`] then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    messages: Vec<PromptMessage>,
}

impl PromptTemplate {
    /// A single user message
    pub fn new(template: impl Into<String>) -> Self {
        Self::from_messages([(Role::User, template)])
    }

    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = (Role, S)>,
        S: Into<String>,
    {
        Self {
            messages: messages
                .into_iter()
                .map(|(role, template)| PromptMessage {
                    role,
                    template: template.into(),
                })
                .collect(),
        }
    }

    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// Distinct placeholder names in first-use order
    pub fn placeholders(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for message in &self.messages {
            for segment in parse(&message.template)? {
                if let Segment::Placeholder(name) = segment {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        Ok(names)
    }

    pub fn validate(&self) -> Result<()> {
        for message in &self.messages {
            parse(&message.template)?;
        }
        Ok(())
    }

    pub fn render(&self, vars: &PromptVariables) -> Result<ComposedPrompt> {
        let mut messages = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            let mut content = String::with_capacity(message.template.len());
            for segment in parse(&message.template)? {
                match segment {
                    Segment::Literal(text) => content.push_str(text),
                    Segment::Brace(ch) => content.push(ch),
                    Segment::Placeholder(name) => {
                        let value = vars
                            .get(name)
                            .ok_or_else(|| ChainError::MissingVariable(name.to_string()))?;
                        content.push_str(&value.to_string());
                    }
                }
            }
            messages.push(ComposedMessage {
                role: message.role,
                content,
            });
        }
        Ok(ComposedPrompt { messages })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMessage {
    pub role: Role,
    pub content: String,
}

/// A fully rendered prompt, ready for a text-generation model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedPrompt {
    pub messages: Vec<ComposedMessage>,
}

impl ComposedPrompt {
    /// A bare user prompt
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            messages: vec![ComposedMessage {
                role: Role::User,
                content: content.into(),
            }],
        }
    }

    /// Flatten for completion-style models: a lone user message is sent as is,
    /// anything else as `Role: content` blocks separated by a blank line.
    #[must_use]
    pub fn to_text(&self) -> String {
        if let [only] = self.messages.as_slice() {
            if only.role == Role::User {
                return only.content.clone();
            }
        }
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                push_literal(&mut segments, &template[literal_start..i]);
                segments.push(Segment::Brace(char::from(bytes[i])));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                push_literal(&mut segments, &template[literal_start..i]);
                let rest = &template[i + 1..];
                let close = rest.find('}').ok_or_else(|| {
                    ChainError::InvalidTemplate("unterminated '{...}' placeholder".into())
                })?;
                let raw = &rest[..close];
                if raw.contains('{') {
                    return Err(ChainError::InvalidTemplate(
                        "nested '{' inside placeholder".into(),
                    ));
                }
                let name = raw.trim();
                if name.is_empty() {
                    return Err(ChainError::InvalidTemplate("empty placeholder '{}'".into()));
                }
                segments.push(Segment::Placeholder(name));
                i += close + 2;
                literal_start = i;
            }
            b'}' => return Err(ChainError::InvalidTemplate("stray '}'".into())),
            _ => i += 1,
        }
    }
    push_literal(&mut segments, &template[literal_start..]);
    Ok(segments)
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_list_context_one_item_per_line() {
        let template = PromptTemplate::new("Answer based on: {context}");
        let vars = PromptVariables::new().with("context", vec!["a".to_string(), "b".to_string()]);
        let text = template.render(&vars).unwrap().to_text();
        assert_eq!(text, "Answer based on: a\nb");
        assert!(text.contains('a') && text.contains('b'));
    }

    #[test]
    fn missing_variable_is_named() {
        let template = PromptTemplate::new("Answer based on: {context}");
        let err = template.render(&PromptVariables::new()).unwrap_err();
        assert!(matches!(err, ChainError::MissingVariable(name) if name == "context"));
    }

    #[test]
    fn escaped_braces_are_literal() {
        let template = PromptTemplate::new("{{\"json\": {value}}}");
        let vars = PromptVariables::new().with("value", "1");
        assert_eq!(template.render(&vars).unwrap().to_text(), "{\"json\": 1}");
        assert_eq!(template.placeholders().unwrap(), vec!["value"]);
    }

    #[test]
    fn placeholder_names_are_trimmed_and_deduplicated() {
        let template = PromptTemplate::from_messages([
            (Role::System, "ctx: { context }"),
            (Role::User, "{input} / {context}"),
        ]);
        assert_eq!(template.placeholders().unwrap(), vec!["context", "input"]);
    }

    #[test]
    fn malformed_templates_are_rejected() {
        for bad in ["{unterminated", "{a{b}}", "stray } brace", "{}", "{  }"] {
            let err = PromptTemplate::new(bad).validate().unwrap_err();
            assert!(matches!(err, ChainError::InvalidTemplate(_)), "{bad}");
        }
    }

    #[test]
    fn multi_message_prompts_carry_role_labels() {
        let template = PromptTemplate::from_messages([
            (Role::System, "Be brief."),
            (Role::User, "{q}"),
        ]);
        let prompt = template
            .render(&PromptVariables::new().with("q", "Why?"))
            .unwrap();
        assert_eq!(prompt.to_text(), "System: Be brief.\n\nUser: Why?");
    }

    #[test]
    fn values_are_inserted_verbatim() {
        let template = PromptTemplate::new("{a}");
        let vars = PromptVariables::new().with("a", "{not a placeholder}");
        assert_eq!(
            template.render(&vars).unwrap().to_text(),
            "{not a placeholder}"
        );
    }

    #[test]
    fn non_ascii_literals_survive() {
        let template = PromptTemplate::new("café {x} 日本");
        let vars = PromptVariables::new().with("x", "🦀");
        assert_eq!(template.render(&vars).unwrap().to_text(), "café 🦀 日本");
    }

    #[test]
    fn variables_deserialize_from_json() {
        let vars: PromptVariables =
            serde_json::from_str(r#"{"text": "t", "context": ["a", "b"]}"#).unwrap();
        assert_eq!(vars.get("text"), Some(&PromptValue::Text("t".into())));
        assert_eq!(
            vars.get("context").map(ToString::to_string).as_deref(),
            Some("a\nb")
        );
    }
}
