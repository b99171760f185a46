//! Ready-made prompts for the bundled workflows.

use crate::prompt::{PromptTemplate, Role};

/// Grounded question answering. Variables: `context`, `input`.
#[must_use]
pub fn rag_answer() -> PromptTemplate {
    PromptTemplate::from_messages([
        (
            Role::System,
            "Answer the users question based on the following context: {context}",
        ),
        (Role::User, "{input}"),
    ])
}

/// Variables: `product_name`.
#[must_use]
pub fn product_description() -> PromptTemplate {
    PromptTemplate::from_messages([
        (
            Role::System,
            "Write a short description for the product provided by the user",
        ),
        (Role::User, "{product_name}"),
    ])
}

/// Variables: `text`, `points`.
#[must_use]
pub fn summarize_points() -> PromptTemplate {
    PromptTemplate::new("Text: {text}\n From the text above, summarize the story in {points} points.")
}

/// Variables: `observation`.
#[must_use]
pub fn qa_report() -> PromptTemplate {
    PromptTemplate::new(
        "Generate a quality assurance report based on the following observation: {observation}",
    )
}

/// Look a bundled template up by name
#[must_use]
pub fn by_name(name: &str) -> Option<PromptTemplate> {
    match name {
        "rag_answer" | "rag-answer" => Some(rag_answer()),
        "product_description" | "product-description" => Some(product_description()),
        "summarize_points" | "summarize-points" => Some(summarize_points()),
        "qa_report" | "qa-report" => Some(qa_report()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptVariables;
    use pretty_assertions::assert_eq;

    #[test]
    fn bundled_templates_are_well_formed() {
        for name in ["rag_answer", "product_description", "summarize_points", "qa_report"] {
            let template = by_name(name).unwrap();
            assert!(template.validate().is_ok(), "{name}");
        }
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn summary_prompt_matches_handler_contract() {
        let vars = PromptVariables::new()
            .with("text", "Once upon a time.")
            .with("points", "3");
        assert_eq!(
            summarize_points().render(&vars).unwrap().to_text(),
            "Text: Once upon a time.\n From the text above, summarize the story in 3 points."
        );
    }

    #[test]
    fn rag_prompt_lists_context_under_system_message() {
        let vars = PromptVariables::new()
            .with("context", vec!["Don likes pizza.".to_string(), "Don likes pasta.".to_string()])
            .with("input", "What does Don like?");
        let text = rag_answer().render(&vars).unwrap().to_text();
        assert_eq!(
            text,
            "System: Answer the users question based on the following context: \
             Don likes pizza.\nDon likes pasta.\n\nUser: What does Don like?"
        );
    }
}
