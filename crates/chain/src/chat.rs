use crate::error::{ChainError, Result};
use crate::generation::GenerationChain;
use crate::prompt::{PromptTemplate, PromptVariables, Role};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Bounds on retained history; the oldest turns are evicted first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPolicy {
    pub max_turns: Option<usize>,
    pub max_chars: Option<usize>,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            max_turns: Some(20),
            max_chars: Some(12_000),
        }
    }
}

impl HistoryPolicy {
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_turns: None,
            max_chars: None,
        }
    }

    /// Keep nothing between calls
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_turns: Some(0),
            max_chars: Some(0),
        }
    }
}

/// Multi-turn conversation over a generation chain.
///
/// Each prompt is the retained history joined by single spaces, followed by
/// the (optionally framed) new input.
#[derive(Debug, Clone)]
pub struct ChatSession {
    chain: GenerationChain,
    policy: HistoryPolicy,
    frame: Option<(PromptTemplate, String)>,
    history: VecDeque<ChatTurn>,
}

impl ChatSession {
    pub fn new(chain: GenerationChain, policy: HistoryPolicy) -> Self {
        Self {
            chain,
            policy,
            frame: None,
            history: VecDeque::new(),
        }
    }

    /// A session that forgets every exchange
    pub fn stateless(chain: GenerationChain) -> Self {
        Self::new(chain, HistoryPolicy::none())
    }

    /// Wrap every input in `template`, bound to `variable`
    pub fn with_frame(mut self, template: PromptTemplate, variable: impl Into<String>) -> Result<Self> {
        let variable = variable.into();
        if !template.placeholders()?.contains(&variable) {
            return Err(ChainError::InvalidTemplate(format!(
                "frame template has no '{{{variable}}}' placeholder"
            )));
        }
        self.frame = Some((template, variable));
        Ok(self)
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &ChatTurn> {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// The prompt `send(input)` would generate from
    pub fn prompt_for(&self, input: &str) -> Result<String> {
        let framed = match &self.frame {
            Some((template, variable)) => template
                .render(&PromptVariables::new().with(variable.as_str(), input))?
                .to_text(),
            None => input.to_string(),
        };
        if self.history.is_empty() {
            return Ok(framed);
        }
        let context = self
            .history
            .iter()
            .map(|turn| turn.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(format!("{context} {framed}"))
    }

    /// Generate a reply. History only changes when generation succeeds.
    pub async fn send(&mut self, input: &str) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ChainError::InvalidInput("chat input is empty".to_string()));
        }
        let prompt = self.prompt_for(input)?;
        let reply = self.chain.generate_text(&prompt).await?;

        self.history.push_back(ChatTurn {
            role: Role::User,
            text: input.to_string(),
        });
        self.history.push_back(ChatTurn {
            role: Role::Assistant,
            text: reply.clone(),
        });
        self.evict();
        Ok(reply)
    }

    fn evict(&mut self) {
        let before = self.history.len();
        if let Some(max_turns) = self.policy.max_turns {
            while self.history.len() > max_turns {
                self.history.pop_front();
            }
        }
        if let Some(max_chars) = self.policy.max_chars {
            let mut total: usize = self.history.iter().map(|t| t.text.len()).sum();
            while total > max_chars {
                match self.history.pop_front() {
                    Some(turn) => total -= turn.text.len(),
                    None => break,
                }
            }
        }
        let evicted = before - self.history.len();
        if evicted > 0 {
            log::debug!("Evicted {evicted} chat turns; {} retained", self.history.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use ragline_protocol::{
        InvokeError, ModelInvoker, ModelRequest, SamplingParams, StubInvoker,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TITAN: &str = "amazon.titan-text-express-v1";

    fn echo_chain() -> (Arc<StubInvoker>, GenerationChain) {
        let stub = Arc::new(StubInvoker::default().with_completion("ok"));
        let chain = GenerationChain::new(stub.clone(), TITAN, SamplingParams::default());
        (stub, chain)
    }

    fn sent_prompts(stub: &StubInvoker) -> Vec<String> {
        stub.requests()
            .iter()
            .map(|r| r.body["inputText"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn history_prefixes_later_prompts() {
        let (stub, chain) = echo_chain();
        let mut session = ChatSession::new(chain, HistoryPolicy::unbounded());

        session.send("first").await.unwrap();
        session.send("second").await.unwrap();

        assert_eq!(sent_prompts(&stub), vec!["first", "first ok second"]);
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn frame_wraps_each_input() {
        let (stub, chain) = echo_chain();
        let mut session = ChatSession::new(chain, HistoryPolicy::unbounded())
            .with_frame(templates::qa_report(), "observation")
            .unwrap();

        session.send("cracks near the inlet").await.unwrap();
        session.send("discoloration").await.unwrap();

        let prompts = sent_prompts(&stub);
        assert_eq!(
            prompts[0],
            "Generate a quality assurance report based on the following observation: cracks near the inlet"
        );
        assert_eq!(
            prompts[1],
            "cracks near the inlet ok Generate a quality assurance report based on the following observation: discoloration"
        );
    }

    #[test]
    fn frame_must_use_the_variable() {
        let (_, chain) = echo_chain();
        let err = ChatSession::new(chain, HistoryPolicy::default())
            .with_frame(templates::qa_report(), "input")
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidTemplate(_)));
    }

    #[tokio::test]
    async fn stateless_session_never_accumulates() {
        let (stub, chain) = echo_chain();
        let mut session = ChatSession::stateless(chain);
        session.send("one").await.unwrap();
        session.send("two").await.unwrap();
        assert_eq!(sent_prompts(&stub), vec!["one", "two"]);
        assert_eq!(session.history().len(), 0);
    }

    #[tokio::test]
    async fn oldest_turns_are_evicted_by_count_and_size() {
        let (_, chain) = echo_chain();
        let mut session = ChatSession::new(
            chain.clone(),
            HistoryPolicy {
                max_turns: Some(3),
                max_chars: None,
            },
        );
        for input in ["a", "b", "c"] {
            session.send(input).await.unwrap();
        }
        let texts: Vec<&str> = session.history().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["ok", "c", "ok"]);

        let mut session = ChatSession::new(
            chain,
            HistoryPolicy {
                max_turns: None,
                max_chars: Some(10),
            },
        );
        session.send("0123456789").await.unwrap();
        let texts: Vec<&str> = session.history().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["ok"]);
    }

    /// Answers the first `ok_calls` requests, then refuses the connection
    struct FailsAfter {
        ok_calls: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelInvoker for FailsAfter {
        async fn invoke(&self, _request: ModelRequest) -> ragline_protocol::Result<Value> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok_calls {
                Ok(json!({ "results": [{ "outputText": "ok" }] }))
            } else {
                Err(InvokeError::Transport("connection refused".into()))
            }
        }
    }

    #[tokio::test]
    async fn failed_generation_leaves_history_untouched() {
        let invoker = Arc::new(FailsAfter {
            ok_calls: 1,
            calls: AtomicUsize::new(0),
        });
        let chain = GenerationChain::new(invoker, TITAN, SamplingParams::default());
        let mut session = ChatSession::new(chain, HistoryPolicy::unbounded());

        session.send("kept").await.unwrap();
        let before: Vec<ChatTurn> = session.history().cloned().collect();
        assert_eq!(before.len(), 2);

        let err = session.send("lost").await.unwrap_err();
        assert!(err.is_transport());
        let after: Vec<ChatTurn> = session.history().cloned().collect();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (stub, chain) = echo_chain();
        let mut session = ChatSession::new(chain, HistoryPolicy::default());
        assert!(matches!(
            session.send("  \n").await,
            Err(ChainError::InvalidInput(_))
        ));
        assert!(stub.requests().is_empty());
    }
}
