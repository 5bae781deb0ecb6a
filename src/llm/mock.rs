//! Scripted completion backend for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{Completion, CompletionBackend, LlmError};
use super::prompts::PromptTemplate;

/// One scripted reply for a [`MockBackend`].
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// A successful completion.
    Content {
        content: String,
        tokens_used: u64,
        model: String,
    },
    /// A transport-level failure.
    TransportError(String),
}

impl ScriptedResponse {
    /// A successful completion with default usage accounting.
    pub fn ok(content: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
            tokens_used: 10,
            model: "mock-model".to_string(),
        }
    }

    /// A successful completion with explicit usage and model id.
    pub fn ok_with(content: impl Into<String>, tokens_used: u64, model: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
            tokens_used,
            model: model.into(),
        }
    }

    /// A transport failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }
}

/// Completion backend that replays scripted responses.
///
/// Responses are queued per template; each call pops the next one. When
/// a template's queue is empty the per-template default (or the global
/// default) is replayed. Calls are recorded so tests can assert which
/// templates were (or were not) invoked.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<HashMap<&'static str, VecDeque<ScriptedResponse>>>,
    defaults: Mutex<HashMap<&'static str, ScriptedResponse>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for a template.
    pub fn script(&self, template: PromptTemplate, response: ScriptedResponse) {
        self.scripts
            .lock()
            .expect("mock scripts lock")
            .entry(template.key())
            .or_default()
            .push_back(response);
    }

    /// Builder-style [`Self::script`].
    pub fn with_script(self, template: PromptTemplate, response: ScriptedResponse) -> Self {
        self.script(template, response);
        self
    }

    /// Set the response replayed when a template's queue is empty.
    pub fn set_default(&self, template: PromptTemplate, response: ScriptedResponse) {
        self.defaults
            .lock()
            .expect("mock defaults lock")
            .insert(template.key(), response);
    }

    /// Builder-style [`Self::set_default`].
    pub fn with_default(self, template: PromptTemplate, response: ScriptedResponse) -> Self {
        self.set_default(template, response);
        self
    }

    /// Template keys of every call made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    /// Number of calls made for one template.
    pub fn call_count(&self, template: PromptTemplate) -> usize {
        self.calls
            .lock()
            .expect("mock calls lock")
            .iter()
            .filter(|key| **key == template.key())
            .count()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, template: PromptTemplate, _input: &str) -> Result<Completion, LlmError> {
        self.calls.lock().expect("mock calls lock").push(template.key());

        let scripted = self
            .scripts
            .lock()
            .expect("mock scripts lock")
            .get_mut(template.key())
            .and_then(VecDeque::pop_front);

        let response = match scripted {
            Some(response) => response,
            None => self
                .defaults
                .lock()
                .expect("mock defaults lock")
                .get(template.key())
                .cloned()
                .ok_or_else(|| {
                    LlmError::Connection(format!("no scripted response for {}", template))
                })?,
        };

        match response {
            ScriptedResponse::Content {
                content,
                tokens_used,
                model,
            } => Ok(Completion {
                content,
                tokens_used,
                model,
            }),
            ScriptedResponse::TransportError(message) => Err(LlmError::Connection(message)),
        }
    }
}
