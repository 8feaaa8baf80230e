//! Prompt templates for the FURIA assistant
//!
//! Replies are narrated in Brazilian Portuguese, so the templates are written
//! in Portuguese as well.

use serde::{Deserialize, Serialize};

/// Subject every answer is restricted to
pub const DEFAULT_SUBJECT: &str = "TIME DE COUNTER STRIKE DA ORG FURIA";

/// Prompt sent once when a conversation opens
pub const INTRO_PROMPT: &str = "Olá! Apresente-se brevemente como uma IA Chat Bot da Furia.";

/// Wrap a user question in the topical constraint template.
///
/// The constraint lives only in the prompt text; nothing checks that the
/// model actually complied.
pub fn build_topic_prompt(subject: &str, question: &str) -> String {
    format!(
        "Responda APENAS sobre {subject}. Se a pergunta não for sobre {subject}, \
         diga que não foi programada para responder assuntos desse tipo. \
         Pergunta: {question}"
    )
}

/// Prompt settings for a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Subject the assistant is allowed to talk about
    pub subject: String,

    /// Introductory prompt sent by `initialize`
    pub intro_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            intro_prompt: INTRO_PROMPT.to_string(),
        }
    }
}

impl PromptConfig {
    /// Set the restricted subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the introductory prompt
    pub fn with_intro_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.intro_prompt = prompt.into();
        self
    }

    /// Wrap a question with this config's subject
    pub fn wrap_question(&self, question: &str) -> String {
        build_topic_prompt(&self.subject, question)
    }
}
