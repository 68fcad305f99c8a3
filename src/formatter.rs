use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StageError;
use crate::llm::{ChatMessage, ChatModel};
use crate::retry::RetryPolicy;

/// Fixed instruction handed to the text-generation service
const SYSTEM_PROMPT: &str = "You are a professional technical writer and expert in Python. \
Convert the following lecture transcript into well-structured notes in Markdown. \
Use headings (##), sections, mermaid diagrams or HTML snippets where helpful. \
End with a 'Tips and Tricks' section. Use type hints in Python code examples.";

/// Turns a merged transcript into polished notes via a chat model.
///
/// Formatting failures do not require re-transcription: the merged
/// transcript stays on the record for a later retry at the caller's
/// discretion.
pub struct Formatter {
    chat: Arc<dyn ChatModel>,
    retry: RetryPolicy,
}

impl Formatter {
    pub fn new(chat: Arc<dyn ChatModel>, retry: RetryPolicy) -> Self {
        Self { chat, retry }
    }

    pub async fn format(&self, base_name: &str, transcript: &str) -> Result<String, StageError> {
        debug!("Formatting transcript for {} ({} chars)", base_name, transcript.len());

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(transcript),
        ];

        let response = self
            .retry
            .run("chat completion", || {
                let chat = Arc::clone(&self.chat);
                let messages = messages.clone();
                async move { chat.chat(messages).await }
            })
            .await?;

        let body = strip_reasoning_markers(&response.content);
        let document = format!("## Notes for {}\n\n{}\n", base_name, body.trim());

        info!(
            "📝 Notes ready for {} ({} chars, tokens: {:?})",
            base_name,
            document.len(),
            response.tokens_used
        );

        Ok(document)
    }
}

/// Drop `<think>…</think>` side-channel blocks some models emit before
/// their answer
pub fn strip_reasoning_markers(text: &str) -> String {
    if let Ok(re) = Regex::new(r"(?is)<think>.*?</think>") {
        re.replace_all(text, "").into_owned()
    } else {
        text.to_string()
    }
}
