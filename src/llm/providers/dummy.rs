//! Dummy LLM provider — echoes input back prefixed with `[echo]`.
//! Used for testing the full retrieval-to-answer round-trip without a real
//! endpoint. The streamed form delivers the same reply in small increments.

use crate::llm::{CompletionStream, ProviderError};

const INCREMENT_CHARS: usize = 16;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        Ok(format!("[echo] {content}"))
    }

    pub async fn stream(&self, content: &str) -> Result<CompletionStream, ProviderError> {
        let reply = self.complete(content).await?;
        let increments = split_increments(&reply, INCREMENT_CHARS);
        let (tx, stream) = CompletionStream::channel(increments.len());
        for piece in increments {
            let _ = tx.try_send(Ok(piece));
        }
        Ok(stream)
    }
}

/// Split `text` into pieces of at most `n` characters, preserving every
/// character so the accumulated stream equals the original.
fn split_increments(text: &str, n: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if current.chars().count() == n {
            pieces.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
