//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities — clone them freely.
//! Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
//!
//! Streamed and batched completions are unified behind [`CompletionStream`]:
//! a sequence of text increments terminated by completion, where a batched
//! response is simply a single-increment sequence.

pub mod providers;

use thiserror::Error;
use tokio::sync::mpsc;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Completion stream ─────────────────────────────────────────────────────────

/// Ordered sequence of completion text increments.
///
/// Consumers accumulate increments in arrival order into one final answer.
/// Dropping the stream abandons the underlying request; increments already
/// received are not retracted.
pub struct CompletionStream {
    rx: mpsc::Receiver<Result<String, ProviderError>>,
}

impl CompletionStream {
    pub(crate) fn channel(capacity: usize) -> (mpsc::Sender<Result<String, ProviderError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }

    /// A completed single-increment sequence — the batched (non-streaming) case.
    pub fn once(text: impl Into<String>) -> Self {
        let (tx, stream) = Self::channel(1);
        let _ = tx.try_send(Ok(text.into()));
        stream
    }

    /// Next text increment, or `None` once the sequence is complete.
    pub async fn next_increment(&mut self) -> Option<Result<String, ProviderError>> {
        self.rx.recv().await
    }

    /// Accumulate all increments into one string, stopping at the first error.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut text = String::new();
        while let Some(increment) = self.next_increment().await {
            text.push_str(&increment?);
        }
        Ok(text)
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Adding a backend = new module + new variant + new match arms.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send `content` to the provider and return its complete text reply.
    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(content).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(content).await,
        }
    }

    /// Send `content` and return the reply as a [`CompletionStream`].
    ///
    /// Backends that do not stream return a single-increment sequence.
    pub async fn stream(&self, content: &str) -> Result<CompletionStream, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.stream(content).await,
            LlmProvider::OpenAiCompatible(p) => p.stream(content).await,
        }
    }
}
