//! Response composer — grounding prompt assembly and answer accumulation.
//!
//! Builds one instruction prompt embedding the retrieved snippets and the
//! question, submits it to the provider, and accumulates the reply's text
//! increments (streamed or batched) in arrival order into a single answer
//! ending with a Sources section. Writes no audit events — the retrieval
//! step has already logged by the time the composer runs.

use tracing::warn;

use crate::llm::LlmProvider;
use crate::store::RetrievalResult;

/// Fixed reply when retrieval produced nothing to ground an answer on.
pub const NO_INFORMATION: &str =
    "I searched the documents but found no relevant information.";

#[derive(Debug, Clone)]
pub struct Composer {
    provider: LlmProvider,
}

impl Composer {
    pub fn new(provider: LlmProvider) -> Self {
        Self { provider }
    }

    /// Produce the final user-facing answer for `question`.
    ///
    /// Empty retrieval → [`NO_INFORMATION`], no model call. A model failure
    /// degrades to an inline error message in place of an answer.
    pub async fn respond(&self, question: &str, result: &RetrievalResult) -> String {
        if result.is_empty() {
            return NO_INFORMATION.to_string();
        }

        let prompt = build_prompt(question, result);
        let stream = match self.provider.stream(&prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "model call failed");
                return format!("Error: {e}");
            }
        };

        let answer = match stream.collect_text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "model stream failed");
                return format!("Error: {e}");
            }
        };

        format!("{answer}{}", sources_section(result))
    }
}

/// One delimited context block per snippet, in retrieval order, followed by
/// the question.
pub fn build_prompt(question: &str, result: &RetrievalResult) -> String {
    let mut context = String::new();
    for (i, m) in result.matches.iter().enumerate() {
        context.push_str(&format!("--- Snippet {} ---\n{}\n\n", i + 1, m.text));
    }

    format!(
        "You are a secure audit assistant. Answer strictly based on the context.\n\n\
         Context:\n{context}\
         Question:\n{question}\n"
    )
}

fn sources_section(result: &RetrievalResult) -> String {
    let sources = result.sources();
    if sources.is_empty() {
        return String::new();
    }
    let mut section = String::from("\n\nSources:\n");
    for source in sources {
        section.push_str(&format!("- {source}\n"));
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::policy::Sensitivity;
    use crate::store::RetrievedChunk;

    fn chunk(id: &str, text: &str, source: &str) -> RetrievedChunk {
        RetrievedChunk {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            sensitivity: Sensitivity::Low,
            score: 1.0,
        }
    }

    fn composer() -> Composer {
        Composer::new(LlmProvider::Dummy(DummyProvider))
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits() {
        let answer = composer().respond("anything?", &RetrievalResult::default()).await;
        assert_eq!(answer, NO_INFORMATION);
    }

    #[tokio::test]
    async fn answer_embeds_context_and_lists_sources() {
        let result = RetrievalResult {
            matches: vec![
                chunk("1", "revenue grew twelve percent", "q3.pdf"),
                chunk("2", "costs were flat", "q3.pdf"),
                chunk("3", "headcount unchanged", "hr.txt"),
            ],
        };
        let answer = composer().respond("how did revenue do?", &result).await;

        // The dummy provider echoes the prompt, so the grounded context and
        // question must both appear in the accumulated answer.
        assert!(answer.contains("revenue grew twelve percent"));
        assert!(answer.contains("how did revenue do?"));

        let sources_at = answer.find("Sources:").expect("sources section present");
        let sources = &answer[sources_at..];
        assert!(sources.contains("- q3.pdf"));
        assert!(sources.contains("- hr.txt"));
        // Unique, first-seen order.
        assert_eq!(sources.matches("q3.pdf").count(), 1);
        assert!(sources.find("q3.pdf").unwrap() < sources.find("hr.txt").unwrap());
    }

    #[test]
    fn prompt_preserves_retrieval_order() {
        let result = RetrievalResult {
            matches: vec![chunk("1", "first snippet", "a"), chunk("2", "second snippet", "b")],
        };
        let prompt = build_prompt("q", &result);
        assert!(prompt.find("first snippet").unwrap() < prompt.find("second snippet").unwrap());
        assert!(prompt.contains("--- Snippet 1 ---"));
        assert!(prompt.contains("--- Snippet 2 ---"));
        assert!(prompt.ends_with("Question:\nq\n"));
    }
}
