//! Flashcard generation from notes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::json_parser::parse_card_drafts;
use crate::error::{NotesError, NotesResult};
use crate::traits::{GenerationOptions, Llm, ResponseFormat};
use crate::types::{CardDraft, Difficulty, Message};

const SYSTEM_PROMPT: &str = "You are a study assistant that writes flashcards. \
Reply with JSON only, no prose.";

/// A note the cards are generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNote {
    pub title: String,
    pub content: String,
}

impl SourceNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// What to ask the model for.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub notes: Vec<SourceNote>,
    pub count: usize,
    /// Difficulty to aim for. A mix is requested when absent.
    pub difficulty: Option<Difficulty>,
}

/// Turns notes into card drafts with a language model.
pub struct CardGenerator {
    llm: Arc<dyn Llm>,
}

impl CardGenerator {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Build the user prompt.
    pub fn build_prompt(request: &GenerationRequest) -> String {
        let notes_text = request
            .notes
            .iter()
            .map(|n| format!("{}: {}", n.title.trim(), n.content.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mix = match request.difficulty {
            Some(d) => format!("Every flashcard should be of {} difficulty.", d),
            None => "Include a mix of difficulty levels.".to_string(),
        };

        format!(
            r#"Create {count} educational flashcards from these notes.

Notes:
{notes_text}

Format each flashcard as JSON with this structure:
{{
  "question": "Clear, specific question",
  "answer": "Concise, accurate answer",
  "difficulty": "easy|medium|hard",
  "tags": ["tag1", "tag2"]
}}

Make questions that test understanding, not just memorization. {mix}
Return a JSON array of flashcard objects."#,
            count = request.count,
        )
    }

    /// Ask the model for cards and parse its answer.
    ///
    /// Returns at most `request.count` drafts.
    pub async fn generate(&self, request: &GenerationRequest) -> NotesResult<Vec<CardDraft>> {
        debug!(
            model = %self.llm.model_name(),
            notes = request.notes.len(),
            count = request.count,
            "Generating flashcards"
        );
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(Self::build_prompt(request)),
        ];
        let options = GenerationOptions {
            response_format: self
                .llm
                .supports_json_mode()
                .then_some(ResponseFormat::Json),
            ..Default::default()
        };

        let response = self.llm.generate(&messages, Some(options)).await?;
        let content = response.content_or_empty();
        if content.trim().is_empty() {
            return Err(NotesError::llm("Model returned no content"));
        }

        let mut drafts = parse_card_drafts(content)?;
        if drafts.is_empty() {
            warn!("Model response contained no usable flashcards");
        }
        if drafts.len() > request.count {
            debug!(returned = drafts.len(), "Truncating generated flashcards");
            drafts.truncate(request.count);
        }
        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LlmResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedLlm {
        reply: String,
        seen: Mutex<Vec<Message>>,
    }

    impl CannedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Llm for CannedLlm {
        async fn generate(
            &self,
            messages: &[Message],
            _options: Option<GenerationOptions>,
        ) -> NotesResult<LlmResponse> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(LlmResponse {
                content: Some(self.reply.clone()),
                usage: None,
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn request(count: usize) -> GenerationRequest {
        GenerationRequest {
            notes: vec![SourceNote::new("Rust", "Ownership moves values.")],
            count,
            difficulty: None,
        }
    }

    #[test]
    fn test_prompt_contains_notes_and_count() {
        let prompt = CardGenerator::build_prompt(&request(7));
        assert!(prompt.starts_with("Create 7 educational flashcards"));
        assert!(prompt.contains("Rust: Ownership moves values."));
        assert!(prompt.contains("mix of difficulty"));

        let mut hard = request(3);
        hard.difficulty = Some(Difficulty::Hard);
        assert!(CardGenerator::build_prompt(&hard).contains("of hard difficulty"));
    }

    #[tokio::test]
    async fn test_generate_truncates_to_count() {
        let llm = CannedLlm::new(
            r#"```json
[{"question": "Q1", "answer": "A1"}, {"question": "Q2", "answer": "A2"}, {"question": "Q3", "answer": "A3"}]
```"#,
        );
        let generator = CardGenerator::new(llm.clone());

        let drafts = generator.generate(&request(2)).await.unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].question, "Q2");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].content.contains("Ownership"));
    }

    #[tokio::test]
    async fn test_generate_rejects_prose() {
        let generator = CardGenerator::new(CannedLlm::new("Sorry, no."));
        assert!(matches!(
            generator.generate(&request(2)).await,
            Err(NotesError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_reply() {
        let generator = CardGenerator::new(CannedLlm::new(""));
        assert!(matches!(
            generator.generate(&request(2)).await,
            Err(NotesError::Llm { .. })
        ));
    }
}
