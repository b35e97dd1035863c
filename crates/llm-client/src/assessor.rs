use async_trait::async_trait;
use valuation_core::{AssessmentProvider, DisplayMap, ValuationError};

use crate::chat::ChatClient;
use crate::prompt::{assessment_prompt, screening_prompt};

/// [`AssessmentProvider`] backed by a chat completions endpoint.
#[derive(Clone)]
pub struct LlmAssessor {
    chat: ChatClient,
}

impl LlmAssessor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

impl From<ChatClient> for LlmAssessor {
    fn from(chat: ChatClient) -> Self {
        Self::new(chat)
    }
}

#[async_trait]
impl AssessmentProvider for LlmAssessor {
    async fn assess(&self, ticker: &str, data: &DisplayMap) -> Result<String, ValuationError> {
        tracing::info!(%ticker, model = %self.chat.model(), "requesting assessment");
        let messages = assessment_prompt(ticker, data);
        Ok(self.chat.complete(&messages).await?)
    }

    async fn screen(&self, rows: &[DisplayMap]) -> Result<String, ValuationError> {
        if rows.is_empty() {
            return Err(ValuationError::InvalidInput("nothing to screen".to_string()));
        }
        tracing::info!(count = rows.len(), model = %self.chat.model(), "requesting screening");
        let messages = screening_prompt(rows);
        Ok(self.chat.complete(&messages).await?)
    }
}
