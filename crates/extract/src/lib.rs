pub mod schema;
pub mod parser;
pub mod llm;
pub mod prompt;

pub use schema::{AiResponseData, AnalysisTask, Fact, FactValue, GroundingChunk, ThemeRelationship};
pub use parser::{ParsedReply, interpret_reply, parse_json_response, strip_code_fence};
pub use llm::{GeminiClient, GenerateRequest, GenerationConfig, ModelClient, ModelError, ModelReply};
pub use prompt::build_prompt;

/// Prompt -> model -> parsed response, one attempt per submission.
pub struct Analyzer<C> {
    client: C,
}

impl<C: ModelClient> Analyzer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Analyze a document for a task, returning typed data or a rewritten error
    pub async fn analyze_text(
        &self,
        document_text: &str,
        query: &str,
        task: AnalysisTask,
        model_name: &str,
    ) -> Result<AiResponseData, ModelError> {
        let prompt = prompt::build_prompt(document_text, query, task);
        let request = GenerateRequest::for_task(model_name, prompt, task);

        let reply = self.client.generate(&request).await.map_err(|e| {
            let e = e.classify(task, model_name);
            tracing::error!(task = %task, model = model_name, error = %e, "Model request failed");
            e
        })?;

        let data = parser::interpret_reply(task, &reply.text, reply.grounding);
        tracing::info!(
            task = %task,
            facts = data.facts().len(),
            relationships = data.relationships().len(),
            citations = data.citations().len(),
            "Analysis complete"
        );
        Ok(data)
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests::{mock_gemini, text_reply};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    fn analyzer(base_url: String) -> Analyzer<GeminiClient> {
        Analyzer::new(GeminiClient::new(base_url, Duration::from_secs(5)).with_api_key("k"))
    }

    #[tokio::test]
    async fn test_fact_extraction_end_to_end() {
        let (base_url, recorded) = mock_gemini(
            StatusCode::OK,
            text_reply(r#"{"Revenue":"5000000","CEO":"Jane Doe"}"#),
        )
        .await;

        let data = analyzer(base_url)
            .analyze_text(
                "Revenue was $5,000,000. CEO: Jane Doe.",
                "Revenue, CEO",
                AnalysisTask::FactExtraction,
                "gemini-test",
            )
            .await
            .unwrap();

        assert_eq!(data.facts().len(), 2);
        assert_eq!(data.fact("CEO"), Some(&FactValue::Text("Jane Doe".into())));

        let prompt = recorded.bodies.lock().unwrap()[0]["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(prompt.contains("Revenue, CEO"));
        assert!(prompt.contains("Revenue was $5,000,000."));
    }

    #[tokio::test]
    async fn test_fenced_thematic_reply() {
        let reply = "```json\n{\"themes\":{\"A\":5,\"B\":3},\"relationships\":[{\"source\":\"A\",\"target\":\"B\",\"strength\":0.7}]}\n```";
        let (base_url, _) = mock_gemini(StatusCode::OK, text_reply(reply)).await;

        let data = analyzer(base_url)
            .analyze_text("doc", "", AnalysisTask::ThematicAnalysis, "gemini-test")
            .await
            .unwrap();

        assert_eq!(data.facts().len(), 2);
        assert_eq!(data.relationships().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_model_is_rewritten() {
        let error = json!({"error": {"code": 404, "message": "models/old is not found for API version v1beta, or is not supported for generateContent."}});
        let (base_url, _) = mock_gemini(StatusCode::NOT_FOUND, error).await;

        let err = analyzer(base_url)
            .analyze_text("doc", "q", AnalysisTask::QueryDocument, "old")
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::UnsupportedModel { ref model, .. } if model == "old"));
    }
}
