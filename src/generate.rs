//! Generative-answer provider.
//!
//! Synthesizes a natural-language answer from a question and the retrieved
//! text units via the OpenAI chat completions API. Errors are out-of-band:
//! an empty or missing completion is a [`CoreError::GenerationFailure`],
//! never returned as a valid answer.
//!
//! Retry discipline matches the embedding client: 429/5xx/network errors
//! retry with exponential backoff, other 4xx fail immediately.

use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{CoreError, CoreResult};

/// Synthesize an answer to `question` grounded in the retrieved `context`
/// text units.
pub async fn generate_answer(
    config: &GenerationConfig,
    question: &str,
    context: &[&str],
) -> CoreResult<String> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| CoreError::GenerationFailure("OPENAI_API_KEY not set".to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CoreError::GenerationFailure(e.to_string()))?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": system_prompt(context) },
            { "role": "user", "content": question },
        ],
    });
    let url = format!(
        "{}/v1/chat/completions",
        config.base_url.trim_end_matches('/')
    );

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| CoreError::GenerationFailure(e.to_string()))?;
                    return parse_completion(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(format!("OpenAI API error {}: {}", status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                return Err(CoreError::GenerationFailure(format!(
                    "OpenAI API error {}: {}",
                    status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(e.to_string());
                continue;
            }
        }
    }

    Err(CoreError::GenerationFailure(
        last_err.unwrap_or_else(|| "generation failed after retries".to_string()),
    ))
}

/// Frame the retrieved text units into the system prompt.
fn system_prompt(context: &[&str]) -> String {
    let mut prompt = String::from(
        "You answer questions about a single organization using only the \
         provided context. If the context does not contain the answer, say \
         so plainly.\n\nContext:\n",
    );
    for unit in context {
        prompt.push_str("---\n");
        prompt.push_str(unit);
        prompt.push('\n');
    }
    prompt.push_str("---");
    prompt
}

/// Extract the completion text; an absent or blank completion is a failure.
fn parse_completion(json: &serde_json::Value) -> CoreResult<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            CoreError::GenerationFailure("invalid completion response: missing content".to_string())
        })?;

    let answer = content.trim();
    if answer.is_empty() {
        return Err(CoreError::GenerationFailure(
            "completion response was empty".to_string(),
        ));
    }
    Ok(answer.to_string())
}
