use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};
use tempo_config::LlmProviderConfig;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

/// One prior turn of the conversation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChatMessage {
	pub role: Role,
	pub content: String,
}

/// Sends `prompt` as the final user turn. `context`, when present, becomes the system message and
/// `history` is replayed between the two.
pub async fn complete(
	cfg: &LlmProviderConfig,
	prompt: &str,
	context: Option<&str>,
	history: &[ChatMessage],
) -> Result<String> {
	let client = crate::client(&cfg.provider_id, cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": build_messages(prompt, context, history),
	});

	if let (Some(max_tokens), Some(object)) = (cfg.max_tokens, body.as_object_mut()) {
		object.insert("max_tokens".to_string(), Value::from(max_tokens));
	}

	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let json = crate::post_json(&cfg.provider_id, &client, &url, headers, &body).await?;

	parse_completion_response(&json)
}

pub fn build_messages(prompt: &str, context: Option<&str>, history: &[ChatMessage]) -> Vec<Value> {
	let mut messages = Vec::with_capacity(history.len() + 2);

	if let Some(context) = context.map(str::trim).filter(|context| !context.is_empty()) {
		messages.push(serde_json::json!({ "role": "system", "content": context }));
	}

	for message in history {
		messages.push(serde_json::json!({ "role": message.role, "content": message.content }));
	}

	messages.push(serde_json::json!({ "role": "user", "content": prompt }));

	messages
}

fn parse_completion_response(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing choices[0].message.content.".to_string(),
		})?;
	let content = content.trim();

	if content.is_empty() {
		return Err(Error::InvalidResponse {
			message: "Completion response content is empty.".to_string(),
		});
	}

	Ok(content.to_string())
}
