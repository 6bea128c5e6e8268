pub mod completion;
pub mod embedding;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

fn client(provider_id: &str, timeout_ms: u64) -> Result<Client> {
	Client::builder()
		.timeout(Duration::from_millis(timeout_ms))
		.build()
		.map_err(|err| Error::from_reqwest(provider_id, err))
}

async fn post_json(
	provider_id: &str,
	client: &Client,
	url: &str,
	headers: HeaderMap,
	body: &Value,
) -> Result<Value> {
	let res = client
		.post(url)
		.headers(headers)
		.json(body)
		.send()
		.await
		.map_err(|err| Error::from_reqwest(provider_id, err))?;
	let status = res.status();

	if !status.is_success() {
		let text = res.text().await.unwrap_or_default();

		tracing::debug!(provider_id, %status, "Provider returned an error status.");

		return Err(Error::from_status(provider_id, status, &text));
	}

	res.json().await.map_err(|err| Error::from_reqwest(provider_id, err))
}
