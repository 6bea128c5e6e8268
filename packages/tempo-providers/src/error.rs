use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider {provider} rejected the credentials with status {status}.")]
	Auth { provider: String, status: u16 },
	#[error("Provider {provider} is rate limiting requests.")]
	RateLimited { provider: String },
	#[error("Provider {provider} did not respond in time.")]
	Timeout { provider: String },
	#[error("Provider {provider} is temporarily unavailable: {message}")]
	Transient { provider: String, message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
}
impl Error {
	/// Whether retrying the same request later can succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::RateLimited { .. } | Self::Timeout { .. } | Self::Transient { .. })
	}

	pub fn from_status(provider: &str, status: StatusCode, body: &str) -> Self {
		let provider = provider.to_string();

		match status {
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
				Self::Auth { provider, status: status.as_u16() },
			StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { provider },
			StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Self::Timeout { provider },
			status if status.is_server_error() =>
				Self::Transient { provider, message: format!("status {status}: {}", snippet(body)) },
			StatusCode::NOT_FOUND => Self::InvalidConfig {
				message: format!("Provider {provider} endpoint was not found. Check api_base and path."),
			},
			status => Self::InvalidResponse {
				message: format!("Provider {provider} returned status {status}: {}", snippet(body)),
			},
		}
	}

	pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
		let provider = provider.to_string();

		if err.is_timeout() {
			return Self::Timeout { provider };
		}
		if err.is_connect() || err.is_request() {
			return Self::Transient { provider, message: err.to_string() };
		}
		if err.is_builder() {
			return Self::InvalidConfig { message: format!("Provider {provider}: {err}") };
		}
		if err.is_decode() || err.is_body() {
			return Self::InvalidResponse {
				message: format!("Provider {provider} sent an unreadable body: {err}"),
			};
		}

		Self::Transient { provider, message: err.to_string() }
	}
}
impl From<reqwest::header::InvalidHeaderName> for Error {
	fn from(err: reqwest::header::InvalidHeaderName) -> Self {
		Self::InvalidConfig { message: format!("Invalid default header name: {err}.") }
	}
}
impl From<reqwest::header::InvalidHeaderValue> for Error {
	fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
		Self::InvalidConfig { message: format!("Invalid header value: {err}.") }
	}
}

fn snippet(body: &str) -> String {
	body.chars().take(200).collect()
}
