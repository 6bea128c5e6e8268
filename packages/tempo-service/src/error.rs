pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String, retryable: bool },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Timed out: {message}")]
	Timeout { message: String },
}
impl From<tempo_storage::Error> for Error {
	fn from(err: tempo_storage::Error) -> Self {
		match err {
			tempo_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
impl From<tempo_providers::Error> for Error {
	fn from(err: tempo_providers::Error) -> Self {
		Self::Provider { retryable: err.is_retryable(), message: err.to_string() }
	}
}
