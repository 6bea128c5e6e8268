pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(String),
	#[error(transparent)]
	Storage(#[from] tempo_storage::Error),
	#[error(transparent)]
	Provider(#[from] tempo_providers::Error),
}
impl Error {
	/// Provider hiccups are retried with backoff. Everything else waits for the next poll.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Provider(err) => err.is_retryable(),
			_ => false,
		}
	}
}
