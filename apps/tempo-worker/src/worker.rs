//! Background embedding of chunks written by rebuilds.

use std::time::Duration;

use time::OffsetDateTime;

use crate::{Error, Result};
use tempo_config::{EmbeddingProviderConfig, Worker};
use tempo_providers::embedding;
use tempo_storage::{chunks, db::Db};

const MAX_BACKOFF_EXPONENT: u32 = 6;

pub struct WorkerState {
	pub db: Db,
	pub embedding: EmbeddingProviderConfig,
	pub settings: Worker,
}

pub async fn run_worker(state: WorkerState) {
	let poll = Duration::from_millis(state.settings.poll_interval_ms);
	let mut failures = 0_u32;

	tracing::info!(batch_size = state.settings.batch_size, "Embedding worker started.");

	loop {
		let pause = match embed_pending_once(&state).await {
			Ok(stored) => {
				failures = 0;

				// A full batch usually means more rows are waiting.
				if stored > 0 && stored as u32 >= state.settings.batch_size {
					continue;
				}

				poll
			},
			Err(err) if err.is_retryable() => {
				failures = failures.saturating_add(1);

				let delay = backoff_for_attempt(
					failures,
					state.settings.poll_interval_ms,
					state.settings.max_backoff_ms,
				);

				tracing::warn!(
					error = %err,
					attempt = failures,
					delay_ms = delay.as_millis() as u64,
					"Embedding batch failed. Backing off."
				);

				delay
			},
			Err(err) => {
				failures = 0;

				tracing::error!(error = %err, "Embedding batch failed.");

				poll
			},
		};

		tokio::time::sleep(pause).await;
	}
}

/// Embeds one batch of chunks that have no vector yet. Returns how many vectors were stored.
pub async fn embed_pending_once(state: &WorkerState) -> Result<usize> {
	let pending = chunks::list_pending_embeddings(&state.db.pool, state.settings.batch_size).await?;

	if pending.is_empty() {
		return Ok(0);
	}

	let texts: Vec<String> = pending.iter().map(|chunk| chunk.content.clone()).collect();
	let vectors = embedding::embed(&state.embedding, &texts).await?;

	check_vectors(&vectors, pending.len(), state.embedding.dimensions)?;

	let now = OffsetDateTime::now_utc();
	let mut stored = 0;

	for (chunk, vector) in pending.iter().zip(&vectors) {
		if chunks::set_embedding(&state.db.pool, chunk.chunk_id, &chunk.content_hash, vector, now)
			.await?
		{
			stored += 1;
		} else {
			tracing::debug!(chunk_id = %chunk.chunk_id, "Chunk changed before its embedding landed.");
		}
	}

	tracing::info!(pending = pending.len(), stored, "Embedded chunk batch.");

	Ok(stored)
}

pub fn check_vectors(vectors: &[Vec<f32>], expected: usize, dimensions: u32) -> Result<()> {
	if vectors.len() != expected {
		return Err(Error::Validation(format!(
			"Embedding provider returned {} vectors for {expected} chunks.",
			vectors.len()
		)));
	}
	if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimensions as usize) {
		return Err(Error::Validation(format!(
			"Embedding has {} dimensions; the schema expects {dimensions}.",
			vector.len()
		)));
	}

	Ok(())
}

/// Doubles from `base_ms` per consecutive failure, capped at `max_ms`.
pub fn backoff_for_attempt(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
	let delay = base_ms.saturating_mul(1 << exp);

	Duration::from_millis(delay.min(max_ms))
}
