pub mod answer;
pub mod cascade;
pub mod chunks;
pub mod enhance;
pub mod ranking;
pub mod search;
pub mod validate;

mod error;

pub use answer::{AnswerMetadata, AnswerRequest, AnswerResponse, NO_EVIDENCE_ANSWER, SourceItem};
pub use cascade::CascadeResult;
pub use chunks::{CleanupLevelRequest, CleanupLevelResponse, RebuildChunksRequest};
pub use enhance::{EnhancedSearch, Technique};
pub use error::{Error, Result};
pub use ranking::RankedDocument;
pub use search::{SearchRequest, SearchResponse};
pub use validate::Correction;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tempo_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use tempo_domain::{
	chunk::Chunk,
	level::ChunkLevel,
	records::{Project, Task, WorkSession},
};
use tempo_providers::{
	completion::{self, ChatMessage},
	embedding,
};
use tempo_storage::{chunks as chunk_store, db::Db, records};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, tempo_providers::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		context: Option<&'a str>,
		history: &'a [ChatMessage],
	) -> BoxFuture<'a, tempo_providers::Result<String>>;
}

/// Read access to the raw activity records of one owner.
pub trait RecordSource
where
	Self: Send + Sync,
{
	fn list_projects<'a>(&'a self, owner_id: &'a str)
	-> BoxFuture<'a, tempo_storage::Result<Vec<Project>>>;

	fn list_tasks<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, tempo_storage::Result<Vec<Task>>>;

	fn list_sessions<'a>(
		&'a self,
		owner_id: &'a str,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<WorkSession>>>;
}

/// Chunk persistence plus the two retrieval primitives the ranker combines.
pub trait ChunkIndex
where
	Self: Send + Sync,
{
	fn replace_chunks<'a>(
		&'a self,
		owner_id: &'a str,
		levels: &'a [ChunkLevel],
		chunks: &'a [Chunk],
	) -> BoxFuture<'a, tempo_storage::Result<u64>>;

	fn delete_chunks<'a>(
		&'a self,
		owner_id: &'a str,
		levels: &'a [ChunkLevel],
	) -> BoxFuture<'a, tempo_storage::Result<u64>>;

	fn similarity_search<'a>(
		&'a self,
		owner_id: &'a str,
		embedding: &'a [f32],
		levels: &'a [ChunkLevel],
		threshold: f32,
		limit: u32,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<(Chunk, f32)>>>;

	fn lexical_search<'a>(
		&'a self,
		owner_id: &'a str,
		levels: &'a [ChunkLevel],
		terms: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<(Chunk, u32)>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

#[derive(Clone)]
pub struct Backends {
	pub records: Arc<dyn RecordSource>,
	pub chunks: Arc<dyn ChunkIndex>,
}
impl Backends {
	pub fn new(records: Arc<dyn RecordSource>, chunks: Arc<dyn ChunkIndex>) -> Self {
		Self { records, chunks }
	}

	pub fn postgres(db: Db) -> Self {
		let backend = Arc::new(PgBackend { db });

		Self { records: backend.clone(), chunks: backend }
	}
}

pub struct TempoService {
	pub cfg: Config,
	pub providers: Providers,
	pub backends: Backends,
}
impl TempoService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_backends(cfg, Providers::default(), Backends::postgres(db))
	}

	pub fn with_backends(cfg: Config, providers: Providers, backends: Backends) -> Self {
		Self { cfg, providers, backends }
	}

	fn provider_timeout(&self, timeout_ms: u64) -> Duration {
		Duration::from_millis(timeout_ms)
	}

	fn storage_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.storage.postgres.statement_timeout_ms)
	}

	/// Embeds one text through the configured provider, bounded by the provider timeout.
	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [text.to_string()];
		let vectors = with_timeout(
			self.provider_timeout(cfg.timeout_ms),
			"embedding",
			self.providers.embedding.embed(cfg, &texts),
		)
		.await??;

		vectors.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
			retryable: false,
		})
	}

	pub(crate) async fn complete(
		&self,
		prompt: &str,
		context: Option<&str>,
		history: &[ChatMessage],
	) -> Result<String> {
		let cfg = &self.cfg.providers.completion;

		Ok(with_timeout(
			self.provider_timeout(cfg.timeout_ms),
			"completion",
			self.providers.completion.complete(cfg, prompt, context, history),
		)
		.await??)
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, tempo_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		context: Option<&'a str>,
		history: &'a [ChatMessage],
	) -> BoxFuture<'a, tempo_providers::Result<String>> {
		Box::pin(completion::complete(cfg, prompt, context, history))
	}
}

struct PgBackend {
	db: Db,
}
impl RecordSource for PgBackend {
	fn list_projects<'a>(
		&'a self,
		owner_id: &'a str,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<Project>>> {
		Box::pin(records::list_projects(&self.db.pool, owner_id))
	}

	fn list_tasks<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, tempo_storage::Result<Vec<Task>>> {
		Box::pin(records::list_tasks(&self.db.pool, owner_id))
	}

	fn list_sessions<'a>(
		&'a self,
		owner_id: &'a str,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<WorkSession>>> {
		Box::pin(records::list_sessions(&self.db.pool, owner_id))
	}
}
impl ChunkIndex for PgBackend {
	fn replace_chunks<'a>(
		&'a self,
		owner_id: &'a str,
		levels: &'a [ChunkLevel],
		chunks: &'a [Chunk],
	) -> BoxFuture<'a, tempo_storage::Result<u64>> {
		Box::pin(chunk_store::replace_chunks(&self.db, owner_id, levels, chunks))
	}

	fn delete_chunks<'a>(
		&'a self,
		owner_id: &'a str,
		levels: &'a [ChunkLevel],
	) -> BoxFuture<'a, tempo_storage::Result<u64>> {
		Box::pin(chunk_store::delete_chunks(&self.db.pool, owner_id, levels))
	}

	fn similarity_search<'a>(
		&'a self,
		owner_id: &'a str,
		embedding: &'a [f32],
		levels: &'a [ChunkLevel],
		threshold: f32,
		limit: u32,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<(Chunk, f32)>>> {
		Box::pin(chunk_store::similarity_search(
			&self.db.pool,
			owner_id,
			embedding,
			levels,
			threshold,
			limit,
		))
	}

	fn lexical_search<'a>(
		&'a self,
		owner_id: &'a str,
		levels: &'a [ChunkLevel],
		terms: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, tempo_storage::Result<Vec<(Chunk, u32)>>> {
		Box::pin(chunk_store::lexical_search(&self.db.pool, owner_id, levels, terms, limit))
	}
}

/// Runs `fut` under `limit`, turning an elapsed deadline into [`Error::Timeout`].
pub(crate) async fn with_timeout<F, T>(limit: Duration, label: &str, fut: F) -> Result<T>
where
	F: Future<Output = T>,
{
	tokio::time::timeout(limit, fut).await.map_err(|_| Error::Timeout {
		message: format!("{label} did not finish within {}ms.", limit.as_millis()),
	})
}
