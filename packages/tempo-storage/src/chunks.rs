//! Persistence and retrieval for generated activity chunks.

use std::collections::HashMap;

use sqlx::{PgExecutor, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{PendingChunk, ScoredChunkRow},
};
use tempo_domain::{chunk::Chunk, level::ChunkLevel};

const CHUNK_COLUMNS: &str = "\
	c.chunk_id,
	c.owner_id,
	c.level,
	c.content,
	c.source_ids,
	c.entities,
	c.analytics,
	c.content_hash,
	c.created_at";

/// Replaces the owner's chunks for `levels` with `chunks` in one transaction. Embeddings of chunks
/// whose id and content hash are unchanged carry over, so only new or edited chunks wait for the
/// embedding worker. Returns the number of inserted rows.
pub async fn replace_chunks(
	db: &Db,
	owner_id: &str,
	levels: &[ChunkLevel],
	chunks: &[Chunk],
) -> Result<u64> {
	if let Some(chunk) =
		chunks.iter().find(|chunk| chunk.owner_id != owner_id || !levels.contains(&chunk.level))
	{
		return Err(Error::InvalidArgument(format!(
			"Chunk {} does not belong to owner {owner_id} and the replaced levels.",
			chunk.chunk_id
		)));
	}

	let level_names = level_names(levels);
	let mut tx = db.pool.begin().await?;
	let existing: Vec<(Uuid, String, String)> = sqlx::query_as(
		"\
SELECT chunk_id, content_hash, embedding::text
FROM activity_chunks
WHERE owner_id = $1 AND level = ANY($2) AND embedding IS NOT NULL",
	)
	.bind(owner_id)
	.bind(&level_names)
	.fetch_all(&mut *tx)
	.await?;
	let carried: HashMap<Uuid, (String, String)> =
		existing.into_iter().map(|(id, hash, vec)| (id, (hash, vec))).collect();

	delete_chunks(&mut *tx, owner_id, levels).await?;

	let mut inserted = 0;

	for chunk in chunks {
		let embedding = carried
			.get(&chunk.chunk_id)
			.filter(|(hash, _)| hash == &chunk.content_hash)
			.map(|(_, vec)| vec.as_str());

		inserted += sqlx::query(
			"\
INSERT INTO activity_chunks (
	chunk_id,
	owner_id,
	level,
	content,
	source_ids,
	entities,
	analytics,
	content_hash,
	embedding,
	created_at,
	embedded_at
)
VALUES (
	$1,
	$2,
	$3,
	$4,
	$5,
	$6,
	$7,
	$8,
	$9::text::vector,
	$10,
	CASE WHEN $9::text IS NULL THEN NULL ELSE $10 END
)",
		)
		.bind(chunk.chunk_id)
		.bind(chunk.owner_id.as_str())
		.bind(chunk.level.as_str())
		.bind(chunk.content.as_str())
		.bind(Json(&chunk.source_ids))
		.bind(Json(&chunk.entities))
		.bind(Json(&chunk.analytics))
		.bind(chunk.content_hash.as_str())
		.bind(embedding)
		.bind(chunk.created_at)
		.execute(&mut *tx)
		.await?
		.rows_affected();
	}

	tx.commit().await?;

	Ok(inserted)
}

pub async fn delete_chunks<'e, E>(executor: E, owner_id: &str, levels: &[ChunkLevel]) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM activity_chunks WHERE owner_id = $1 AND level = ANY($2)")
		.bind(owner_id)
		.bind(level_names(levels))
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

/// Chunks with cosine similarity at or above `threshold`, most similar first.
pub async fn similarity_search<'e, E>(
	executor: E,
	owner_id: &str,
	embedding: &[f32],
	levels: &[ChunkLevel],
	threshold: f32,
	limit: u32,
) -> Result<Vec<(Chunk, f32)>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT
{CHUNK_COLUMNS},
	(1 - (c.embedding <=> $2::text::vector))::float8 AS score
FROM activity_chunks c
WHERE c.owner_id = $1
	AND c.level = ANY($3)
	AND c.embedding IS NOT NULL
	AND 1 - (c.embedding <=> $2::text::vector) >= $4
ORDER BY c.embedding <=> $2::text::vector ASC, c.chunk_id ASC
LIMIT $5"
	);
	let rows = sqlx::query_as::<_, ScoredChunkRow>(&sql)
		.bind(owner_id)
		.bind(crate::vector_to_pg(embedding))
		.bind(level_names(levels))
		.bind(f64::from(threshold))
		.bind(i64::from(limit))
		.fetch_all(executor)
		.await?;

	Ok(convert_scored(rows).into_iter().map(|(chunk, score)| (chunk, score as f32)).collect())
}

/// Chunks ranked by the total number of raw, case-insensitive occurrences of `terms` in their
/// content. Chunks without any occurrence are excluded.
pub async fn lexical_search<'e, E>(
	executor: E,
	owner_id: &str,
	levels: &[ChunkLevel],
	terms: &[String],
	limit: u32,
) -> Result<Vec<(Chunk, u32)>>
where
	E: PgExecutor<'e>,
{
	let terms: Vec<String> = terms
		.iter()
		.map(|term| term.trim().to_lowercase())
		.filter(|term| !term.is_empty())
		.collect();

	if terms.is_empty() {
		return Ok(Vec::new());
	}

	let patterns: Vec<String> = terms.iter().map(|term| format!("%{}%", escape_like(term))).collect();
	let sql = format!(
		"\
SELECT
{CHUNK_COLUMNS},
	s.score::float8 AS score
FROM activity_chunks c
CROSS JOIN LATERAL (
	SELECT COALESCE(SUM(
		(char_length(lower(c.content)) - char_length(replace(lower(c.content), t.term, '')))
			/ char_length(t.term)
	), 0) AS score
	FROM unnest($3::text[]) AS t(term)
) s
WHERE c.owner_id = $1
	AND c.level = ANY($2)
	AND c.content ILIKE ANY($4::text[])
	AND s.score > 0
ORDER BY s.score DESC, c.chunk_id ASC
LIMIT $5"
	);
	let rows = sqlx::query_as::<_, ScoredChunkRow>(&sql)
		.bind(owner_id)
		.bind(level_names(levels))
		.bind(&terms)
		.bind(&patterns)
		.bind(i64::from(limit))
		.fetch_all(executor)
		.await?;

	Ok(convert_scored(rows).into_iter().map(|(chunk, score)| (chunk, score.max(0.0) as u32)).collect())
}

pub async fn list_pending_embeddings<'e, E>(executor: E, limit: u32) -> Result<Vec<PendingChunk>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, PendingChunk>(
		"\
SELECT chunk_id, content, content_hash
FROM activity_chunks
WHERE embedding IS NULL
ORDER BY created_at ASC, chunk_id ASC
LIMIT $1",
	)
	.bind(i64::from(limit))
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Stores an embedding unless the chunk was replaced with different content in the meantime.
pub async fn set_embedding<'e, E>(
	executor: E,
	chunk_id: Uuid,
	content_hash: &str,
	embedding: &[f32],
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE activity_chunks
SET embedding = $3::text::vector,
	embedded_at = $4
WHERE chunk_id = $1 AND content_hash = $2",
	)
	.bind(chunk_id)
	.bind(content_hash)
	.bind(crate::vector_to_pg(embedding))
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Removes every chunk of one deprecated level for the owner.
pub async fn cleanup_level<'e, E>(executor: E, owner_id: &str, level: ChunkLevel) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	delete_chunks(executor, owner_id, &[level]).await
}

fn level_names(levels: &[ChunkLevel]) -> Vec<String> {
	levels.iter().map(|level| level.as_str().to_string()).collect()
}

fn escape_like(term: &str) -> String {
	term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn convert_scored(rows: Vec<ScoredChunkRow>) -> Vec<(Chunk, f64)> {
	rows.into_iter()
		.filter_map(|row| {
			let chunk_id = row.chunk.chunk_id;

			match Chunk::try_from(row.chunk) {
				Ok(chunk) => Some((chunk, row.score)),
				Err(err) => {
					tracing::warn!(error = %err, %chunk_id, "Skipping malformed chunk row.");

					None
				},
			}
		})
		.collect()
}
