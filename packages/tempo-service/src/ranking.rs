//! Per-level hybrid ranking: semantic similarity first, raw term counts when that comes back empty.

use std::cmp::Ordering;

use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result, TempoService, with_timeout};
use tempo_config::SearchRanking;
use tempo_domain::{
	chunk::{Chunk, ChunkAnalytics, ChunkEntities},
	level::{ChunkLevel, PriorityLevel},
	text,
};

#[derive(Clone, Debug, Serialize)]
pub struct RankedDocument {
	pub chunk_id: Uuid,
	pub level: ChunkLevel,
	pub priority_level: PriorityLevel,
	pub content: String,
	pub source_ids: Vec<String>,
	pub entities: ChunkEntities,
	pub analytics: ChunkAnalytics,
	pub similarity: Option<f32>,
	pub lexical_score: Option<u32>,
	pub priority_score: f32,
	pub final_score: f32,
	/// Set when the document came out of a multi-list fusion.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fusion_score: Option<f32>,
	/// One-based position in the list the document was returned in.
	pub rank: usize,
}
impl RankedDocument {
	fn from_chunk(chunk: Chunk, priority_level: PriorityLevel, priority_score: f32) -> Self {
		Self {
			chunk_id: chunk.chunk_id,
			level: chunk.level,
			priority_level,
			content: chunk.content,
			source_ids: chunk.source_ids,
			entities: chunk.entities,
			analytics: chunk.analytics,
			similarity: None,
			lexical_score: None,
			priority_score,
			final_score: priority_score,
			fusion_score: None,
			rank: 0,
		}
	}
}

impl TempoService {
	/// Ranks the owner's chunks of one priority level against `query`.
	///
	/// The similarity and lexical queries run concurrently. Semantic hits win when there are any;
	/// otherwise the lexical list is used. Only a failure of both queries is an error.
	pub async fn rank(
		&self,
		owner_id: &str,
		query: &str,
		query_embedding: Option<&[f32]>,
		level: PriorityLevel,
	) -> Result<Vec<RankedDocument>> {
		let cfg = &self.cfg.search.ranking;
		let levels = level.content_types();
		let terms = text::terms(query, cfg.min_term_chars as usize);
		let semantic = async {
			let Some(embedding) = query_embedding else {
				return Ok(Vec::new());
			};

			Ok::<_, Error>(with_timeout(
				self.storage_timeout(),
				"similarity search",
				self.backends.chunks.similarity_search(
					owner_id,
					embedding,
					levels,
					cfg.min_similarity,
					cfg.semantic_limit,
				),
			)
			.await??)
		};
		let lexical = async {
			if terms.is_empty() {
				return Ok(Vec::new());
			}

			Ok::<_, Error>(with_timeout(
				self.storage_timeout(),
				"lexical search",
				self.backends.chunks.lexical_search(owner_id, levels, &terms, cfg.lexical_limit),
			)
			.await??)
		};
		let (semantic, lexical) = tokio::join!(semantic, lexical);

		match (semantic, lexical) {
			(Ok(hits), _) if !hits.is_empty() => Ok(rank_semantic(hits, level, cfg)),
			(Ok(_), Ok(hits)) => Ok(rank_lexical(hits, level, cfg)),
			(Err(err), Ok(hits)) => {
				tracing::warn!(
					error = %err,
					level = %level,
					"Similarity search failed. Falling back to lexical ranking."
				);

				Ok(rank_lexical(hits, level, cfg))
			},
			(Ok(_), Err(err)) => {
				tracing::warn!(error = %err, level = %level, "Lexical search failed.");

				Ok(Vec::new())
			},
			(Err(semantic_err), Err(lexical_err)) => {
				tracing::warn!(
					error = %lexical_err,
					level = %level,
					"Lexical search failed after similarity search failed."
				);

				Err(Error::Storage {
					message: format!("Ranking failed for {level}: {semantic_err}"),
				})
			},
		}
	}
}

/// Documents from similarity hits. Hits below `min_similarity` are dropped.
pub fn rank_semantic(
	hits: Vec<(Chunk, f32)>,
	level: PriorityLevel,
	cfg: &SearchRanking,
) -> Vec<RankedDocument> {
	let priority_score = level.priority_score(cfg.priority_weight);
	let mut docs: Vec<RankedDocument> = hits
		.into_iter()
		.filter(|(_, similarity)| similarity.is_finite() && *similarity >= cfg.min_similarity)
		.map(|(chunk, similarity)| {
			let mut doc = RankedDocument::from_chunk(chunk, level, priority_score);

			doc.similarity = Some(similarity);
			doc.final_score = similarity + priority_score;

			doc
		})
		.collect();

	sort_and_cap(&mut docs, cfg.semantic_limit as usize);

	docs
}

/// Documents from raw occurrence counts. Zero counts are dropped.
pub fn rank_lexical(
	hits: Vec<(Chunk, u32)>,
	level: PriorityLevel,
	cfg: &SearchRanking,
) -> Vec<RankedDocument> {
	let priority_score = level.priority_score(cfg.priority_weight);
	let mut docs: Vec<RankedDocument> = hits
		.into_iter()
		.filter(|(_, count)| *count > 0)
		.map(|(chunk, count)| {
			let mut doc = RankedDocument::from_chunk(chunk, level, priority_score);

			doc.lexical_score = Some(count);
			doc.final_score = count as f32 + priority_score;

			doc
		})
		.collect();

	sort_and_cap(&mut docs, cfg.lexical_limit as usize);

	docs
}

/// Orders by final score descending with the chunk id as the tie breaker.
pub fn sort_by_score(docs: &mut [RankedDocument]) {
	docs.sort_by(|a, b| {
		b.final_score
			.partial_cmp(&a.final_score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.chunk_id.cmp(&b.chunk_id))
	});
}

pub fn assign_ranks(docs: &mut [RankedDocument]) {
	for (idx, doc) in docs.iter_mut().enumerate() {
		doc.rank = idx + 1;
	}
}

fn sort_and_cap(docs: &mut Vec<RankedDocument>, limit: usize) {
	sort_by_score(docs);
	docs.truncate(limit);
	assign_ranks(docs);
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use tempo_domain::chunk::ChunkDraft;

	fn chunk(key: &str, level: ChunkLevel) -> Chunk {
		Chunk::from_draft(
			"owner",
			ChunkDraft {
				level,
				key: key.to_string(),
				content: format!("chunk {key}"),
				source_ids: vec![key.to_string()],
				entities: ChunkEntities::default(),
				analytics: ChunkAnalytics::default(),
			},
			datetime!(2026-10-17 12:00 UTC),
		)
	}

	#[test]
	fn semantic_scores_add_the_level_priority() {
		let cfg = SearchRanking::default();
		let docs = rank_semantic(
			vec![
				(chunk("a", ChunkLevel::MonthlySummary), 0.4),
				(chunk("b", ChunkLevel::MonthlySummary), 0.9),
				(chunk("c", ChunkLevel::MonthlySummary), 0.05),
			],
			PriorityLevel::MonthlySummary,
			&cfg,
		);

		assert_eq!(docs.len(), 2);
		assert_eq!(docs[0].similarity, Some(0.9));
		assert!((docs[0].final_score - 30.9).abs() < 1e-4);
		assert!((docs[0].priority_score - 30.0).abs() < 1e-6);
		assert_eq!(docs[0].rank, 1);
		assert_eq!(docs[1].rank, 2);
	}

	#[test]
	fn lexical_results_are_capped_and_drop_zero_counts() {
		let cfg = SearchRanking { lexical_limit: 2, ..SearchRanking::default() };
		let docs = rank_lexical(
			vec![
				(chunk("a", ChunkLevel::DailySummary), 1),
				(chunk("b", ChunkLevel::DailySummary), 3),
				(chunk("c", ChunkLevel::DailySummary), 2),
				(chunk("d", ChunkLevel::DailySummary), 0),
			],
			PriorityLevel::DailySummary,
			&cfg,
		);
		let counts: Vec<Option<u32>> = docs.iter().map(|doc| doc.lexical_score).collect();

		assert_eq!(counts, vec![Some(3), Some(2)]);
		assert!(docs.iter().all(|doc| doc.priority_score == 0.0));
	}

	#[test]
	fn equal_scores_break_ties_by_chunk_id() {
		let cfg = SearchRanking::default();
		let docs = rank_lexical(
			vec![
				(chunk("x", ChunkLevel::TaskAggregate), 2),
				(chunk("y", ChunkLevel::TaskAggregate), 2),
			],
			PriorityLevel::RelevantSources,
			&cfg,
		);

		assert!(docs[0].chunk_id < docs[1].chunk_id);
	}
}
