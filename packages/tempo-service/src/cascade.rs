//! Priority cascade: monthly, weekly, relevant sources, then daily, stopping once enough evidence
//! has been gathered for the query's complexity.

use serde::Serialize;

use crate::{
	TempoService,
	ranking::{self, RankedDocument},
};
use tempo_config::SearchCascade;
use tempo_domain::{
	classify::{Complexity, QueryClassification},
	level::PriorityLevel,
};

#[derive(Clone, Debug, Default, Serialize)]
pub struct CascadeResult {
	pub docs: Vec<RankedDocument>,
	/// Always a prefix of [`PriorityLevel::CASCADE`].
	pub levels_searched: Vec<PriorityLevel>,
}
impl CascadeResult {
	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}
}

/// Documents gathered so far, per priority level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
	pub monthly: usize,
	pub weekly: usize,
	pub relevant: usize,
	pub daily: usize,
}
impl LevelCounts {
	pub fn total(&self) -> usize {
		self.monthly + self.weekly + self.relevant + self.daily
	}

	fn add(&mut self, level: PriorityLevel, count: usize) {
		match level {
			PriorityLevel::MonthlySummary => self.monthly += count,
			PriorityLevel::WeeklySummary => self.weekly += count,
			PriorityLevel::RelevantSources => self.relevant += count,
			PriorityLevel::DailySummary => self.daily += count,
		}
	}
}

impl TempoService {
	/// Searches the cascade for `query`. The query is embedded once; when embedding fails every
	/// level is ranked lexically.
	pub async fn cascade_search(
		&self,
		owner_id: &str,
		query: &str,
		classification: &QueryClassification,
	) -> CascadeResult {
		let embedding = match self.embed_one(query).await {
			Ok(embedding) => Some(embedding),
			Err(err) => {
				tracing::warn!(error = %err, "Query embedding failed. Ranking lexically.");

				None
			},
		};

		self.cascade_with_embedding(owner_id, query, embedding.as_deref(), classification).await
	}

	pub(crate) async fn cascade_with_embedding(
		&self,
		owner_id: &str,
		query: &str,
		embedding: Option<&[f32]>,
		classification: &QueryClassification,
	) -> CascadeResult {
		let cfg = &self.cfg.search.cascade;
		let mut counts = LevelCounts::default();
		let mut found = Vec::with_capacity(PriorityLevel::CASCADE.len());
		let mut levels_searched = Vec::with_capacity(PriorityLevel::CASCADE.len());

		for level in PriorityLevel::CASCADE {
			levels_searched.push(level);

			match self.rank(owner_id, query, embedding, level).await {
				Ok(docs) if docs.is_empty() => {
					tracing::info!(level = %level, "No documents at level. Skipping.");
				},
				Ok(docs) => {
					tracing::info!(level = %level, count = docs.len(), "Ranked level documents.");

					counts.add(level, docs.len());
					found.push((level, docs));
				},
				Err(err) => {
					tracing::warn!(error = %err, level = %level, "Level ranking failed. Skipping.");
				},
			}

			if should_stop(level, &counts, classification, cfg) {
				tracing::debug!(level = %level, total = counts.total(), "Cascade stopped.");

				break;
			}
		}

		let docs = shape(found, cfg);

		if docs.is_empty() {
			tracing::info!(owner_id, "Cascade found no evidence.");
		}

		CascadeResult { docs, levels_searched }
	}
}

/// Whether the cascade has enough evidence after searching `level`.
pub fn should_stop(
	level: PriorityLevel,
	counts: &LevelCounts,
	classification: &QueryClassification,
	cfg: &SearchCascade,
) -> bool {
	match level {
		PriorityLevel::MonthlySummary | PriorityLevel::WeeklySummary => false,
		PriorityLevel::RelevantSources => {
			if classification.temporal_hint.wants_detail() {
				return false;
			}

			match classification.complexity {
				Complexity::Simple =>
					counts.monthly + counts.weekly >= cfg.simple_min_summary_docs as usize
						&& counts.relevant >= cfg.simple_min_relevant_docs as usize,
				Complexity::Moderate =>
					counts.relevant >= cfg.moderate_min_relevant_docs as usize
						&& counts.total() >= cfg.moderate_min_total_docs as usize,
				Complexity::Complex => false,
			}
		},
		PriorityLevel::DailySummary =>
			counts.daily >= cfg.daily_min_docs as usize
				|| counts.total() >= cfg.daily_min_total_docs as usize,
	}
}

/// Caps each level and concatenates them in hierarchy order. Later levels only fill in while the
/// running total is below their cap.
pub fn shape(
	found: Vec<(PriorityLevel, Vec<RankedDocument>)>,
	cfg: &SearchCascade,
) -> Vec<RankedDocument> {
	let mut shaped: Vec<RankedDocument> = Vec::new();

	for level in PriorityLevel::CASCADE {
		let (max, total_cap) = caps(level, cfg);

		for (_, docs) in found.iter().filter(|(found_level, _)| *found_level == level) {
			let mut taken = 0;

			for doc in docs {
				if taken >= max || total_cap.is_some_and(|cap| shaped.len() >= cap) {
					break;
				}

				shaped.push(doc.clone());

				taken += 1;
			}
		}
	}

	ranking::assign_ranks(&mut shaped);

	shaped
}

fn caps(level: PriorityLevel, cfg: &SearchCascade) -> (usize, Option<usize>) {
	match level {
		PriorityLevel::MonthlySummary => (cfg.max_monthly as usize, None),
		PriorityLevel::WeeklySummary => (cfg.max_weekly as usize, Some(cfg.weekly_total_cap as usize)),
		PriorityLevel::RelevantSources =>
			(cfg.max_relevant as usize, Some(cfg.relevant_total_cap as usize)),
		PriorityLevel::DailySummary => (cfg.max_daily as usize, Some(cfg.daily_total_cap as usize)),
	}
}
