//! Query enhancement: hypothetical-document expansion (HyDE) and query decomposition, merged with
//! weighted Reciprocal Rank Fusion.

use futures::future;
use serde::{Deserialize, Serialize};

use crate::{
	Error, Result, TempoService,
	cascade::CascadeResult,
	ranking::{self, RankedDocument},
};
use tempo_config::SearchEnhancement;
use tempo_domain::{
	classify::{self, QueryClassification},
	level::PriorityLevel,
	rrf::{self, WeightedList},
	text,
};

const COMPARATIVE_WORDS: [&str; 6] = ["compare", "compared", "comparing", "comparison", "versus", "vs"];
const INSIGHT_STEMS: [&str; 4] = ["analy", "insight", "pattern", "trend"];
const FACTUAL_PHRASES: [&str; 3] = ["how many", "what is", "show me"];

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
	Standard,
	Hyde,
	Decomposition,
	/// HyDE and decomposition fused with the original query.
	Hybrid,
}
impl Technique {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Standard => "standard",
			Self::Hyde => "hyde",
			Self::Decomposition => "decomposition",
			Self::Hybrid => "hybrid",
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct EnhancedSearch {
	pub results: Vec<RankedDocument>,
	pub technique_used: Technique,
	pub sub_queries: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hypothetical_document: Option<String>,
	pub levels_searched: Vec<PriorityLevel>,
}
impl EnhancedSearch {
	fn standard(cascade: CascadeResult) -> Self {
		Self {
			results: cascade.docs,
			technique_used: Technique::Standard,
			sub_queries: Vec::new(),
			hypothetical_document: None,
			levels_searched: cascade.levels_searched,
		}
	}
}

/// One cascade run that feeds the fusion.
struct SearchPlan {
	query: String,
	classification: QueryClassification,
	weight: f32,
}

impl TempoService {
	/// Picks a strategy for `query`, runs it, and falls back to the plain cascade when the
	/// completion provider cannot help.
	pub async fn enhance_and_search(
		&self,
		owner_id: &str,
		query: &str,
		classification: &QueryClassification,
	) -> EnhancedSearch {
		let technique = select_strategy(query, classification, &self.cfg.search.enhancement);

		tracing::info!(technique = technique.as_str(), "Selected search strategy.");

		let enhanced = match technique {
			Technique::Standard => return self.standard_search(owner_id, query, classification).await,
			Technique::Hyde => self.hyde_search(owner_id, query, classification).await,
			Technique::Decomposition => self.decomposition_search(owner_id, query).await,
			Technique::Hybrid => self.hybrid_search(owner_id, query, classification).await,
		};

		match enhanced {
			Ok(enhanced) => enhanced,
			Err(err) => {
				tracing::warn!(
					error = %err,
					technique = technique.as_str(),
					"Query enhancement failed. Falling back to the standard search."
				);

				self.standard_search(owner_id, query, classification).await
			},
		}
	}

	async fn standard_search(
		&self,
		owner_id: &str,
		query: &str,
		classification: &QueryClassification,
	) -> EnhancedSearch {
		EnhancedSearch::standard(self.cascade_search(owner_id, query, classification).await)
	}

	async fn hyde_search(
		&self,
		owner_id: &str,
		query: &str,
		classification: &QueryClassification,
	) -> Result<EnhancedSearch> {
		let cfg = &self.cfg.search.enhancement;
		let hypothetical = self.hypothetical_document(query).await?;
		let plans = vec![
			SearchPlan {
				query: hypothetical.clone(),
				classification: *classification,
				weight: cfg.hyde_weight,
			},
			SearchPlan {
				query: query.to_string(),
				classification: *classification,
				weight: cfg.hyde_original_weight,
			},
		];
		let (results, levels_searched) = self.run_fused(owner_id, plans).await;

		Ok(EnhancedSearch {
			results,
			technique_used: Technique::Hyde,
			sub_queries: Vec::new(),
			hypothetical_document: Some(hypothetical),
			levels_searched,
		})
	}

	async fn decomposition_search(&self, owner_id: &str, query: &str) -> Result<EnhancedSearch> {
		let sub_queries = self.sub_queries(query).await?;
		let weight = 1.0 / sub_queries.len() as f32;
		let plans = sub_queries.iter().map(|sub_query| sub_plan(sub_query, weight)).collect();
		let (results, levels_searched) = self.run_fused(owner_id, plans).await;

		Ok(EnhancedSearch {
			results,
			technique_used: Technique::Decomposition,
			sub_queries,
			hypothetical_document: None,
			levels_searched,
		})
	}

	async fn hybrid_search(
		&self,
		owner_id: &str,
		query: &str,
		classification: &QueryClassification,
	) -> Result<EnhancedSearch> {
		let cfg = &self.cfg.search.enhancement;
		let (hypothetical, sub_queries) =
			tokio::join!(self.hypothetical_document(query), self.sub_queries(query));
		let hypothetical = log_partial_failure("hypothetical document", hypothetical);
		let sub_queries = log_partial_failure("decomposition", sub_queries).unwrap_or_default();

		if hypothetical.is_none() && sub_queries.is_empty() {
			return Err(Error::Provider {
				message: "Neither expansion produced a usable query.".to_string(),
				retryable: false,
			});
		}

		let mut plans = vec![SearchPlan {
			query: query.to_string(),
			classification: *classification,
			weight: cfg.combined_original_weight,
		}];

		if let Some(hypothetical) = &hypothetical {
			plans.push(SearchPlan {
				query: hypothetical.clone(),
				classification: *classification,
				weight: cfg.combined_hyde_weight,
			});
		}
		if !sub_queries.is_empty() {
			let weight = cfg.combined_decomposition_weight / sub_queries.len() as f32;

			plans.extend(sub_queries.iter().map(|sub_query| sub_plan(sub_query, weight)));
		}

		let (results, levels_searched) = self.run_fused(owner_id, plans).await;

		Ok(EnhancedSearch {
			results,
			technique_used: Technique::Hybrid,
			sub_queries,
			hypothetical_document: hypothetical,
			levels_searched,
		})
	}

	async fn hypothetical_document(&self, query: &str) -> Result<String> {
		let raw = self.complete(&hyde_prompt(query), None, &[]).await?;
		let passage = raw.trim();

		if passage.is_empty() {
			return Err(Error::Provider {
				message: "Hypothetical document was empty.".to_string(),
				retryable: false,
			});
		}

		Ok(passage.to_string())
	}

	async fn sub_queries(&self, query: &str) -> Result<Vec<String>> {
		let cfg = &self.cfg.search.enhancement;
		let prompt = decomposition_prompt(query, cfg.min_sub_queries, cfg.max_sub_queries);
		let raw = self.complete(&prompt, None, &[]).await?;

		parse_sub_queries(&raw, cfg.min_sub_queries as usize, cfg.max_sub_queries as usize)
			.ok_or_else(|| Error::Provider {
				message: "Decomposition did not yield enough sub-questions.".to_string(),
				retryable: false,
			})
	}

	/// Runs every plan's cascade in parallel and fuses the result lists.
	async fn run_fused(
		&self,
		owner_id: &str,
		plans: Vec<SearchPlan>,
	) -> (Vec<RankedDocument>, Vec<PriorityLevel>) {
		let searches = plans.iter().map(|plan| async move {
			let cascade = self.cascade_search(owner_id, &plan.query, &plan.classification).await;

			(cascade, plan.weight)
		});
		let outcomes = future::join_all(searches).await;

		tracing::debug!(searches = outcomes.len(), "Fusing parallel searches.");

		let cfg = &self.cfg;

		fuse_cascades(
			outcomes,
			cfg.search.ranking.rrf_k,
			cfg.search.enhancement.result_limit as usize,
		)
	}
}

/// First matching rule wins.
pub fn select_strategy(
	query: &str,
	classification: &QueryClassification,
	cfg: &SearchEnhancement,
) -> Technique {
	if !cfg.enabled {
		return Technique::Standard;
	}

	let words = text::words(query);
	let normalized = words.join(" ");

	if words.iter().any(|word| COMPARATIVE_WORDS.contains(&word.as_str()))
		|| classify::contains_phrase(&normalized, "difference between")
	{
		return Technique::Decomposition;
	}
	if words.iter().any(|word| INSIGHT_STEMS.iter().any(|stem| word.starts_with(stem))) {
		return Technique::Hyde;
	}
	if words.iter().any(|word| matches!(word.as_str(), "and" | "or"))
		&& words.len() > cfg.decomposition_min_words as usize
	{
		return Technique::Decomposition;
	}
	if words.len() > cfg.combined_min_words as usize
		|| classification.confidence < cfg.min_confidence
	{
		return Technique::Hybrid;
	}
	if FACTUAL_PHRASES.iter().any(|phrase| classify::contains_phrase(&normalized, phrase))
		|| words.iter().any(|word| word == "which")
	{
		return Technique::Hyde;
	}

	Technique::Standard
}

/// Reads sub-questions from a JSON array, falling back to numbered or bulleted lines. Returns
/// `None` when fewer than `min` distinct questions are found; extras beyond `max` are dropped.
pub fn parse_sub_queries(raw: &str, min: usize, max: usize) -> Option<Vec<String>> {
	let candidates = parse_json_array(raw).unwrap_or_else(|| parse_listed_lines(raw));
	let mut out: Vec<String> = Vec::new();

	for candidate in candidates {
		let candidate = candidate.trim().to_string();

		if candidate.is_empty()
			|| out.iter().any(|existing| existing.eq_ignore_ascii_case(&candidate))
		{
			continue;
		}

		out.push(candidate);
	}

	out.truncate(max);

	if out.len() < min {
		return None;
	}

	Some(out)
}

/// Fuses the cascades, then regroups the fused list by priority level so the hierarchy order
/// survives. Within a level the fused score decides.
pub fn fuse_cascades(
	outcomes: Vec<(CascadeResult, f32)>,
	k: f32,
	limit: usize,
) -> (Vec<RankedDocument>, Vec<PriorityLevel>) {
	let levels_searched = outcomes
		.iter()
		.map(|(cascade, _)| &cascade.levels_searched)
		.max_by_key(|levels| levels.len())
		.cloned()
		.unwrap_or_default();
	let lists =
		outcomes.into_iter().map(|(cascade, weight)| WeightedList::new(cascade.docs, weight)).collect();
	let mut results: Vec<RankedDocument> = rrf::fuse(lists, k, |doc: &RankedDocument| doc.chunk_id)
		.into_iter()
		.map(|fused| {
			let mut doc = fused.item;

			doc.fusion_score = Some(fused.score);

			doc
		})
		.collect();

	results.sort_by_key(|doc| doc.priority_level.priority());
	results.truncate(limit);
	ranking::assign_ranks(&mut results);

	(results, levels_searched)
}

pub fn hyde_prompt(query: &str) -> String {
	format!(
		"Write a short passage that reads like a summary from a personal work activity log and \
		 that would answer the question below. Mention plausible tasks, projects, durations and \
		 dates. Reply with the passage only.\n\nQuestion: {query}"
	)
}

pub fn decomposition_prompt(query: &str, min: u32, max: u32) -> String {
	format!(
		"Break the question below into {min} to {max} simpler, self-contained questions that can \
		 each be answered from a personal work activity log. Reply with a JSON array of strings \
		 only.\n\nQuestion: {query}"
	)
}

fn sub_plan(sub_query: &str, weight: f32) -> SearchPlan {
	SearchPlan {
		query: sub_query.to_string(),
		classification: classify::classify(sub_query),
		weight,
	}
}

fn log_partial_failure<T>(label: &str, result: Result<T>) -> Option<T> {
	match result {
		Ok(value) => Some(value),
		Err(err) => {
			tracing::warn!(error = %err, expansion = label, "Expansion failed. Continuing without it.");

			None
		},
	}
}

fn parse_json_array(raw: &str) -> Option<Vec<String>> {
	let start = raw.find('[')?;
	let end = raw.rfind(']')?;

	if end <= start {
		return None;
	}

	serde_json::from_str::<Vec<String>>(&raw[start..=end]).ok()
}

fn parse_listed_lines(raw: &str) -> Vec<String> {
	raw.lines().filter_map(strip_list_marker).collect()
}

/// `1. Foo`, `2) Foo`, `- Foo`, `* Foo`, and bare questions ending in `?` are accepted.
fn strip_list_marker(line: &str) -> Option<String> {
	let line = line.trim();

	if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
		return Some(rest.trim().to_string());
	}

	let digits = line.chars().take_while(char::is_ascii_digit).count();

	if digits > 0 {
		let rest = &line[digits..];

		if let Some(rest) = rest.strip_prefix(['.', ')', ':']) {
			return Some(rest.trim().to_string());
		}
	}
	if line.ends_with('?') {
		return Some(line.to_string());
	}

	None
}
