use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	Result, TempoService, chunks::require_owner, enhance::Technique, ranking::RankedDocument,
	search::require_query,
};
use tempo_domain::{
	classify::{self, QueryClassification},
	level::{ChunkLevel, PriorityLevel},
	quality,
};
use tempo_providers::completion::ChatMessage;

pub const NO_EVIDENCE_ANSWER: &str = "There is no tracked activity that matches this question yet, \
	so it cannot be answered from your history. Try asking about a period or project with logged \
	work sessions.";

const MAX_EVIDENCE_LINES: usize = 3;

#[derive(Clone, Debug, Deserialize)]
pub struct AnswerRequest {
	pub owner_id: String,
	pub query: String,
	#[serde(default)]
	pub history: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SourceItem {
	pub chunk_id: Uuid,
	pub level: ChunkLevel,
	pub priority_level: PriorityLevel,
	pub content: String,
	pub source_ids: Vec<String>,
	pub score: f32,
	pub rank: usize,
}
impl From<&RankedDocument> for SourceItem {
	fn from(doc: &RankedDocument) -> Self {
		Self {
			chunk_id: doc.chunk_id,
			level: doc.level,
			priority_level: doc.priority_level,
			content: doc.content.clone(),
			source_ids: doc.source_ids.clone(),
			score: doc.fusion_score.unwrap_or(doc.final_score),
			rank: doc.rank,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerMetadata {
	pub levels_searched: Vec<PriorityLevel>,
	pub technique_used: Technique,
	pub sub_queries: Vec<String>,
	/// Absent when nothing was retrieved and the fixed no-evidence answer was returned.
	pub validation_score: Option<f32>,
	pub retrieved_count: usize,
	pub latency_ms: u64,
	pub corrected: bool,
	pub classification: QueryClassification,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerResponse {
	pub response_text: String,
	/// Hierarchy order: monthly, weekly, relevant sources, daily.
	pub sources: Vec<SourceItem>,
	pub metadata: AnswerMetadata,
}

impl TempoService {
	/// Classify, retrieve, generate, validate, and correct at most once. Only an empty owner id or
	/// query is an error; every downstream failure degrades to a simpler answer.
	pub async fn answer_query(&self, req: AnswerRequest) -> Result<AnswerResponse> {
		let started = Instant::now();
		let owner_id = require_owner(&req.owner_id)?;
		let query = require_query(&req.query)?;
		let classification = classify::classify(query);

		tracing::debug!(
			intent = ?classification.intent,
			complexity = ?classification.complexity,
			temporal_hint = ?classification.temporal_hint,
			"Classified query."
		);

		let enhanced = self.enhance_and_search(owner_id, query, &classification).await;
		let sources: Vec<SourceItem> = enhanced.results.iter().map(SourceItem::from).collect();
		let mut metadata = AnswerMetadata {
			levels_searched: enhanced.levels_searched,
			technique_used: enhanced.technique_used,
			sub_queries: enhanced.sub_queries,
			validation_score: None,
			retrieved_count: sources.len(),
			latency_ms: 0,
			corrected: false,
			classification,
		};

		if enhanced.results.is_empty() {
			metadata.latency_ms = elapsed_ms(started);

			return Ok(AnswerResponse {
				response_text: NO_EVIDENCE_ANSWER.to_string(),
				sources,
				metadata,
			});
		}

		let context = build_context(&enhanced.results);
		let generated = self.complete(&answer_prompt(query), Some(&context), &req.history).await;
		let response_text = match generated {
			Ok(answer) => {
				let (answer, score, corrected) = self.checked_answer(query, answer, &context).await;

				metadata.validation_score = Some(score);
				metadata.corrected = corrected;

				answer
			},
			Err(err) => {
				tracing::warn!(error = %err, "Answer generation failed. Summarizing evidence instead.");

				let answer = evidence_summary(&enhanced.results);

				metadata.validation_score = Some(quality::quick_check(query, &answer).score);

				answer
			},
		};

		metadata.latency_ms = elapsed_ms(started);

		tracing::info!(
			owner_id,
			technique = metadata.technique_used.as_str(),
			retrieved = metadata.retrieved_count,
			corrected = metadata.corrected,
			latency_ms = metadata.latency_ms,
			"Answered query."
		);

		Ok(AnswerResponse { response_text, sources, metadata })
	}

	/// Returns the final answer, its score, and whether a correction replaced it.
	async fn checked_answer(
		&self,
		query: &str,
		answer: String,
		context: &str,
	) -> (String, f32, bool) {
		if !self.cfg.validation.enabled {
			let score = quality::quick_check(query, &answer).score;

			return (answer, score, false);
		}

		let validation = self.validate_response(query, &answer, context).await;

		if validation.is_valid {
			return (answer, validation.overall_score, false);
		}

		let correction = self.self_correct(query, &answer, context, &validation).await;

		(correction.corrected_response, correction.new_score, correction.applied)
	}
}

/// Numbered evidence grouped under one heading per priority level, broadest level first.
pub fn build_context(docs: &[RankedDocument]) -> String {
	let mut context = String::from("Tracked activity, broadest summaries first.\n");

	for level in PriorityLevel::CASCADE {
		let mut level_docs = docs.iter().filter(|doc| doc.priority_level == level).peekable();

		if level_docs.peek().is_none() {
			continue;
		}

		context.push_str(&format!("\n## {}\n", heading(level)));

		for doc in level_docs {
			context.push_str(&format!("[{}] {}\n", doc.rank, doc.content.trim()));
		}
	}

	context
}

pub fn answer_prompt(query: &str) -> String {
	format!(
		"Answer the question using only the tracked activity in the system message. Be direct and \
		 name the concrete tasks, projects, dates and durations involved. If the activity does \
		 not cover part of the question, say which part.\n\nQuestion: {query}"
	)
}

/// Plain answer built from the top documents when generation is unavailable.
fn evidence_summary(docs: &[RankedDocument]) -> String {
	let mut summary = String::from("Here is what your tracked activity shows:");

	for doc in docs.iter().take(MAX_EVIDENCE_LINES) {
		let first_line = doc.content.lines().next().unwrap_or_default().trim();

		summary.push_str(&format!("\n- {first_line}"));
	}

	summary
}

fn heading(level: PriorityLevel) -> &'static str {
	match level {
		PriorityLevel::MonthlySummary => "Monthly summaries",
		PriorityLevel::WeeklySummary => "Weekly summaries",
		PriorityLevel::RelevantSources => "Tasks and projects",
		PriorityLevel::DailySummary => "Daily summaries",
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
