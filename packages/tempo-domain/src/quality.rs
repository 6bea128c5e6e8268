//! Answer quality types and the offline heuristic check.

use serde::{Deserialize, Serialize};

use crate::text;

const MIN_CHARS: usize = 50;
const MAX_CHARS: usize = 2_000;
const MIN_OVERLAP: f32 = 0.3;
const SHORT_PENALTY: f32 = 0.3;
const LONG_PENALTY: f32 = 0.2;
const REFUSAL_PENALTY: f32 = 0.4;
const OVERLAP_PENALTY: f32 = 0.2;
const REFUSAL_PHRASES: [&str; 8] = [
	"i don't have",
	"i do not have",
	"i cannot",
	"i can't",
	"i'm unable",
	"i am unable",
	"as an ai",
	"no information",
];

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Low,
	Medium,
	High,
}
impl Severity {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"low" => Some(Self::Low),
			"medium" | "moderate" => Some(Self::Medium),
			"high" | "critical" => Some(Self::High),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValidationIssue {
	#[serde(rename = "type")]
	pub kind: String,
	pub severity: Severity,
	pub description: String,
	#[serde(default)]
	pub suggestion: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValidationResult {
	pub is_valid: bool,
	pub overall_score: f32,
	pub issues: Vec<ValidationIssue>,
	pub corrections: Vec<String>,
	/// Set when the score is a default rather than a judgement.
	pub fallback: bool,
}
impl ValidationResult {
	/// A default verdict that lets the answer through unchanged.
	pub fn fallback(score: f32) -> Self {
		Self {
			is_valid: true,
			overall_score: score,
			issues: Vec::new(),
			corrections: Vec::new(),
			fallback: true,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuickCheck {
	pub score: f32,
	pub issues: Vec<ValidationIssue>,
}

/// Cheap offline estimate of answer quality. Starts from 1.0 and subtracts fixed penalties.
pub fn quick_check(query: &str, response: &str) -> QuickCheck {
	let mut score: f32 = 1.0;
	let mut issues = Vec::new();
	let chars = response.trim().chars().count();

	if chars < MIN_CHARS {
		score -= SHORT_PENALTY;
		issues.push(issue(
			"too_short",
			Severity::Medium,
			"The answer is very short.",
			"Add the supporting details from the retrieved activity.",
		));
	}
	if chars > MAX_CHARS {
		score -= LONG_PENALTY;
		issues.push(issue(
			"too_long",
			Severity::Low,
			"The answer is very long.",
			"Lead with the direct answer and trim repetition.",
		));
	}

	let lowered = response.to_lowercase();

	if REFUSAL_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
		score -= REFUSAL_PENALTY;
		issues.push(issue(
			"generic_refusal",
			Severity::High,
			"The answer declines instead of using the provided activity.",
			"Answer from the activity context, or say exactly what is missing.",
		));
	}

	let overlap = term_overlap(query, response);

	if overlap < MIN_OVERLAP {
		score -= OVERLAP_PENALTY;
		issues.push(issue(
			"low_relevance",
			Severity::Medium,
			"The answer shares few terms with the question.",
			"Address the subject of the question directly.",
		));
	}

	QuickCheck { score: score.clamp(0.0, 1.0), issues }
}

/// Share of query terms that appear in the response. A query without terms overlaps fully.
pub fn term_overlap(query: &str, response: &str) -> f32 {
	let query_terms = text::terms(query, 2);

	if query_terms.is_empty() {
		return 1.0;
	}

	let response_words = text::words(response);
	let matched = query_terms
		.iter()
		.filter(|term| response_words.iter().any(|word| word.starts_with(term.as_str())))
		.count();

	matched as f32 / query_terms.len() as f32
}

fn issue(kind: &str, severity: Severity, description: &str, suggestion: &str) -> ValidationIssue {
	ValidationIssue {
		kind: kind.to_string(),
		severity,
		description: description.to_string(),
		suggestion: suggestion.to_string(),
	}
}
