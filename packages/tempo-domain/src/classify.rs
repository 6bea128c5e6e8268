//! Rule-based query classification.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text;

pub const STRONG_CONFIDENCE: f32 = 0.9;
pub const WEAK_CONFIDENCE: f32 = 0.7;
pub const QUESTION_CONFIDENCE: f32 = 0.6;
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

const COMPLEX_MIN_WORDS: usize = 11;
const MODERATE_MIN_WORDS: usize = 6;
const ANALYTICAL_STEMS: [&str; 6] =
	["analy", "comprehensive", "compar", "trend", "pattern", "breakdown"];
const QUESTION_WORDS: [&str; 5] = ["what", "how", "when", "where", "why"];
const RECENT_WORDS: [&str; 9] =
	["today", "now", "recent", "recently", "latest", "current", "currently", "tonight", "yesterday"];
const RECENT_PHRASES: [&str; 2] = ["this week", "this month"];
const HISTORICAL_WORDS: [&str; 6] =
	["ago", "history", "historical", "past", "previously", "earlier"];
const HISTORICAL_PHRASES: [&str; 3] = ["last week", "last month", "last year"];
const WEEKDAYS: [&str; 7] =
	["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];
const MONTHS: [&str; 11] = [
	"january",
	"february",
	"march",
	"april",
	"june",
	"july",
	"august",
	"september",
	"october",
	"november",
	"december",
];

static DATE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"\b(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}/\d{1,2}(/\d{2,4})?|may \d{1,2})\b").ok()
});

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Count,
	List,
	Search,
	Analysis,
	Semantic,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
	Simple,
	Moderate,
	Complex,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalHint {
	Recent,
	Historical,
	SpecificDate,
	None,
}
impl TemporalHint {
	/// Hints that point at fine-grained, dated evidence.
	pub fn wants_detail(self) -> bool {
		matches!(self, Self::Recent | Self::SpecificDate)
	}
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct QueryClassification {
	pub intent: Intent,
	pub confidence: f32,
	pub complexity: Complexity,
	pub temporal_hint: TemporalHint,
}

pub fn classify(query: &str) -> QueryClassification {
	let words = text::words(query);
	let normalized = words.join(" ");
	let (intent, confidence) = intent(&normalized, &words, query);

	QueryClassification {
		intent,
		confidence,
		complexity: complexity(&words, query),
		temporal_hint: temporal_hint(&normalized, &words, query),
	}
}

pub fn has_analytical_vocabulary(words: &[String]) -> bool {
	words.iter().any(|word| ANALYTICAL_STEMS.iter().any(|stem| word.starts_with(stem)))
}

pub fn is_question(words: &[String], raw: &str) -> bool {
	raw.contains('?') || words.first().is_some_and(|word| QUESTION_WORDS.contains(&word.as_str()))
}

/// Whole-word phrase match over space-joined lowercase words.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
	format!(" {normalized} ").contains(&format!(" {phrase} "))
}

fn complexity(words: &[String], raw: &str) -> Complexity {
	if words.len() >= COMPLEX_MIN_WORDS || has_analytical_vocabulary(words) {
		Complexity::Complex
	} else if words.len() >= MODERATE_MIN_WORDS || is_question(words, raw) {
		Complexity::Moderate
	} else {
		Complexity::Simple
	}
}

fn temporal_hint(normalized: &str, words: &[String], raw: &str) -> TemporalHint {
	let has_word = |set: &[&str]| words.iter().any(|word| set.contains(&word.as_str()));
	let has_phrase = |set: &[&str]| set.iter().any(|phrase| contains_phrase(normalized, phrase));

	if has_word(&RECENT_WORDS) || has_phrase(&RECENT_PHRASES) {
		return TemporalHint::Recent;
	}
	if has_word(&WEEKDAYS)
		|| has_word(&MONTHS)
		|| DATE_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(&raw.to_lowercase()))
	{
		return TemporalHint::SpecificDate;
	}
	if has_word(&HISTORICAL_WORDS) || has_phrase(&HISTORICAL_PHRASES) {
		return TemporalHint::Historical;
	}

	TemporalHint::None
}

fn intent(normalized: &str, words: &[String], raw: &str) -> (Intent, f32) {
	let first = words.first().map(String::as_str).unwrap_or_default();
	let has_word = |word: &str| words.iter().any(|candidate| candidate == word);

	if first == "count"
		|| ["how many", "how much", "number of"]
			.iter()
			.any(|phrase| contains_phrase(normalized, phrase))
	{
		return (Intent::Count, STRONG_CONFIDENCE);
	}
	if has_word("count") || has_word("total") {
		return (Intent::Count, WEAK_CONFIDENCE);
	}
	if first == "list" || contains_phrase(normalized, "show me") {
		return (Intent::List, STRONG_CONFIDENCE);
	}
	if has_word("list") || has_word("which") {
		return (Intent::List, WEAK_CONFIDENCE);
	}
	if has_analytical_vocabulary(words) {
		return (Intent::Analysis, STRONG_CONFIDENCE);
	}
	if first == "find" || first == "search" {
		return (Intent::Search, STRONG_CONFIDENCE);
	}
	if has_word("find") || has_word("search") || has_word("where") {
		return (Intent::Search, WEAK_CONFIDENCE);
	}
	if is_question(words, raw) {
		return (Intent::Semantic, QUESTION_CONFIDENCE);
	}

	(Intent::Semantic, DEFAULT_CONFIDENCE)
}
