//! Answer validation through the completion provider and a single self-correction pass.

use serde::{Deserialize, Serialize};

use crate::TempoService;
use tempo_domain::quality::{Severity, ValidationIssue, ValidationResult};

#[derive(Clone, Debug, Serialize)]
pub struct Correction {
	pub corrected_response: String,
	pub new_score: f32,
	pub validation: ValidationResult,
	/// False when the original answer was kept.
	pub applied: bool,
}
impl Correction {
	fn unchanged(response: &str, validation: &ValidationResult) -> Self {
		Self {
			corrected_response: response.to_string(),
			new_score: validation.overall_score,
			validation: validation.clone(),
			applied: false,
		}
	}
}

#[derive(Deserialize)]
struct RawValidation {
	#[serde(alias = "overall_score")]
	score: f32,
	#[serde(default)]
	issues: Vec<RawIssue>,
	#[serde(default)]
	corrections: Vec<String>,
}

#[derive(Deserialize)]
struct RawIssue {
	#[serde(rename = "type", alias = "kind", default)]
	kind: String,
	#[serde(default)]
	severity: String,
	#[serde(default)]
	description: String,
	#[serde(default)]
	suggestion: String,
}

impl TempoService {
	/// Scores `response` against `query` and the retrieved `context`. Never fails: an unavailable
	/// provider or unreadable output yields the configured fallback score.
	pub async fn validate_response(
		&self,
		query: &str,
		response: &str,
		context: &str,
	) -> ValidationResult {
		let cfg = &self.cfg.validation;

		match self.complete(&validation_prompt(query, response), Some(context), &[]).await {
			Ok(raw) => parse_validation(&raw, cfg.correction_threshold, cfg.fallback_score),
			Err(err) => {
				tracing::warn!(error = %err, "Validation failed. Using the fallback score.");

				ValidationResult::fallback(cfg.fallback_score)
			},
		}
	}

	/// Rewrites `response` once when its validation score is at or below the correction
	/// threshold, then validates the rewrite. The original answer is kept when the rewrite fails
	/// or scores lower.
	pub async fn self_correct(
		&self,
		query: &str,
		response: &str,
		context: &str,
		validation: &ValidationResult,
	) -> Correction {
		let threshold = self.cfg.validation.correction_threshold;

		if validation.fallback || validation.overall_score > threshold {
			return Correction::unchanged(response, validation);
		}

		let prompt = correction_prompt(query, response, validation);
		let rewrite = match self.complete(&prompt, Some(context), &[]).await {
			Ok(rewrite) if !rewrite.trim().is_empty() => rewrite.trim().to_string(),
			Ok(_) => {
				tracing::warn!("Correction returned an empty answer. Keeping the original.");

				return Correction::unchanged(response, validation);
			},
			Err(err) => {
				tracing::warn!(error = %err, "Correction failed. Keeping the original answer.");

				return Correction::unchanged(response, validation);
			},
		};
		let revalidated = self.validate_response(query, &rewrite, context).await;

		if revalidated.overall_score < validation.overall_score {
			tracing::info!(
				before = validation.overall_score,
				after = revalidated.overall_score,
				"Rewrite scored lower. Keeping the original answer."
			);

			return Correction::unchanged(response, validation);
		}

		Correction {
			corrected_response: rewrite,
			new_score: revalidated.overall_score,
			validation: revalidated,
			applied: true,
		}
	}
}

/// Reads a validator reply. JSON is tried first, then `SCORE:` / `ISSUE:` lines.
pub fn parse_validation(raw: &str, threshold: f32, fallback_score: f32) -> ValidationResult {
	if let Some(result) = parse_json(raw, threshold) {
		return result;
	}
	if let Some(result) = parse_lines(raw, threshold) {
		return result;
	}

	tracing::debug!("Validator output was not parseable.");

	ValidationResult::fallback(fallback_score)
}

pub fn validation_prompt(query: &str, response: &str) -> String {
	format!(
		"Rate how well the answer below responds to the question, using the activity context. \
		 Judge whether it answers directly, stays relevant and is complete. Reply in exactly this \
		 format:\nSCORE: <number between 0 and 1>\nISSUE: <type> | <low|medium|high> | \
		 <description> | <suggestion>\nWrite one ISSUE line per problem, or none.\n\nQuestion: \
		 {query}\n\nAnswer: {response}"
	)
}

pub fn correction_prompt(query: &str, response: &str, validation: &ValidationResult) -> String {
	let mut issues = String::new();

	for issue in &validation.issues {
		issues.push_str(&format!("- {}: {}", issue.kind, issue.description));

		if !issue.suggestion.is_empty() {
			issues.push_str(&format!(" ({})", issue.suggestion));
		}

		issues.push('\n');
	}

	if issues.is_empty() {
		issues.push_str("- The answer was rated as weak.\n");
	}

	format!(
		"Rewrite the answer below so it answers the question directly from the activity context. \
		 Fix these problems:\n{issues}\nQuestion: {query}\n\nAnswer: {response}\n\nReply with the \
		 improved answer only."
	)
}

fn parse_json(raw: &str, threshold: f32) -> Option<ValidationResult> {
	let start = raw.find('{')?;
	let end = raw.rfind('}')?;

	if end <= start {
		return None;
	}

	let parsed: RawValidation = serde_json::from_str(&raw[start..=end]).ok()?;
	let score = normalize_score(parsed.score)?;
	let issues: Vec<ValidationIssue> = parsed
		.issues
		.into_iter()
		.map(|issue| ValidationIssue {
			kind: if issue.kind.is_empty() { "general".to_string() } else { issue.kind },
			severity: Severity::parse(&issue.severity).unwrap_or(Severity::Medium),
			description: issue.description,
			suggestion: issue.suggestion,
		})
		.collect();
	let mut corrections = parsed.corrections;

	if corrections.is_empty() {
		corrections = suggestions(&issues);
	}

	Some(ValidationResult {
		is_valid: score > threshold,
		overall_score: score,
		issues,
		corrections,
		fallback: false,
	})
}

fn parse_lines(raw: &str, threshold: f32) -> Option<ValidationResult> {
	let mut score = None;
	let mut issues = Vec::new();

	for line in raw.lines().map(str::trim) {
		if let Some(value) = strip_label(line, "SCORE:") {
			if score.is_none() {
				score = value.trim().parse::<f32>().ok().and_then(normalize_score);
			}
		} else if let Some(value) = strip_label(line, "ISSUE:") {
			if let Some(issue) = parse_issue_line(value) {
				issues.push(issue);
			}
		}
	}

	let score = score?;
	let corrections = suggestions(&issues);

	Some(ValidationResult {
		is_valid: score > threshold,
		overall_score: score,
		issues,
		corrections,
		fallback: false,
	})
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
	let head = line.get(..label.len())?;

	head.eq_ignore_ascii_case(label).then(|| &line[label.len()..])
}

fn parse_issue_line(value: &str) -> Option<ValidationIssue> {
	let parts: Vec<&str> = value.split('|').map(str::trim).collect();

	if parts.len() < 3 || parts[0].is_empty() {
		return None;
	}

	Some(ValidationIssue {
		kind: parts[0].to_string(),
		severity: Severity::parse(parts[1]).unwrap_or(Severity::Medium),
		description: parts[2].to_string(),
		suggestion: parts.get(3).map(|part| part.to_string()).unwrap_or_default(),
	})
}

fn normalize_score(score: f32) -> Option<f32> {
	score.is_finite().then(|| score.clamp(0.0, 1.0))
}

fn suggestions(issues: &[ValidationIssue]) -> Vec<String> {
	issues
		.iter()
		.filter(|issue| !issue.suggestion.is_empty())
		.map(|issue| issue.suggestion.clone())
		.collect()
}
