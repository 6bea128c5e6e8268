use std::collections::HashSet;

use super::{OWNER, SpyCompletion, TODAY_SESSIONS, built_harness};
use tempo_domain::{
	classify::{Complexity, TemporalHint},
	level::{ChunkLevel, PriorityLevel},
};
use tempo_service::{AnswerRequest, Technique};

fn request(query: &str) -> AnswerRequest {
	AnswerRequest { owner_id: OWNER.to_string(), query: query.to_string(), history: Vec::new() }
}

#[tokio::test]
async fn what_did_i_finish_today_is_answered_from_todays_daily_summary() {
	let completion = SpyCompletion::new();
	let expected_answer = completion.answer.clone();
	let harness = built_harness(completion).await;
	let response = harness
		.service
		.answer_query(request("What did I finish today?"))
		.await
		.expect("Failed to answer.");
	let metadata = &response.metadata;

	assert_eq!(metadata.classification.complexity, Complexity::Moderate);
	assert_eq!(metadata.classification.temporal_hint, TemporalHint::Recent);
	assert_eq!(metadata.technique_used, Technique::Standard);
	assert_eq!(metadata.levels_searched.last(), Some(&PriorityLevel::DailySummary));
	assert_eq!(metadata.retrieved_count, response.sources.len());
	assert_eq!(metadata.validation_score, Some(0.9));
	assert!(!metadata.corrected);
	assert_eq!(response.response_text, expected_answer);

	let today: HashSet<&str> = TODAY_SESSIONS.into_iter().collect();

	assert!(response.sources.iter().any(|source| {
		source.level == ChunkLevel::DailySummary
			&& source.source_ids.iter().any(|id| today.contains(id.as_str()))
	}));

	let priorities: Vec<u32> =
		response.sources.iter().map(|source| source.priority_level.priority()).collect();

	assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn weak_answers_are_corrected_once() {
	let completion = SpyCompletion::new().with_validations(&[
		"SCORE: 0.4\nISSUE: incomplete | high | Misses the durations. | Mention the minutes.",
		"SCORE: 0.85",
	]);
	let expected_rewrite = completion.rewrite.clone();
	let harness = built_harness(completion).await;
	let response = harness
		.service
		.answer_query(request("What did I finish today?"))
		.await
		.expect("Failed to answer.");

	assert!(response.metadata.corrected);
	assert_eq!(response.metadata.validation_score, Some(0.85));
	assert_eq!(response.response_text, expected_rewrite);
	assert_eq!(harness.completion.prompts_starting_with("Rewrite the answer"), 1);
	assert_eq!(harness.completion.prompts_starting_with("Rate how well"), 2);
}

#[tokio::test]
async fn a_rewrite_that_scores_lower_is_discarded() {
	let completion = SpyCompletion::new().with_validations(&["SCORE: 0.6", "SCORE: 0.3"]);
	let expected_answer = completion.answer.clone();
	let harness = built_harness(completion).await;
	let response = harness
		.service
		.answer_query(request("What did I finish today?"))
		.await
		.expect("Failed to answer.");

	assert!(!response.metadata.corrected);
	assert_eq!(response.metadata.validation_score, Some(0.6));
	assert_eq!(response.response_text, expected_answer);
	assert_eq!(harness.completion.prompts_starting_with("Rewrite the answer"), 1);
}

#[tokio::test]
async fn unreadable_validation_keeps_the_answer_without_correction() {
	let completion = SpyCompletion::new().with_validations(&["Looks good!"]);
	let harness = built_harness(completion).await;
	let response = harness
		.service
		.answer_query(request("What did I finish today?"))
		.await
		.expect("Failed to answer.");

	assert!(!response.metadata.corrected);
	assert_eq!(response.metadata.validation_score, Some(0.7));
	assert_eq!(harness.completion.prompts_starting_with("Rewrite the answer"), 0);
}
