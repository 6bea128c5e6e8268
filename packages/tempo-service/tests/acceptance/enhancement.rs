use std::sync::atomic::Ordering;

use super::{OWNER, SpyCompletion, built_harness};
use tempo_domain::classify::{self, Complexity};
use tempo_service::{SearchRequest, SearchResponse, Technique};

const COMPARE_QUERY: &str = "Compare my two projects' productivity trends";

fn request(query: &str) -> SearchRequest {
	SearchRequest { owner_id: OWNER.to_string(), query: query.to_string() }
}

fn assert_hierarchy_order(response: &SearchResponse) {
	let priorities: Vec<u32> =
		response.results.iter().map(|doc| doc.priority_level.priority()).collect();

	assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn comparisons_are_decomposed_into_parallel_sub_searches() {
	let harness = built_harness(SpyCompletion::new()).await;
	let response =
		harness.service.search(request(COMPARE_QUERY)).await.expect("Failed to search.");

	assert_eq!(classify::classify(COMPARE_QUERY).complexity, Complexity::Complex);
	assert_eq!(response.technique_used, Technique::Decomposition);
	assert_eq!(response.sub_queries.len(), 2);
	assert_eq!(harness.completion.prompts_starting_with("Break the question"), 1);
	// One query embedding per sub-search; the original query is not searched on its own.
	assert_eq!(harness.embedding_calls.load(Ordering::SeqCst), 2);
	assert!(!response.results.is_empty());
	assert_hierarchy_order(&response);

	// Two equally weighted lists: a document ranked first in both scores 2 * 0.5 / 60.
	let bound = 1.0 / 60.0 + 1e-6;

	for doc in &response.results {
		let fused = doc.fusion_score.expect("Fused results carry a fusion score.");

		assert!(fused > 0.0 && fused <= bound, "fusion score {fused} out of bounds");
	}
}

#[tokio::test]
async fn analytical_queries_use_a_hypothetical_document() {
	let harness = built_harness(SpyCompletion::new()).await;
	let response = harness
		.service
		.search(request("Any patterns in my morning work?"))
		.await
		.expect("Failed to search.");

	assert_eq!(response.technique_used, Technique::Hyde);
	assert!(response.hypothetical_document.is_some());
	assert!(response.sub_queries.is_empty());
	assert_eq!(harness.embedding_calls.load(Ordering::SeqCst), 2);
	assert_hierarchy_order(&response);
}

#[tokio::test]
async fn low_confidence_queries_combine_both_expansions() {
	let harness = built_harness(SpyCompletion::new()).await;
	let response = harness.service.search(request("website")).await.expect("Failed to search.");

	assert_eq!(response.technique_used, Technique::Hybrid);
	assert!(response.hypothetical_document.is_some());
	assert_eq!(response.sub_queries.len(), 2);
	// Original, hypothetical document, and two sub-questions.
	assert_eq!(harness.embedding_calls.load(Ordering::SeqCst), 4);
	assert!(!response.results.is_empty());
	assert!(response.results.len() <= harness.service.cfg.search.enhancement.result_limit as usize);
	assert_hierarchy_order(&response);
}

#[tokio::test]
async fn disabled_enhancement_runs_the_plain_cascade() {
	let mut harness = built_harness(SpyCompletion::new()).await;

	harness.service.cfg.search.enhancement.enabled = false;

	let response =
		harness.service.search(request(COMPARE_QUERY)).await.expect("Failed to search.");

	assert_eq!(response.technique_used, Technique::Standard);
	assert_eq!(harness.completion.calls.load(Ordering::SeqCst), 0);
	assert_eq!(harness.embedding_calls.load(Ordering::SeqCst), 1);
}
