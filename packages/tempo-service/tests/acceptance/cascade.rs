use super::{MemoryStore, SpyCompletion, built_harness, harness, synthetic_chunk, OWNER};
use tempo_domain::{
	classify,
	level::{ChunkLevel, PriorityLevel},
};

fn layered_store() -> MemoryStore {
	let mut chunks = Vec::new();

	for idx in 0..3 {
		chunks.push(synthetic_chunk(
			ChunkLevel::MonthlySummary,
			&format!("m{idx}"),
			&format!("Monthly website summary {idx}"),
		));
		chunks.push(synthetic_chunk(
			ChunkLevel::WeeklySummary,
			&format!("w{idx}"),
			&format!("Weekly website summary {idx}"),
		));
		chunks.push(synthetic_chunk(
			ChunkLevel::DailySummary,
			&format!("d{idx}"),
			&format!("Daily website summary {idx}"),
		));
	}
	for idx in 0..6 {
		chunks.push(synthetic_chunk(
			ChunkLevel::TaskAggregate,
			&format!("t{idx}"),
			&format!("Task website notes {idx}"),
		));
	}

	MemoryStore::with_chunks(chunks)
}

fn is_cascade_prefix(levels: &[PriorityLevel]) -> bool {
	!levels.is_empty() && levels == &PriorityLevel::CASCADE[..levels.len()]
}

#[tokio::test]
async fn simple_queries_stop_once_relevant_sources_suffice() {
	let harness = harness(layered_store(), SpyCompletion::new());
	let result = harness
		.service
		.cascade_search(OWNER, "website", &classify::classify("website"))
		.await;

	assert_eq!(result.levels_searched, PriorityLevel::CASCADE[..3].to_vec());
	assert!(result.docs.iter().all(|doc| doc.level != ChunkLevel::DailySummary));
	assert_eq!(result.docs.len(), 12);
}

#[tokio::test]
async fn complex_and_recent_queries_reach_the_daily_level() {
	let harness = harness(layered_store(), SpyCompletion::new());

	for query in ["website breakdown", "website today"] {
		let result =
			harness.service.cascade_search(OWNER, query, &classify::classify(query)).await;

		assert_eq!(result.levels_searched, PriorityLevel::CASCADE.to_vec(), "query: {query}");
		assert!(result.docs.iter().any(|doc| doc.level == ChunkLevel::DailySummary));
	}
}

#[tokio::test]
async fn levels_searched_is_always_a_prefix_and_results_keep_hierarchy_order() {
	let harness = built_harness(SpyCompletion::new()).await;

	for query in [
		"website",
		"What did I finish today?",
		"How many sessions did the mobile project take?",
		"Give me a breakdown of my review work",
		"nothing matches this",
	] {
		let result =
			harness.service.cascade_search(OWNER, query, &classify::classify(query)).await;
		let priorities: Vec<u32> =
			result.docs.iter().map(|doc| doc.priority_level.priority()).collect();

		assert!(is_cascade_prefix(&result.levels_searched), "query: {query}");
		assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]), "query: {query}");
		assert!(
			result.docs.iter().enumerate().all(|(idx, doc)| doc.rank == idx + 1),
			"query: {query}"
		);
	}
}
