use std::sync::Arc;

use super::{
	FailingCompletion, FailingEmbedding, KeywordEmbedding, MemoryStore, OWNER, SpyCompletion,
	harness, test_config,
};
use tempo_service::{
	AnswerRequest, Backends, Error, NO_EVIDENCE_ANSWER, Providers, SearchRequest, Technique,
	TempoService,
};

fn request(query: &str) -> AnswerRequest {
	AnswerRequest { owner_id: OWNER.to_string(), query: query.to_string(), history: Vec::new() }
}

async fn service_with(providers: Providers, store: MemoryStore) -> TempoService {
	let store = Arc::new(store);
	let service = TempoService::with_backends(
		test_config(),
		providers,
		Backends::new(store.clone(), store.clone()),
	);

	service.build_chunks(OWNER).await.expect("Failed to build chunks.");

	service
}

#[tokio::test]
async fn embedding_outage_falls_back_to_lexical_ranking() {
	let service = service_with(
		Providers::new(Arc::new(FailingEmbedding), Arc::new(SpyCompletion::new())),
		MemoryStore::with_fixture(),
	)
	.await;
	let response = service
		.search(SearchRequest {
			owner_id: OWNER.to_string(),
			query: "What did I finish today?".to_string(),
		})
		.await
		.expect("Failed to search.");

	assert!(!response.results.is_empty());
	assert!(response.results.iter().all(|doc| doc.similarity.is_none()));
	assert!(response.results.iter().all(|doc| doc.lexical_score.is_some()));
}

#[tokio::test]
async fn completion_outage_degrades_to_standard_search_and_an_evidence_summary() {
	let service = service_with(
		Providers::new(Arc::new(KeywordEmbedding::new()), Arc::new(FailingCompletion)),
		MemoryStore::with_fixture(),
	)
	.await;
	let response = service
		.answer_query(request("Compare my two projects' productivity trends"))
		.await
		.expect("Failed to answer.");

	assert_eq!(response.metadata.technique_used, Technique::Standard);
	assert!(!response.sources.is_empty());
	assert!(response.response_text.starts_with("Here is what your tracked activity shows:"));
	assert!(response.metadata.validation_score.is_some());
	assert!(!response.metadata.corrected);
}

#[tokio::test]
async fn search_backend_outage_yields_the_no_evidence_answer() {
	let store = MemoryStore { fail_searches: true, ..MemoryStore::with_fixture() };
	let service = service_with(
		Providers::new(Arc::new(KeywordEmbedding::new()), Arc::new(SpyCompletion::new())),
		store,
	)
	.await;
	let response =
		service.answer_query(request("What did I finish today?")).await.expect("Failed to answer.");

	assert_eq!(response.response_text, NO_EVIDENCE_ANSWER);
	assert!(response.sources.is_empty());
	assert_eq!(response.metadata.validation_score, None);
	assert_eq!(response.metadata.levels_searched.len(), 4);
}

#[tokio::test]
async fn an_owner_without_history_gets_the_no_evidence_answer() {
	let harness = harness(MemoryStore::default(), SpyCompletion::new());
	let response = harness
		.service
		.answer_query(request("What did I finish today?"))
		.await
		.expect("Failed to answer.");

	assert_eq!(response.response_text, NO_EVIDENCE_ANSWER);
	assert_eq!(response.metadata.retrieved_count, 0);
}

#[tokio::test]
async fn only_empty_owner_or_query_is_rejected() {
	let harness = harness(MemoryStore::with_fixture(), SpyCompletion::new());

	for (owner_id, query) in [("", "What did I finish today?"), (OWNER, "   ")] {
		let err = harness
			.service
			.answer_query(AnswerRequest {
				owner_id: owner_id.to_string(),
				query: query.to_string(),
				history: Vec::new(),
			})
			.await
			.expect_err("Expected an invalid request.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}
}
