use super::{MemoryStore, OWNER, SpyCompletion, built_harness, harness};
use tempo_domain::level::ChunkLevel;
use tempo_service::{CleanupLevelRequest, Error};

#[tokio::test]
async fn rebuild_is_idempotent_and_reports_skips() {
	let harness = built_harness(SpyCompletion::new()).await;
	let mut first: Vec<_> =
		harness.store.stored().into_iter().map(|chunk| (chunk.chunk_id, chunk.content)).collect();
	let report = harness.service.build_chunks(OWNER).await.expect("Failed to rebuild chunks.");
	let mut second: Vec<_> =
		harness.store.stored().into_iter().map(|chunk| (chunk.chunk_id, chunk.content)).collect();

	first.sort();
	second.sort();

	assert_eq!(first, second);
	assert_eq!(report.chunks_written, 13);
	assert_eq!(report.total(), 13);
	assert_eq!(report.counts.get(&ChunkLevel::TaskAggregate), Some(&4));
	assert_eq!(report.counts.get(&ChunkLevel::DailySummary), Some(&2));
	assert_eq!(report.skipped.sessions_missing_task, 1);
	assert_eq!(report.skipped.tasks_missing_project, 1);
}

#[tokio::test]
async fn rebuild_only_touches_the_requested_owner() {
	let harness = built_harness(SpyCompletion::new()).await;
	let before = harness.store.stored().len();
	let report = harness.service.build_chunks("someone-else").await.expect("Failed to rebuild.");

	assert_eq!(report.chunks_written, 0);
	assert_eq!(harness.store.stored().len(), before);
}

#[tokio::test]
async fn cleanup_level_removes_only_that_level() {
	let harness = built_harness(SpyCompletion::new()).await;
	let response = harness
		.service
		.cleanup_level(CleanupLevelRequest {
			owner_id: OWNER.to_string(),
			level: ChunkLevel::DailySummary,
		})
		.await
		.expect("Failed to clean up level.");
	let stored = harness.store.stored();

	assert_eq!(response.deleted, 2);
	assert_eq!(stored.len(), 11);
	assert!(stored.iter().all(|chunk| chunk.level != ChunkLevel::DailySummary));
}

#[tokio::test]
async fn rebuild_rejects_an_empty_owner() {
	let harness = harness(MemoryStore::with_fixture(), SpyCompletion::new());
	let err = harness.service.build_chunks("  ").await.expect_err("Expected an invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn stalled_chunk_writes_time_out() {
	let store = MemoryStore { stall_writes: true, ..MemoryStore::with_fixture() };
	let mut harness = harness(store, SpyCompletion::new());

	harness.service.cfg.storage.postgres.statement_timeout_ms = 20;

	let err = harness.service.build_chunks(OWNER).await.expect_err("Expected a timeout.");

	assert!(matches!(err, Error::Timeout { .. }));
	assert!(harness.store.stored().is_empty());
}
