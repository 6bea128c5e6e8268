use time::{OffsetDateTime, macros::datetime};

use tempo_config::Chunking;
use tempo_domain::{
	builder::{self, BuildOutput},
	chunk::{Chunk, TimeOfDay},
	classify::{self, Complexity, Intent, TemporalHint},
	level::ChunkLevel,
	quality,
	records::{ActivityRecords, Project, Task, TaskStatus, WorkSession},
};

const OWNER: &str = "owner-1";

fn project(id: &str, name: &str) -> Project {
	Project {
		project_id: id.to_string(),
		owner_id: OWNER.to_string(),
		name: name.to_string(),
		description: None,
	}
}

fn task(
	id: &str,
	project_id: Option<&str>,
	title: &str,
	status: TaskStatus,
	estimated_minutes: Option<u32>,
	completed_at: Option<OffsetDateTime>,
) -> Task {
	Task {
		task_id: id.to_string(),
		owner_id: OWNER.to_string(),
		project_id: project_id.map(str::to_string),
		title: title.to_string(),
		status,
		estimated_minutes,
		completed_at,
		created_at: datetime!(2026-10-01 08:00 UTC),
	}
}

fn session(
	id: &str,
	task_id: &str,
	started_at: OffsetDateTime,
	duration_minutes: u32,
	completed: bool,
) -> WorkSession {
	WorkSession {
		session_id: id.to_string(),
		owner_id: OWNER.to_string(),
		task_id: task_id.to_string(),
		started_at,
		duration_minutes,
		completed,
		notes: None,
	}
}

fn records() -> ActivityRecords {
	ActivityRecords {
		projects: vec![project("p1", "Website"), project("p2", "Mobile App")],
		tasks: vec![
			task(
				"t1",
				Some("p1"),
				"Write launch report",
				TaskStatus::Completed,
				Some(60),
				Some(datetime!(2026-10-16 15:00 UTC)),
			),
			task("t2", Some("p1"), "Review pull requests", TaskStatus::InProgress, Some(30), None),
			task(
				"t3",
				Some("p2"),
				"Ship onboarding flow",
				TaskStatus::Completed,
				None,
				Some(datetime!(2026-10-15 18:00 UTC)),
			),
			task("t4", Some("missing"), "Orphaned task", TaskStatus::Todo, None, None),
		],
		sessions: vec![
			session("s1", "t1", datetime!(2026-10-16 09:00 UTC), 40, true),
			session("s2", "t1", datetime!(2026-10-16 14:00 UTC), 15, true),
			session("s3", "t2", datetime!(2026-10-15 20:00 UTC), 30, false),
			session("s4", "t3", datetime!(2026-10-15 10:00 UTC), 50, true),
			session("s5", "ghost", datetime!(2026-10-15 11:00 UTC), 20, true),
		],
	}
}

fn build_default() -> BuildOutput {
	builder::build(OWNER, &records(), &Chunking::default(), datetime!(2026-10-17 12:00 UTC))
}

fn find<'a>(chunks: &'a [Chunk], level: ChunkLevel, source: &str) -> &'a Chunk {
	chunks
		.iter()
		.find(|chunk| chunk.level == level && chunk.source_ids.iter().any(|id| id == source))
		.unwrap_or_else(|| panic!("Expected a {level} chunk with source {source}."))
}

#[test]
fn build_emits_every_level_and_counts_skips() {
	let output = build_default();
	let report = &output.report;

	assert_eq!(report.counts.get(&ChunkLevel::TaskAggregate), Some(&4));
	assert_eq!(report.counts.get(&ChunkLevel::ProjectSummary), Some(&2));
	assert_eq!(report.counts.get(&ChunkLevel::TaskSessionSummary), Some(&3));
	assert_eq!(report.counts.get(&ChunkLevel::DailySummary), Some(&2));
	assert_eq!(report.counts.get(&ChunkLevel::WeeklySummary), Some(&1));
	assert_eq!(report.counts.get(&ChunkLevel::MonthlySummary), Some(&1));
	assert_eq!(report.total(), output.chunks.len());
	assert_eq!(report.skipped.sessions_missing_task, 1);
	assert_eq!(report.skipped.tasks_missing_project, 1);
	assert!(output.chunks.iter().all(|chunk| !chunk.source_ids.contains(&"s5".to_string())));
}

#[test]
fn rebuild_is_idempotent_across_build_times() {
	let first = build_default();
	let second =
		builder::build(OWNER, &records(), &Chunking::default(), datetime!(2027-01-01 00:00 UTC));

	let first_pairs: Vec<_> =
		first.chunks.iter().map(|chunk| (chunk.chunk_id, chunk.content.clone())).collect();
	let second_pairs: Vec<_> =
		second.chunks.iter().map(|chunk| (chunk.chunk_id, chunk.content.clone())).collect();

	assert_eq!(first_pairs, second_pairs);
	assert!(first.chunks.iter().all(|chunk| !chunk.content.contains("2026-10-17")));
}

#[test]
fn chunk_ids_are_unique_and_hashes_match_content() {
	let output = build_default();
	let mut ids: Vec<_> = output.chunks.iter().map(|chunk| chunk.chunk_id).collect();

	ids.sort();
	ids.dedup();

	assert_eq!(ids.len(), output.chunks.len());

	for chunk in &output.chunks {
		assert_eq!(chunk.content_hash, blake3::hash(chunk.content.as_bytes()).to_hex().to_string());
		assert_eq!(chunk.owner_id, OWNER);
		assert_eq!(chunk.entities.owner_id, OWNER);
		assert!(chunk.embedding.is_none());

		let mut sorted = chunk.source_ids.clone();

		sorted.sort();
		sorted.dedup();

		assert_eq!(sorted, chunk.source_ids);
	}
}

#[test]
fn task_aggregate_blends_sessions_completion_and_estimate() {
	let output = build_default();
	let chunk = find(&output.chunks, ChunkLevel::TaskAggregate, "t1");

	// Sessions score 1.0 and 0.5, so 0.5 * 0.75 + 0.3 + 0.2.
	assert!((chunk.analytics.productivity_score - 0.875).abs() < 1e-6);
	assert_eq!(chunk.analytics.total_minutes, 55);
	assert_eq!(chunk.analytics.session_count, 2);
	assert_eq!(chunk.entities.project_id.as_deref(), Some("p1"));
	assert!(chunk.content.contains("Write launch report"));
	assert!(chunk.content.contains("within estimate"));
	assert!(chunk.content.contains("Finished on 2026-10-16"));
}

#[test]
fn task_with_missing_project_keeps_building_without_linkage() {
	let output = build_default();
	let chunk = find(&output.chunks, ChunkLevel::TaskAggregate, "t4");

	assert_eq!(chunk.entities.project_id, None);
	assert_eq!(chunk.analytics.productivity_score, 0.0);
	assert!(chunk.content.contains("No work sessions logged yet."));
}

#[test]
fn project_summary_weights_completion_and_task_productivity() {
	let output = build_default();
	let chunk = find(&output.chunks, ChunkLevel::ProjectSummary, "p1");
	// t1 scores 0.875; t2 has one incomplete 30 minute session within estimate, so 0.25 + 0.2.
	let expected = 0.6 * 0.5 + 0.4 * ((0.875 + 0.45) / 2.0);

	assert!((chunk.analytics.productivity_score - expected).abs() < 1e-6);
	assert!((chunk.analytics.completion_ratio - 0.5).abs() < 1e-6);
	assert_eq!(chunk.analytics.total_minutes, 85);
	assert!(chunk.content.contains("1 of 2 tasks completed"));
}

#[test]
fn session_summary_uses_dominant_local_time_of_day() {
	let output = build_default();
	let chunk = find(&output.chunks, ChunkLevel::TaskSessionSummary, "s1");

	// One morning and one afternoon session; the longer morning session wins the tie.
	assert_eq!(chunk.analytics.dominant_time_of_day, Some(TimeOfDay::Morning));
	assert!((chunk.analytics.productivity_score - 0.75).abs() < 1e-6);
}

#[test]
fn utc_offset_moves_sessions_across_days_and_buckets() {
	let cfg = Chunking { utc_offset_minutes: -600, ..Default::default() };
	let output = builder::build(OWNER, &records(), &cfg, datetime!(2026-10-17 12:00 UTC));
	let chunk = find(&output.chunks, ChunkLevel::DailySummary, "s1");

	assert!(chunk.content.contains("2026-10-15"));
	assert!(chunk.source_ids.contains(&"s4".to_string()));
	assert_eq!(
		builder::time_of_day(datetime!(2026-10-16 09:00 UTC), time::UtcOffset::UTC),
		TimeOfDay::Morning
	);
}

#[test]
fn daily_summary_lists_finished_tasks_and_scores_the_period() {
	let output = build_default();
	let chunk = find(&output.chunks, ChunkLevel::DailySummary, "s1");

	assert_eq!(chunk.source_ids, vec!["s1".to_string(), "s2".to_string()]);
	assert!(chunk.content.contains("Friday, 2026-10-16"));
	assert!(chunk.content.contains("Tasks finished: \"Write launch report\""));

	// Both sessions completed; average 27.5 of 30 minutes.
	let expected = 0.7 * 1.0 + 0.3 * (27.5 / 30.0);

	assert!((chunk.analytics.productivity_score - expected).abs() < 1e-6);
}

#[test]
fn weekly_and_monthly_summaries_cover_all_valid_sessions() {
	let output = build_default();
	let weekly = find(&output.chunks, ChunkLevel::WeeklySummary, "s1");
	let monthly = find(&output.chunks, ChunkLevel::MonthlySummary, "s1");

	for chunk in [weekly, monthly] {
		assert_eq!(chunk.analytics.session_count, 4);
		assert_eq!(chunk.analytics.total_minutes, 135);
		assert!(chunk.content.contains("Busiest day"));
	}

	assert!(weekly.content.contains("week 42 of 2026"));
	assert!(monthly.content.contains("October 2026"));
}

#[test]
fn classifies_recent_completion_question() {
	let classification = classify::classify("What did I finish today?");

	assert_eq!(classification.complexity, Complexity::Moderate);
	assert_eq!(classification.temporal_hint, TemporalHint::Recent);
	assert_eq!(classification.intent, Intent::Semantic);
	assert!((classification.confidence - 0.6).abs() < 1e-6);
}

#[test]
fn classifies_comparison_as_complex_analysis() {
	let classification = classify::classify("Compare my two projects' productivity trends");

	assert_eq!(classification.complexity, Complexity::Complex);
	assert_eq!(classification.intent, Intent::Analysis);
	assert!((classification.confidence - 0.9).abs() < 1e-6);
	assert_eq!(classification.temporal_hint, TemporalHint::None);
}

#[test]
fn classifies_intents_and_temporal_hints() {
	let count = classify::classify("How many tasks did I complete last month?");

	assert_eq!(count.intent, Intent::Count);
	assert_eq!(count.temporal_hint, TemporalHint::Historical);
	assert_eq!(count.complexity, Complexity::Moderate);

	let list = classify::classify("list tasks");

	assert_eq!(list.intent, Intent::List);
	assert_eq!(list.complexity, Complexity::Simple);

	let search = classify::classify("find the api bug");

	assert_eq!(search.intent, Intent::Search);
	assert_eq!(search.temporal_hint, TemporalHint::None);

	let dated = classify::classify("show me sessions on friday");

	assert_eq!(dated.intent, Intent::List);
	assert_eq!(dated.temporal_hint, TemporalHint::SpecificDate);

	let explicit = classify::classify("sessions 2026-10-16");

	assert_eq!(explicit.temporal_hint, TemporalHint::SpecificDate);

	let plain = classify::classify("focus blocks");

	assert_eq!(plain.intent, Intent::Semantic);
	assert!((plain.confidence - 0.5).abs() < 1e-6);
}

#[test]
fn long_queries_are_complex() {
	let classification = classify::classify(
		"tell me about every single thing that happened with the website redesign work",
	);

	assert_eq!(classification.complexity, Complexity::Complex);
}

#[test]
fn quick_check_accepts_grounded_answer() {
	let check = quality::quick_check(
		"What did I finish today?",
		"Today you finished the launch report and reviewed two pull requests in the morning.",
	);

	assert_eq!(check.score, 1.0);
	assert!(check.issues.is_empty());
}

#[test]
fn quick_check_penalizes_short_refusals() {
	let check = quality::quick_check("What did I finish today?", "I don't have that information.");

	assert!((check.score - 0.1).abs() < 1e-6);

	let kinds: Vec<&str> = check.issues.iter().map(|issue| issue.kind.as_str()).collect();

	assert_eq!(kinds, vec!["too_short", "generic_refusal", "low_relevance"]);
}

#[test]
fn session_summary_adds_consistency_bonus_beyond_three_sessions() {
	let records_with = |count: usize| ActivityRecords {
		projects: vec![project("p1", "Website")],
		tasks: vec![task("t1", Some("p1"), "Triage bugs", TaskStatus::InProgress, None, None)],
		sessions: (0..count)
			.map(|day| {
				let started_at = datetime!(2026-10-12 09:00 UTC) + time::Duration::days(day as i64);

				session(&format!("x{day}"), "t1", started_at, 10, true)
			})
			.collect(),
	};
	let productivity = |count: usize| {
		let output = builder::build(
			OWNER,
			&records_with(count),
			&Chunking::default(),
			datetime!(2026-10-17 12:00 UTC),
		);

		find(&output.chunks, ChunkLevel::TaskSessionSummary, "x0").analytics.productivity_score
	};

	// Short completed sessions score 0.5 each.
	assert!((productivity(3) - 0.5).abs() < 1e-6);
	assert!((productivity(4) - 0.6).abs() < 1e-6);
}

#[test]
fn quick_check_penalizes_overlong_answers() {
	let answer = "Today you finished the launch report for the website. ".repeat(40);
	let check = quality::quick_check("What did I finish today?", &answer);
	let kinds: Vec<&str> = check.issues.iter().map(|issue| issue.kind.as_str()).collect();

	assert!(answer.chars().count() > 2_000);
	assert!(kinds.contains(&"too_long"));
	assert!(check.score <= 0.8 + 1e-6);
}
