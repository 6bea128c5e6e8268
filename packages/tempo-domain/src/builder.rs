//! Turns raw activity records into multi-granularity summary chunks.
//!
//! The builder is pure: it reads an owner's records and returns drafts stamped with the supplied
//! build time. Content never mentions the build time, so rebuilding unchanged input yields the
//! same ids and the same text.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset, Weekday};

use crate::{
	chunk::{Chunk, ChunkAnalytics, ChunkDraft, ChunkEntities, TimeOfDay},
	level::ChunkLevel,
	records::{ActivityRecords, Project, Task, WorkSession},
	text,
};
use tempo_config::Chunking;

const SESSION_COMPLETED_WEIGHT: f32 = 0.5;
const SESSION_SUBSTANTIAL_WEIGHT: f32 = 0.5;
const TASK_SESSION_WEIGHT: f32 = 0.5;
const TASK_COMPLETION_BONUS: f32 = 0.3;
const TASK_ON_ESTIMATE_BONUS: f32 = 0.2;
const PROJECT_COMPLETION_WEIGHT: f32 = 0.6;
const PROJECT_TASK_WEIGHT: f32 = 0.4;
const CONSISTENCY_BONUS: f32 = 0.1;
const CONSISTENCY_MIN_SESSIONS: usize = 3;
const PERIOD_COMPLETION_WEIGHT: f32 = 0.7;
const PERIOD_DURATION_WEIGHT: f32 = 0.3;
const MAX_LISTED_TASKS: usize = 8;
const MAX_LISTED_NOTES: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkippedCounts {
	pub sessions_missing_task: usize,
	pub tasks_missing_project: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
	pub owner_id: String,
	pub counts: BTreeMap<ChunkLevel, usize>,
	pub skipped: SkippedCounts,
	/// Filled in by the caller once the chunk set has been persisted.
	pub chunks_written: usize,
}
impl BuildReport {
	pub fn total(&self) -> usize {
		self.counts.values().sum()
	}
}

#[derive(Clone, Debug)]
pub struct BuildOutput {
	pub chunks: Vec<Chunk>,
	pub report: BuildReport,
}

pub fn build(
	owner_id: &str,
	records: &ActivityRecords,
	cfg: &Chunking,
	now: OffsetDateTime,
) -> BuildOutput {
	let offset = UtcOffset::from_whole_seconds(cfg.utc_offset_minutes.saturating_mul(60))
		.unwrap_or(UtcOffset::UTC);
	let mut report = BuildReport { owner_id: owner_id.to_string(), ..Default::default() };

	let mut tasks: Vec<&Task> = records.tasks.iter().collect();

	tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));

	let mut projects: Vec<&Project> = records.projects.iter().collect();

	projects.sort_by(|a, b| a.project_id.cmp(&b.project_id));

	let tasks_by_id: HashMap<&str, &Task> =
		tasks.iter().map(|task| (task.task_id.as_str(), *task)).collect();
	let projects_by_id: HashMap<&str, &Project> =
		projects.iter().map(|project| (project.project_id.as_str(), *project)).collect();

	let mut sessions: Vec<&WorkSession> = Vec::with_capacity(records.sessions.len());

	for session in &records.sessions {
		if tasks_by_id.contains_key(session.task_id.as_str()) {
			sessions.push(session);
		} else {
			report.skipped.sessions_missing_task += 1;

			tracing::debug!(
				session_id = %session.session_id,
				task_id = %session.task_id,
				"Skipping session whose task does not exist."
			);
		}
	}

	sessions.sort_by(|a, b| {
		a.started_at.cmp(&b.started_at).then_with(|| a.session_id.cmp(&b.session_id))
	});

	let mut sessions_by_task: HashMap<&str, Vec<&WorkSession>> = HashMap::new();

	for session in &sessions {
		sessions_by_task.entry(session.task_id.as_str()).or_default().push(session);
	}

	let mut drafts = Vec::new();
	let mut task_productivity: HashMap<&str, f32> = HashMap::new();

	for task in &tasks {
		let project = match task.project_id.as_deref() {
			Some(project_id) => {
				let project = projects_by_id.get(project_id).copied();

				if project.is_none() {
					report.skipped.tasks_missing_project += 1;

					tracing::debug!(
						task_id = %task.task_id,
						project_id,
						"Task references a missing project. Building without project linkage."
					);
				}

				project
			},
			None => None,
		};
		let task_sessions =
			sessions_by_task.get(task.task_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
		let (draft, productivity) = task_aggregate(task, project, task_sessions, cfg, offset);

		task_productivity.insert(task.task_id.as_str(), productivity);
		drafts.push(draft);
	}

	for project in &projects {
		let project_tasks: Vec<&Task> = tasks
			.iter()
			.copied()
			.filter(|task| task.project_id.as_deref() == Some(project.project_id.as_str()))
			.collect();

		drafts.push(project_summary(project, &project_tasks, &sessions_by_task, &task_productivity));
	}

	for task in &tasks {
		if let Some(task_sessions) = sessions_by_task.get(task.task_id.as_str()) {
			let project_id = task
				.project_id
				.as_deref()
				.filter(|project_id| projects_by_id.contains_key(project_id));

			drafts.push(task_session_summary(task, project_id, task_sessions, cfg, offset));
		}
	}

	for period in [Period::Day, Period::Week, Period::Month] {
		drafts.extend(temporal_summaries(period, &tasks, &sessions, &tasks_by_id, cfg, offset));
	}

	let chunks: Vec<Chunk> =
		drafts.into_iter().map(|draft| Chunk::from_draft(owner_id, draft, now)).collect();

	for chunk in &chunks {
		*report.counts.entry(chunk.level).or_default() += 1;
	}

	BuildOutput { chunks, report }
}

pub fn session_productivity(session: &WorkSession, cfg: &Chunking) -> f32 {
	let mut score = 0.0;

	if session.completed {
		score += SESSION_COMPLETED_WEIGHT;
	}
	if session.duration_minutes >= cfg.substantial_session_minutes {
		score += SESSION_SUBSTANTIAL_WEIGHT;
	}

	score
}

pub fn time_of_day(at: OffsetDateTime, offset: UtcOffset) -> TimeOfDay {
	TimeOfDay::from_hour(at.to_offset(offset).hour())
}

fn local_date(at: OffsetDateTime, offset: UtcOffset) -> Date {
	at.to_offset(offset).date()
}

fn clamp01(value: f32) -> f32 {
	value.clamp(0.0, 1.0)
}

fn mean(values: impl IntoIterator<Item = f32>) -> Option<f32> {
	let (sum, count) = values.into_iter().fold((0.0_f32, 0_u32), |(sum, n), v| (sum + v, n + 1));

	if count == 0 { None } else { Some(sum / count as f32) }
}

fn total_minutes(sessions: &[&WorkSession]) -> u32 {
	sessions.iter().map(|session| session.duration_minutes).sum()
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
	if count == 1 { format!("{count} {singular}") } else { format!("{count} {plural}") }
}

fn quoted_list(titles: &[&str]) -> String {
	let mut listed: Vec<String> =
		titles.iter().take(MAX_LISTED_TASKS).map(|title| format!("\"{title}\"")).collect();

	if titles.len() > MAX_LISTED_TASKS {
		listed.push(format!("and {} more", titles.len() - MAX_LISTED_TASKS));
	}

	listed.join(", ")
}

fn dominant_time_of_day(sessions: &[&WorkSession], offset: UtcOffset) -> Option<TimeOfDay> {
	let mut tally: HashMap<TimeOfDay, (usize, u32)> = HashMap::new();

	for session in sessions {
		let entry = tally.entry(time_of_day(session.started_at, offset)).or_default();

		entry.0 += 1;
		entry.1 += session.duration_minutes;
	}

	let mut best: Option<(TimeOfDay, (usize, u32))> = None;

	for bucket in TimeOfDay::ALL {
		let Some(&stats) = tally.get(&bucket) else {
			continue;
		};

		if best.is_none_or(|(_, best_stats)| stats > best_stats) {
			best = Some((bucket, stats));
		}
	}

	best.map(|(bucket, _)| bucket)
}

fn task_aggregate(
	task: &Task,
	project: Option<&Project>,
	sessions: &[&WorkSession],
	cfg: &Chunking,
	offset: UtcOffset,
) -> (ChunkDraft, f32) {
	let actual = total_minutes(sessions);
	let mean_session =
		mean(sessions.iter().map(|session| session_productivity(session, cfg))).unwrap_or(0.0);
	let on_estimate = task.estimated_minutes.is_some_and(|estimate| actual > 0 && actual <= estimate);
	let mut productivity = TASK_SESSION_WEIGHT * mean_session;

	if task.is_completed() {
		productivity += TASK_COMPLETION_BONUS;
	}
	if on_estimate {
		productivity += TASK_ON_ESTIMATE_BONUS;
	}

	let productivity = clamp01(productivity);
	let mut content = format!("Task \"{}\" is {}", task.title, task.status.label());

	if let Some(project) = project {
		content.push_str(&format!(" in project \"{}\"", project.name));
	}

	content.push_str(". ");

	if sessions.is_empty() {
		content.push_str("No work sessions logged yet.");

		if let Some(estimate) = task.estimated_minutes {
			content.push_str(&format!(" Estimated at {}.", text::format_minutes(estimate)));
		}
	} else {
		content.push_str(&format!(
			"Logged {} across {}",
			text::format_minutes(actual),
			plural(sessions.len(), "work session", "work sessions")
		));

		match task.estimated_minutes {
			Some(estimate) => content.push_str(&format!(
				" against an estimate of {} ({}).",
				text::format_minutes(estimate),
				if on_estimate { "within estimate" } else { "over estimate" }
			)),
			None => content.push('.'),
		}
	}

	if task.is_completed() {
		match task.completed_at {
			Some(at) => content.push_str(&format!(" Finished on {}.", local_date(at, offset))),
			None => content.push_str(" Finished."),
		}
	}

	content.push_str(&format!(" Productivity score {productivity:.2}."));

	let session_ids: Vec<String> =
		sessions.iter().map(|session| session.session_id.clone()).collect();
	let mut source_ids = vec![task.task_id.clone()];

	source_ids.extend(session_ids.iter().cloned());

	let draft = ChunkDraft {
		level: ChunkLevel::TaskAggregate,
		key: task.task_id.clone(),
		content,
		source_ids,
		entities: ChunkEntities {
			owner_id: task.owner_id.clone(),
			task_id: Some(task.task_id.clone()),
			project_id: project.map(|project| project.project_id.clone()),
			session_ids,
		},
		analytics: ChunkAnalytics {
			total_minutes: actual,
			session_count: sessions.len() as u32,
			completion_ratio: if task.is_completed() { 1.0 } else { 0.0 },
			productivity_score: productivity,
			dominant_time_of_day: dominant_time_of_day(sessions, offset),
		},
	};

	(draft, productivity)
}

fn project_summary(
	project: &Project,
	tasks: &[&Task],
	sessions_by_task: &HashMap<&str, Vec<&WorkSession>>,
	task_productivity: &HashMap<&str, f32>,
) -> ChunkDraft {
	let completed = tasks.iter().filter(|task| task.is_completed()).count();
	let completion_rate =
		if tasks.is_empty() { 0.0 } else { completed as f32 / tasks.len() as f32 };
	let sessions: Vec<&WorkSession> = tasks
		.iter()
		.filter_map(|task| sessions_by_task.get(task.task_id.as_str()))
		.flatten()
		.copied()
		.collect();
	let minutes = total_minutes(&sessions);
	let mean_task = mean(
		tasks
			.iter()
			.map(|task| task_productivity.get(task.task_id.as_str()).copied().unwrap_or(0.0)),
	)
	.unwrap_or(0.0);
	let productivity =
		clamp01(PROJECT_COMPLETION_WEIGHT * completion_rate + PROJECT_TASK_WEIGHT * mean_task);
	let mut content = format!("Project \"{}\"", project.name);

	if tasks.is_empty() {
		content.push_str(" has no tasks yet.");
	} else {
		content.push_str(&format!(
			": {completed} of {} completed ({:.0}% completion rate), {} logged across {}.",
			plural(tasks.len(), "task", "tasks"),
			completion_rate * 100.0,
			text::format_minutes(minutes),
			plural(sessions.len(), "work session", "work sessions"),
		));

		let mut listed: Vec<String> = tasks
			.iter()
			.take(MAX_LISTED_TASKS)
			.map(|task| format!("\"{}\" ({})", task.title, task.status.label()))
			.collect();

		if tasks.len() > MAX_LISTED_TASKS {
			listed.push(format!("and {} more", tasks.len() - MAX_LISTED_TASKS));
		}

		content.push_str(&format!(" Tasks: {}.", listed.join(", ")));
	}

	if let Some(description) =
		project.description.as_deref().map(str::trim).filter(|description| !description.is_empty())
	{
		content.push_str(&format!(" Description: {}.", description.trim_end_matches('.')));
	}

	content.push_str(&format!(" Productivity score {productivity:.2}."));

	let mut source_ids = vec![project.project_id.clone()];

	source_ids.extend(tasks.iter().map(|task| task.task_id.clone()));

	ChunkDraft {
		level: ChunkLevel::ProjectSummary,
		key: project.project_id.clone(),
		content,
		source_ids,
		entities: ChunkEntities {
			owner_id: project.owner_id.clone(),
			task_id: None,
			project_id: Some(project.project_id.clone()),
			session_ids: sessions.iter().map(|session| session.session_id.clone()).collect(),
		},
		analytics: ChunkAnalytics {
			total_minutes: minutes,
			session_count: sessions.len() as u32,
			completion_ratio: completion_rate,
			productivity_score: productivity,
			dominant_time_of_day: None,
		},
	}
}

fn task_session_summary(
	task: &Task,
	project_id: Option<&str>,
	sessions: &[&WorkSession],
	cfg: &Chunking,
	offset: UtcOffset,
) -> ChunkDraft {
	let minutes = total_minutes(sessions);
	let completed = sessions.iter().filter(|session| session.completed).count();
	let substantial = sessions
		.iter()
		.filter(|session| session.duration_minutes >= cfg.substantial_session_minutes)
		.count();
	let mut productivity =
		mean(sessions.iter().map(|session| session_productivity(session, cfg))).unwrap_or(0.0);

	if sessions.len() > CONSISTENCY_MIN_SESSIONS {
		productivity += CONSISTENCY_BONUS;
	}

	let productivity = clamp01(productivity);
	let dominant = dominant_time_of_day(sessions, offset);
	let first = sessions.first().map(|session| local_date(session.started_at, offset));
	let last = sessions.last().map(|session| local_date(session.started_at, offset));
	let mut content = format!(
		"Work sessions on task \"{}\": {} totalling {}",
		task.title,
		plural(sessions.len(), "session", "sessions"),
		text::format_minutes(minutes)
	);

	match (first, last) {
		(Some(first), Some(last)) if first == last => content.push_str(&format!(" on {first}")),
		(Some(first), Some(last)) => content.push_str(&format!(" between {first} and {last}")),
		_ => {},
	}
	if let Some(dominant) = dominant {
		content.push_str(&format!(", mostly {}", dominant.phrase()));
	}

	content.push_str(&format!(
		". {completed} of {} completed, {substantial} lasting {} or longer.",
		plural(sessions.len(), "session", "sessions"),
		text::format_minutes(cfg.substantial_session_minutes)
	));

	let notes: Vec<&str> = sessions
		.iter()
		.filter_map(|session| session.notes.as_deref())
		.map(str::trim)
		.filter(|note| !note.is_empty())
		.take(MAX_LISTED_NOTES)
		.collect();

	if !notes.is_empty() {
		content.push_str(&format!(" Notes: {}.", notes.join("; ")));
	}

	content.push_str(&format!(" Productivity score {productivity:.2}."));

	let session_ids: Vec<String> =
		sessions.iter().map(|session| session.session_id.clone()).collect();

	ChunkDraft {
		level: ChunkLevel::TaskSessionSummary,
		key: task.task_id.clone(),
		content,
		source_ids: session_ids.clone(),
		entities: ChunkEntities {
			owner_id: task.owner_id.clone(),
			task_id: Some(task.task_id.clone()),
			project_id: project_id.map(str::to_string),
			session_ids,
		},
		analytics: ChunkAnalytics {
			total_minutes: minutes,
			session_count: sessions.len() as u32,
			completion_ratio: completed as f32 / sessions.len().max(1) as f32,
			productivity_score: productivity,
			dominant_time_of_day: dominant,
		},
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Period {
	Day,
	Week,
	Month,
}
impl Period {
	fn level(self) -> ChunkLevel {
		match self {
			Self::Day => ChunkLevel::DailySummary,
			Self::Week => ChunkLevel::WeeklySummary,
			Self::Month => ChunkLevel::MonthlySummary,
		}
	}

	fn key(self, date: Date) -> String {
		match self {
			Self::Day => date.to_string(),
			Self::Week => {
				let (year, week, _) = date.to_iso_week_date();

				format!("{year}-W{week:02}")
			},
			Self::Month => format!("{}-{:02}", date.year(), u8::from(date.month())),
		}
	}

	fn title(self, date: Date) -> String {
		match self {
			Self::Day => format!("Daily summary for {}, {date}", date.weekday()),
			Self::Week => {
				let (year, week, _) = date.to_iso_week_date();
				let start = Date::from_iso_week_date(year, week, Weekday::Monday);
				let end = Date::from_iso_week_date(year, week, Weekday::Sunday);

				match (start, end) {
					(Ok(start), Ok(end)) =>
						format!("Weekly summary for week {week} of {year} ({start} to {end})"),
					_ => format!("Weekly summary for week {week} of {year}"),
				}
			},
			Self::Month => format!("Monthly summary for {} {}", date.month(), date.year()),
		}
	}
}

struct PeriodGroup<'a> {
	first_date: Date,
	sessions: Vec<&'a WorkSession>,
}

fn temporal_summaries(
	period: Period,
	tasks: &[&Task],
	sessions: &[&WorkSession],
	tasks_by_id: &HashMap<&str, &Task>,
	cfg: &Chunking,
	offset: UtcOffset,
) -> Vec<ChunkDraft> {
	let mut groups: BTreeMap<String, PeriodGroup<'_>> = BTreeMap::new();

	for session in sessions {
		let date = local_date(session.started_at, offset);

		groups
			.entry(period.key(date))
			.or_insert_with(|| PeriodGroup { first_date: date, sessions: Vec::new() })
			.sessions
			.push(session);
	}

	let mut finished: HashMap<String, Vec<&str>> = HashMap::new();

	for task in tasks.iter().filter(|task| task.is_completed()) {
		if let Some(at) = task.completed_at {
			finished
				.entry(period.key(local_date(at, offset)))
				.or_default()
				.push(task.title.as_str());
		}
	}

	groups
		.into_iter()
		.map(|(key, group)| {
			let finished = finished.get(&key).map(Vec::as_slice).unwrap_or(&[]);

			period_summary(period, key, &group, finished, tasks_by_id, cfg, offset)
		})
		.collect()
}

fn period_summary(
	period: Period,
	key: String,
	group: &PeriodGroup<'_>,
	finished: &[&str],
	tasks_by_id: &HashMap<&str, &Task>,
	cfg: &Chunking,
	offset: UtcOffset,
) -> ChunkDraft {
	let sessions = group.sessions.as_slice();
	let count = sessions.len();
	let minutes = total_minutes(sessions);
	let completed = sessions.iter().filter(|session| session.completed).count();
	let completion_rate = completed as f32 / count.max(1) as f32;
	let avg_minutes = minutes as f32 / count.max(1) as f32;
	let duration_factor = (avg_minutes / cfg.reference_session_minutes.max(1) as f32).min(1.0);
	let productivity = clamp01(
		PERIOD_COMPLETION_WEIGHT * completion_rate + PERIOD_DURATION_WEIGHT * duration_factor,
	);
	let dominant = dominant_time_of_day(sessions, offset);
	let mut per_task: BTreeMap<&str, u32> = BTreeMap::new();

	for session in sessions {
		*per_task.entry(session.task_id.as_str()).or_default() += session.duration_minutes;
	}

	let mut task_minutes: Vec<(&str, u32)> = per_task
		.into_iter()
		.filter_map(|(task_id, minutes)| {
			tasks_by_id.get(task_id).map(|task| (task.title.as_str(), minutes))
		})
		.collect();

	task_minutes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

	let listed: Vec<String> = task_minutes
		.iter()
		.take(MAX_LISTED_TASKS)
		.map(|(title, minutes)| format!("\"{title}\" ({})", text::format_minutes(*minutes)))
		.collect();
	let mut content = format!(
		"{}: {} totalling {} on {} ({}).",
		period.title(group.first_date),
		plural(count, "work session", "work sessions"),
		text::format_minutes(minutes),
		plural(task_minutes.len(), "task", "tasks"),
		listed.join(", ")
	);

	content.push_str(&format!(" {completed} of {} completed.", plural(count, "session", "sessions")));

	if !finished.is_empty() {
		content.push_str(&format!(" Tasks finished: {}.", quoted_list(finished)));
	}
	if let Some(dominant) = dominant {
		content.push_str(&format!(" Mostly active {}.", dominant.phrase()));
	}
	if period != Period::Day {
		if let Some((date, busiest)) = busiest_day(sessions, offset) {
			content.push_str(&format!(
				" Busiest day: {}, {date} ({}).",
				date.weekday(),
				text::format_minutes(busiest)
			));
		}
	}

	content.push_str(&format!(" Productivity score {productivity:.2}."));

	let session_ids: Vec<String> =
		sessions.iter().map(|session| session.session_id.clone()).collect();
	ChunkDraft {
		level: period.level(),
		key,
		content,
		source_ids: session_ids.clone(),
		entities: ChunkEntities { session_ids, ..Default::default() },
		analytics: ChunkAnalytics {
			total_minutes: minutes,
			session_count: count as u32,
			completion_ratio: completion_rate,
			productivity_score: productivity,
			dominant_time_of_day: dominant,
		},
	}
}

fn busiest_day(sessions: &[&WorkSession], offset: UtcOffset) -> Option<(Date, u32)> {
	let mut per_day: BTreeMap<Date, u32> = BTreeMap::new();

	for session in sessions {
		*per_day.entry(local_date(session.started_at, offset)).or_default() +=
			session.duration_minutes;
	}

	if per_day.len() < 2 {
		return None;
	}

	per_day.into_iter().fold(None, |best: Option<(Date, u32)>, (date, minutes)| match best {
		Some((_, best_minutes)) if best_minutes >= minutes => best,
		_ => Some((date, minutes)),
	})
}
