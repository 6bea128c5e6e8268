use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::level::ChunkLevel;

/// Local-hour bucket a session started in.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
	LateNight,
	Morning,
	Afternoon,
	Evening,
	Night,
}
impl TimeOfDay {
	pub const ALL: [Self; 5] =
		[Self::LateNight, Self::Morning, Self::Afternoon, Self::Evening, Self::Night];

	pub fn from_hour(hour: u8) -> Self {
		match hour {
			0..=4 => Self::LateNight,
			5..=11 => Self::Morning,
			12..=16 => Self::Afternoon,
			17..=20 => Self::Evening,
			_ => Self::Night,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::LateNight => "late_night",
			Self::Morning => "morning",
			Self::Afternoon => "afternoon",
			Self::Evening => "evening",
			Self::Night => "night",
		}
	}

	pub fn phrase(self) -> &'static str {
		match self {
			Self::LateNight => "late at night",
			Self::Morning => "in the morning",
			Self::Afternoon => "in the afternoon",
			Self::Evening => "in the evening",
			Self::Night => "at night",
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChunkEntities {
	pub owner_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub task_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub project_id: Option<String>,
	#[serde(default)]
	pub session_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChunkAnalytics {
	pub total_minutes: u32,
	pub session_count: u32,
	pub completion_ratio: f32,
	pub productivity_score: f32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dominant_time_of_day: Option<TimeOfDay>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Chunk {
	pub chunk_id: Uuid,
	pub owner_id: String,
	pub level: ChunkLevel,
	pub content: String,
	pub source_ids: Vec<String>,
	pub entities: ChunkEntities,
	pub analytics: ChunkAnalytics,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Vec<f32>>,
	pub content_hash: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl Chunk {
	pub fn from_draft(owner_id: &str, draft: ChunkDraft, now: OffsetDateTime) -> Self {
		let ChunkDraft { level, key, content, mut source_ids, mut entities, analytics } = draft;

		entities.owner_id = owner_id.to_string();

		source_ids.sort();
		source_ids.dedup();

		let content_hash = content_hash(&content);

		Self {
			chunk_id: chunk_id(owner_id, level, &key),
			owner_id: owner_id.to_string(),
			level,
			content,
			source_ids,
			entities,
			analytics,
			embedding: None,
			content_hash,
			created_at: now,
		}
	}
}

/// A chunk before it is stamped with its id, hash, and creation time.
#[derive(Clone, Debug)]
pub struct ChunkDraft {
	pub level: ChunkLevel,
	/// Source entity key: task id, project id, day, ISO week, or month.
	pub key: String,
	pub content: String,
	pub source_ids: Vec<String>,
	pub entities: ChunkEntities,
	pub analytics: ChunkAnalytics,
}

pub fn chunk_id(owner_id: &str, level: ChunkLevel, key: &str) -> Uuid {
	let name = format!("{owner_id}:{}:{key}", level.as_str());

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

pub fn content_hash(content: &str) -> String {
	blake3::hash(content.as_bytes()).to_hex().to_string()
}
