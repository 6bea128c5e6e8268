use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};
use tempo_domain::{
	chunk::Chunk,
	level::ChunkLevel,
	records::{Project, Task, TaskStatus, WorkSession},
};

#[derive(Debug, sqlx::FromRow)]
pub struct ChunkRow {
	pub chunk_id: Uuid,
	pub owner_id: String,
	pub level: String,
	pub content: String,
	pub source_ids: Value,
	pub entities: Value,
	pub analytics: Value,
	pub content_hash: String,
	pub created_at: OffsetDateTime,
}
impl TryFrom<ChunkRow> for Chunk {
	type Error = Error;

	fn try_from(row: ChunkRow) -> Result<Self> {
		let level: ChunkLevel =
			row.level.parse().map_err(|err| Error::InvalidArgument(format!("{err}")))?;

		Ok(Self {
			chunk_id: row.chunk_id,
			owner_id: row.owner_id,
			level,
			content: row.content,
			source_ids: serde_json::from_value(row.source_ids)?,
			entities: serde_json::from_value(row.entities)?,
			analytics: serde_json::from_value(row.analytics)?,
			embedding: None,
			content_hash: row.content_hash,
			created_at: row.created_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScoredChunkRow {
	#[sqlx(flatten)]
	pub chunk: ChunkRow,
	pub score: f64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PendingChunk {
	pub chunk_id: Uuid,
	pub content: String,
	pub content_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProjectRow {
	pub project_id: String,
	pub owner_id: String,
	pub name: String,
	pub description: Option<String>,
}
impl From<ProjectRow> for Project {
	fn from(row: ProjectRow) -> Self {
		Self {
			project_id: row.project_id,
			owner_id: row.owner_id,
			name: row.name,
			description: row.description,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct TaskRow {
	pub task_id: String,
	pub owner_id: String,
	pub project_id: Option<String>,
	pub title: String,
	pub status: String,
	pub estimated_minutes: Option<i32>,
	pub completed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
}
impl TryFrom<TaskRow> for Task {
	type Error = Error;

	fn try_from(row: TaskRow) -> Result<Self> {
		let status = TaskStatus::parse(&row.status).ok_or_else(|| {
			Error::InvalidArgument(format!("Task {} has unknown status {:?}.", row.task_id, row.status))
		})?;

		Ok(Self {
			task_id: row.task_id,
			owner_id: row.owner_id,
			project_id: row.project_id,
			title: row.title,
			status,
			estimated_minutes: row.estimated_minutes.and_then(|minutes| u32::try_from(minutes).ok()),
			completed_at: row.completed_at,
			created_at: row.created_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionRow {
	pub session_id: String,
	pub owner_id: String,
	pub task_id: String,
	pub started_at: OffsetDateTime,
	pub duration_minutes: i32,
	pub completed: bool,
	pub notes: Option<String>,
}
impl TryFrom<SessionRow> for WorkSession {
	type Error = Error;

	fn try_from(row: SessionRow) -> Result<Self> {
		let duration_minutes = u32::try_from(row.duration_minutes).map_err(|_| {
			Error::InvalidArgument(format!(
				"Session {} has negative duration {}.",
				row.session_id, row.duration_minutes
			))
		})?;

		Ok(Self {
			session_id: row.session_id,
			owner_id: row.owner_id,
			task_id: row.task_id,
			started_at: row.started_at,
			duration_minutes,
			completed: row.completed,
			notes: row.notes,
		})
	}
}
