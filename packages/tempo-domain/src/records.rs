use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
	Todo,
	InProgress,
	Completed,
	Cancelled,
}
impl TaskStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Todo => "todo",
			Self::InProgress => "in_progress",
			Self::Completed => "completed",
			Self::Cancelled => "cancelled",
		}
	}

	/// Lenient parse for values coming from the record store.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
			"todo" | "pending" | "open" => Some(Self::Todo),
			"in_progress" | "active" | "started" => Some(Self::InProgress),
			"completed" | "complete" | "done" => Some(Self::Completed),
			"cancelled" | "canceled" => Some(Self::Cancelled),
			_ => None,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Todo => "to do",
			Self::InProgress => "in progress",
			Self::Completed => "completed",
			Self::Cancelled => "cancelled",
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Project {
	pub project_id: String,
	pub owner_id: String,
	pub name: String,
	pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Task {
	pub task_id: String,
	pub owner_id: String,
	pub project_id: Option<String>,
	pub title: String,
	pub status: TaskStatus,
	pub estimated_minutes: Option<u32>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl Task {
	pub fn is_completed(&self) -> bool {
		self.status == TaskStatus::Completed
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WorkSession {
	pub session_id: String,
	pub owner_id: String,
	pub task_id: String,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	pub duration_minutes: u32,
	pub completed: bool,
	pub notes: Option<String>,
}

/// Everything the chunk builder reads for one owner.
#[derive(Clone, Debug, Default)]
pub struct ActivityRecords {
	pub projects: Vec<Project>,
	pub tasks: Vec<Task>,
	pub sessions: Vec<WorkSession>,
}
