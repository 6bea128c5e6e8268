use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Granularity a chunk was generated at.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkLevel {
	TaskAggregate,
	ProjectSummary,
	TaskSessionSummary,
	DailySummary,
	WeeklySummary,
	MonthlySummary,
}
impl ChunkLevel {
	pub const ALL: [Self; 6] = [
		Self::TaskAggregate,
		Self::ProjectSummary,
		Self::TaskSessionSummary,
		Self::DailySummary,
		Self::WeeklySummary,
		Self::MonthlySummary,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::TaskAggregate => "task_aggregate",
			Self::ProjectSummary => "project_summary",
			Self::TaskSessionSummary => "task_session_summary",
			Self::DailySummary => "daily_summary",
			Self::WeeklySummary => "weekly_summary",
			Self::MonthlySummary => "monthly_summary",
		}
	}

	pub fn priority_level(self) -> PriorityLevel {
		match self {
			Self::MonthlySummary => PriorityLevel::MonthlySummary,
			Self::WeeklySummary => PriorityLevel::WeeklySummary,
			Self::TaskAggregate | Self::ProjectSummary | Self::TaskSessionSummary =>
				PriorityLevel::RelevantSources,
			Self::DailySummary => PriorityLevel::DailySummary,
		}
	}
}
impl fmt::Display for ChunkLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for ChunkLevel {
	type Err = UnknownLevel;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|level| level.as_str() == raw.trim())
			.ok_or_else(|| UnknownLevel(raw.to_string()))
	}
}

/// A tier of the search cascade. Lower priority values are searched first.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
	MonthlySummary,
	WeeklySummary,
	RelevantSources,
	DailySummary,
}
impl PriorityLevel {
	pub const CASCADE: [Self; 4] =
		[Self::MonthlySummary, Self::WeeklySummary, Self::RelevantSources, Self::DailySummary];
	pub const MAX_PRIORITY: u32 = 4;

	pub fn name(self) -> &'static str {
		match self {
			Self::MonthlySummary => "monthly_summary",
			Self::WeeklySummary => "weekly_summary",
			Self::RelevantSources => "relevant_sources",
			Self::DailySummary => "daily_summary",
		}
	}

	pub fn priority(self) -> u32 {
		match self {
			Self::MonthlySummary => 1,
			Self::WeeklySummary => 2,
			Self::RelevantSources => 3,
			Self::DailySummary => 4,
		}
	}

	pub fn content_types(self) -> &'static [ChunkLevel] {
		match self {
			Self::MonthlySummary => &[ChunkLevel::MonthlySummary],
			Self::WeeklySummary => &[ChunkLevel::WeeklySummary],
			Self::RelevantSources => &[
				ChunkLevel::TaskAggregate,
				ChunkLevel::ProjectSummary,
				ChunkLevel::TaskSessionSummary,
			],
			Self::DailySummary => &[ChunkLevel::DailySummary],
		}
	}

	/// Additive bonus that biases ties toward coarser context.
	pub fn priority_score(self, weight: f32) -> f32 {
		(Self::MAX_PRIORITY - self.priority()) as f32 * weight
	}
}
impl fmt::Display for PriorityLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);
impl fmt::Display for UnknownLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown chunk level {:?}.", self.0)
	}
}
impl std::error::Error for UnknownLevel {}
