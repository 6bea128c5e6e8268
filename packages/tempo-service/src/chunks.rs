//! Chunk set maintenance: full rebuilds and removal of deprecated levels.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result, TempoService, with_timeout};
use tempo_domain::{
	builder::{self, BuildReport},
	level::ChunkLevel,
	records::ActivityRecords,
};

#[derive(Clone, Debug, Deserialize)]
pub struct RebuildChunksRequest {
	pub owner_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CleanupLevelRequest {
	pub owner_id: String,
	pub level: ChunkLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct CleanupLevelResponse {
	pub owner_id: String,
	pub level: ChunkLevel,
	pub deleted: u64,
}

impl TempoService {
	/// Regenerates every chunk level for the owner and swaps the stored set in one transaction.
	pub async fn build_chunks(&self, owner_id: &str) -> Result<BuildReport> {
		let owner_id = require_owner(owner_id)?;
		let timeout = self.storage_timeout();
		let records = &self.backends.records;
		let (projects, tasks, sessions) = tokio::try_join!(
			async {
				Ok::<_, Error>(
					with_timeout(timeout, "list projects", records.list_projects(owner_id)).await??,
				)
			},
			async {
				Ok::<_, Error>(with_timeout(timeout, "list tasks", records.list_tasks(owner_id)).await??)
			},
			async {
				Ok::<_, Error>(
					with_timeout(timeout, "list sessions", records.list_sessions(owner_id)).await??,
				)
			},
		)?;
		let records = ActivityRecords { projects, tasks, sessions };
		let output =
			builder::build(owner_id, &records, &self.cfg.chunking, OffsetDateTime::now_utc());
		let written = with_timeout(
			timeout,
			"replace chunks",
			self.backends.chunks.replace_chunks(owner_id, &ChunkLevel::ALL, &output.chunks),
		)
		.await??;
		let mut report = output.report;

		report.chunks_written = written as usize;

		tracing::info!(
			owner_id,
			chunks = report.chunks_written,
			sessions_missing_task = report.skipped.sessions_missing_task,
			tasks_missing_project = report.skipped.tasks_missing_project,
			"Rebuilt activity chunks."
		);

		Ok(report)
	}

	/// Deletes every chunk of one level for the owner.
	pub async fn cleanup_level(&self, req: CleanupLevelRequest) -> Result<CleanupLevelResponse> {
		let owner_id = require_owner(&req.owner_id)?;
		let deleted = with_timeout(
			self.storage_timeout(),
			"cleanup level",
			self.backends.chunks.delete_chunks(owner_id, &[req.level]),
		)
		.await??;

		tracing::info!(owner_id, level = req.level.as_str(), deleted, "Cleaned up chunk level.");

		Ok(CleanupLevelResponse { owner_id: owner_id.to_string(), level: req.level, deleted })
	}
}

pub(crate) fn require_owner(owner_id: &str) -> Result<&str> {
	let owner_id = owner_id.trim();

	if owner_id.is_empty() {
		return Err(Error::InvalidRequest { message: "owner_id must be non-empty.".to_string() });
	}

	Ok(owner_id)
}
