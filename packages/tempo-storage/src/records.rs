//! Read and write access to the raw activity tables.

use sqlx::PgExecutor;

use crate::{
	Error, Result,
	models::{ProjectRow, SessionRow, TaskRow},
};
use tempo_domain::records::{Project, Task, WorkSession};

pub async fn list_projects<'e, E>(executor: E, owner_id: &str) -> Result<Vec<Project>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ProjectRow>(
		"\
SELECT project_id, owner_id, name, description
FROM projects
WHERE owner_id = $1
ORDER BY project_id",
	)
	.bind(owner_id)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().map(Project::from).collect())
}

/// Rows that fail to convert are skipped and logged.
pub async fn list_tasks<'e, E>(executor: E, owner_id: &str) -> Result<Vec<Task>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, TaskRow>(
		"\
SELECT task_id, owner_id, project_id, title, status, estimated_minutes, completed_at, created_at
FROM tasks
WHERE owner_id = $1
ORDER BY task_id",
	)
	.bind(owner_id)
	.fetch_all(executor)
	.await?;

	Ok(convert_rows(rows, "task"))
}

/// Rows that fail to convert are skipped and logged.
pub async fn list_sessions<'e, E>(executor: E, owner_id: &str) -> Result<Vec<WorkSession>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, SessionRow>(
		"\
SELECT session_id, owner_id, task_id, started_at, duration_minutes, completed, notes
FROM work_sessions
WHERE owner_id = $1
ORDER BY started_at, session_id",
	)
	.bind(owner_id)
	.fetch_all(executor)
	.await?;

	Ok(convert_rows(rows, "session"))
}

pub async fn upsert_project<'e, E>(executor: E, project: &Project) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO projects (project_id, owner_id, name, description)
VALUES ($1, $2, $3, $4)
ON CONFLICT (project_id) DO UPDATE
SET owner_id = EXCLUDED.owner_id,
	name = EXCLUDED.name,
	description = EXCLUDED.description",
	)
	.bind(project.project_id.as_str())
	.bind(project.owner_id.as_str())
	.bind(project.name.as_str())
	.bind(project.description.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn upsert_task<'e, E>(executor: E, task: &Task) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let estimated_minutes = task
		.estimated_minutes
		.map(i32::try_from)
		.transpose()
		.map_err(|_| Error::InvalidArgument("Task estimate is out of range.".to_string()))?;

	sqlx::query(
		"\
INSERT INTO tasks (
	task_id,
	owner_id,
	project_id,
	title,
	status,
	estimated_minutes,
	completed_at,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (task_id) DO UPDATE
SET owner_id = EXCLUDED.owner_id,
	project_id = EXCLUDED.project_id,
	title = EXCLUDED.title,
	status = EXCLUDED.status,
	estimated_minutes = EXCLUDED.estimated_minutes,
	completed_at = EXCLUDED.completed_at",
	)
	.bind(task.task_id.as_str())
	.bind(task.owner_id.as_str())
	.bind(task.project_id.as_deref())
	.bind(task.title.as_str())
	.bind(task.status.as_str())
	.bind(estimated_minutes)
	.bind(task.completed_at)
	.bind(task.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn upsert_session<'e, E>(executor: E, session: &WorkSession) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let duration_minutes = i32::try_from(session.duration_minutes)
		.map_err(|_| Error::InvalidArgument("Session duration is out of range.".to_string()))?;

	sqlx::query(
		"\
INSERT INTO work_sessions (
	session_id,
	owner_id,
	task_id,
	started_at,
	duration_minutes,
	completed,
	notes
)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (session_id) DO UPDATE
SET owner_id = EXCLUDED.owner_id,
	task_id = EXCLUDED.task_id,
	started_at = EXCLUDED.started_at,
	duration_minutes = EXCLUDED.duration_minutes,
	completed = EXCLUDED.completed,
	notes = EXCLUDED.notes",
	)
	.bind(session.session_id.as_str())
	.bind(session.owner_id.as_str())
	.bind(session.task_id.as_str())
	.bind(session.started_at)
	.bind(duration_minutes)
	.bind(session.completed)
	.bind(session.notes.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

fn convert_rows<R, T>(rows: Vec<R>, kind: &str) -> Vec<T>
where
	T: TryFrom<R, Error = Error>,
{
	rows.into_iter()
		.filter_map(|row| match T::try_from(row) {
			Ok(value) => Some(value),
			Err(err) => {
				tracing::warn!(error = %err, kind, "Skipping malformed activity record.");

				None
			},
		})
		.collect()
}
