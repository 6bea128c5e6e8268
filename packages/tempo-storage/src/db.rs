use std::str::FromStr;

use sqlx::{
	PgPool,
	postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::{Result, schema};

const SCHEMA_LOCK_ID: i64 = 8_462_031;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &tempo_config::Postgres) -> Result<Self> {
		let options = PgConnectOptions::from_str(&cfg.dsn)?
			.options([("statement_timeout", cfg.statement_timeout_ms.to_string())]);
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect_with(options).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = schema::render_schema(vector_dim);
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
