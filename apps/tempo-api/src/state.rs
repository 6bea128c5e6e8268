use std::sync::Arc;

use tempo_service::TempoService;
use tempo_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TempoService>,
}
impl AppState {
	pub async fn new(config: tempo_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.providers.embedding.dimensions).await?;

		Ok(Self::from_service(TempoService::new(config, db)))
	}

	pub fn from_service(service: TempoService) -> Self {
		Self { service: Arc::new(service) }
	}
}
