use serde::{Deserialize, Serialize};

use crate::{
	Error, Result, TempoService, chunks::require_owner, enhance::Technique,
	ranking::RankedDocument,
};
use tempo_domain::{
	classify::{self, QueryClassification},
	level::PriorityLevel,
};

#[derive(Clone, Debug, Deserialize)]
pub struct SearchRequest {
	pub owner_id: String,
	pub query: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub classification: QueryClassification,
	pub technique_used: Technique,
	pub sub_queries: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hypothetical_document: Option<String>,
	pub levels_searched: Vec<PriorityLevel>,
	pub results: Vec<RankedDocument>,
}

impl TempoService {
	/// Retrieval without answer generation.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let owner_id = require_owner(&req.owner_id)?;
		let query = require_query(&req.query)?;
		let classification = classify::classify(query);
		let enhanced = self.enhance_and_search(owner_id, query, &classification).await;

		Ok(SearchResponse {
			classification,
			technique_used: enhanced.technique_used,
			sub_queries: enhanced.sub_queries,
			hypothetical_document: enhanced.hypothetical_document,
			levels_searched: enhanced.levels_searched,
			results: enhanced.results,
		})
	}
}

pub(crate) fn require_query(query: &str) -> Result<&str> {
	let query = query.trim();

	if query.is_empty() {
		return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
	}

	Ok(query)
}
