pub mod chunks;
pub mod db;
pub mod models;
pub mod records;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Formats a vector as a pgvector text literal, `[0.1,0.2]`.
pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8 + 2);

	out.push('[');

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub fn parse_pg_vector(text: &str) -> Result<Vec<f32>> {
	let trimmed = text.trim();
	let inner = trimmed
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.ok_or_else(|| Error::InvalidArgument(format!("Vector text {trimmed:?} is not bracketed.")))?;

	if inner.trim().is_empty() {
		return Ok(Vec::new());
	}

	inner
		.split(',')
		.map(|part| {
			part.trim().parse::<f32>().map_err(|err| {
				Error::InvalidArgument(format!("Vector component {part:?} is not a number: {err}."))
			})
		})
		.collect()
}
