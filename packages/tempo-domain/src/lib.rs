pub mod builder;
pub mod chunk;
pub mod classify;
pub mod level;
pub mod quality;
pub mod records;
pub mod rrf;
pub mod text;
