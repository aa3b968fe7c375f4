mod lexer;

pub mod serializer;
pub use serializer::{column_alias, Params, Placeholder, Serializer};
