//! Feature toggle model and the parser that produces it.
mod models;
mod parser;
mod wire;

pub use models::*;
pub use parser::{parse_features, parse_features_value};
