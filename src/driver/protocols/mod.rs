mod json;
#[cfg(feature = "arrow")]
mod arrow;

pub use json::{JsonProtocol, JsonQuery, JsonQueryResult, JsonDescribeResult};
#[cfg(feature = "arrow")]
pub use arrow::{ArrowProtocol, ArrowQuery, ArrowQueryResult, ArrowDescribeResult};
