use crate::{driver::query::Query, http::client::SnowflakeHttpClient};

pub(crate) mod base;
pub(crate) mod chunks;
pub mod primitives;
pub mod protocols;
pub mod query;

#[cfg(feature = "arrow")]
pub mod arrow;

pub trait Protocol: Clone {
    type Query<'a, C>: Query<'a, C>
    where
        C: SnowflakeHttpClient + 'a;
}
