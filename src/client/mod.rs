//! Elasticsearch API client and authentication.
//!
//! This module provides the [`ElasticClient`] for interacting with the
//! Elasticsearch API, along with its authentication methods ([`Auth`]).

mod auth;
mod elasticsearch;

pub use auth::Auth;
pub use elasticsearch::{ClusterInfo, ClusterVersion, ElasticClient};
