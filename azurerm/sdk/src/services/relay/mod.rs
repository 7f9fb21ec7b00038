//! `Microsoft.Relay`, api-version `2021-11-01`

pub mod hybrid_connections;
pub mod namespaces;

pub const API_VERSION: &str = "2021-11-01";
