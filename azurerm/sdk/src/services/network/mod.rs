//! `Microsoft.Network`, api-version `2023-09-01`

pub mod subnets;
pub mod virtual_networks;

pub const API_VERSION: &str = "2023-09-01";
