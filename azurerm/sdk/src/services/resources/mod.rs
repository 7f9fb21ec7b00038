//! `Microsoft.Resources`

pub mod providers;
pub mod resource_groups;
