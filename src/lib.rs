// ABOUTME: Library root for converge - the deployment reconciliation engine.
// ABOUTME: The operator binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod error;
pub mod rectify;
pub mod resolve;
pub mod store;
pub mod types;
