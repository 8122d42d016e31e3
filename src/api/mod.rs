//! Client for the public case search servlets.

pub mod api_types;
pub mod client;
pub mod types;
pub mod urls;

pub use client::CaseClient;
