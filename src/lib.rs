//! Discovers the GitLab branches, tags and merge-request refs worth monitoring
//! and keeps an in-memory view of them in line with what GitLab reports.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod exporter;
pub mod output;
pub mod providers;
pub mod schemas;
pub mod store;

pub use error::{FetchError, RefscoutError, Result};
