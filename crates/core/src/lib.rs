//! Core library for ckanmcp
//!
//! This crate implements the **Functional Core** of the ckanmcp application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The ckanmcp project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`ckanmcp_core`** (this crate): Pure transformation functions with zero I/O
//! - **`ckanmcp`**: HTTP calls against the CKAN action API, the MCP server and the
//!   explorer CLI (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations. The only mutable state is the
//!   in-memory [`cache::ResponseCache`], and it takes the current instant as an argument
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! # Module Organization
//!
//! - [`cache`]: Response cache with a fixed time-to-live and cache key derivation
//! - [`query`]: Query string construction for `package_search` and friends
//! - [`package`]: Lenient models for portal datasets and resources
//! - [`related`]: Filters used to find datasets related to a source dataset
//! - [`quality`]: Data quality scoring
//! - [`analytics`]: Usage analytics and portal statistics aggregation
//! - [`preview`]: Resource preview extraction from DataStore results
//! - [`export`]: DCAT and Schema.org metadata export
//! - [`envelope`]: The uniform response envelope and the error classifier
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use ckanmcp_core::quality::{score_quality, QualityCheck};
//! use ckanmcp_core::package::Package;
//!
//! let package = Package::from_value(&serde_json::json!({
//!     "title": "Air quality",
//!     "resources": [{"format": "CSV", "url": "https://example.com/a.csv"}]
//! }))?;
//!
//! let report = score_quality("air-quality", &package, &[QualityCheck::Completeness], timestamp);
//! assert_eq!(report.overall_score, 40.0);
//! ```

pub mod analytics;
pub mod cache;
pub mod envelope;
pub mod export;
pub mod package;
pub mod preview;
pub mod quality;
pub mod query;
pub mod related;
