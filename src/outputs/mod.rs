//! Presenters for an [`AggregationResult`](crate::models::AggregationResult).
//!
//! # Submodules
//!
//! - [`text`]: numbered plain-text listing for the terminal
//! - [`json`]: the result serialized as JSON
//! - [`html`]: a full HTML page for the web view
//!
//! All presenters iterate sources in configuration order and articles in the
//! order the aggregator returned them.

pub mod html;
pub mod json;
pub mod text;
