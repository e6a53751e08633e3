//! Config composer: merges ordered configuration fragments into one document.
//!
//! ## Contents
//! - [`Fragment`] named partial tree (TOML text, table, or JSON object)
//! - [`merge`] recursive last-writer-wins merge
//! - [`merge_json`] the same merge over JSON trees
//! - [`Document`], [`JsonDocument`] merged trees with deterministic rendering

mod fragment;
mod merge;

pub use fragment::{Fragment, FragmentSource};
pub use merge::{Document, JsonDocument, merge, merge_json};
