//! Relmap Core - Data model for relationship mapping
//!
//! This crate defines the element model the mapping subsystem works over:
//! named, located units of code and documentation structure, plus the raw
//! analyzer records they are built from.
//!
//! The analyzers themselves live in the surrounding pipeline. They hand
//! Relmap one [`FileAnalysis`] per file; everything downstream (resolution,
//! scoring, the graph) lives in `relmap-graph`.

mod analysis;
mod element;

pub use analysis::{ElementFacts, ElementRecord, FileAnalysis};
pub use element::{Element, ElementId, ElementKind, Location};
