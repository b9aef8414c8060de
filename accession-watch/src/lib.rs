//! accession-watch library interface
//!
//! Exposes the ingest pipeline for integration testing. The binary in
//! `main.rs` wires configuration, logging, and the poll loop around these
//! modules.

pub mod models;
pub mod services;

pub use models::{ContentModel, ObjectDescriptor, Person, Relation};
