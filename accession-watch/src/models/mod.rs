//! Data models for the batch accessioner

pub mod descriptor;

pub use descriptor::{ContentModel, ObjectDescriptor, Person, Relation};
