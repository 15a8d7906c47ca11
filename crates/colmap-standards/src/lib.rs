#![deny(unsafe_code)]

pub mod registry;

pub use crate::registry::{SchemaType, required_fields_by_schema};
