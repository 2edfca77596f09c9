//! Locus - reverse geocoding of points to administrative localities
//!
//! This library provides the in-memory indexes, dataset loading and HTTP API
//! shared by the query and lookup binaries.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod pip;

pub use error::LoadError;
pub use models::{Locality, LocalityType};
pub use pip::{BoundaryMode, ReverseService};
