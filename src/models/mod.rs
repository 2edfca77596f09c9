//! Core data models for the locality dataset.

pub mod area;
pub mod locality;

pub use area::{AreaGeometry, LocalityArea, LocalityAreaRow};
pub use locality::{BBox, Locality, LocalityNames, LocalityType, NameRule, Source, SourceInfo};
