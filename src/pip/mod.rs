//! Point-in-Polygon (PIP) locality lookup.
//!
//! Area polygons live in an R-tree backed geometry store, locality metadata
//! in a catalog keyed by id. Both are assembled by builders and frozen
//! before serving queries.

mod boundary;
mod catalog;
mod index;
mod service;

pub use boundary::{BoundaryMode, Feature, FeatureCollection, Geometry};
pub use catalog::{LocalityCatalog, LocalityCatalogBuilder};
pub use index::{GeometryStore, GeometryStoreBuilder, IndexedArea};
pub use service::{rank_localities, ReverseService};
