//! Locality area geometry.
//!
//! The dataset delivers each area as either a polygon or a multipolygon.
//! The geometry store works on simple polygons only, so multipolygons are
//! flattened into one [`LocalityArea`] per member polygon, all pointing at
//! the same locality.

use std::sync::Arc;

use geo::BoundingRect;
use geo_types::{MultiPolygon, Polygon};
use serde::Serialize;

use super::locality::{BBox, SourceInfo};

/// Decoded area geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl AreaGeometry {
    /// Split into simple polygons
    pub fn flatten(self) -> Vec<Polygon<f64>> {
        match self {
            AreaGeometry::Polygon(p) => vec![p],
            AreaGeometry::MultiPolygon(mp) => mp.0,
        }
    }

    /// Number of simple polygons this geometry flattens into
    pub fn polygon_count(&self) -> usize {
        match self {
            AreaGeometry::Polygon(_) => 1,
            AreaGeometry::MultiPolygon(mp) => mp.0.len(),
        }
    }
}

/// A decoded locality area row, before flattening.
#[derive(Debug, Clone)]
pub struct LocalityAreaRow {
    pub id: String,
    /// Owning locality
    pub locality_id: String,
    pub bbox: Option<BBox>,
    pub base: SourceInfo,
    pub geometry: AreaGeometry,
}

impl LocalityAreaRow {
    pub fn new(id: impl Into<String>, locality_id: impl Into<String>, geometry: AreaGeometry) -> Self {
        Self {
            id: id.into(),
            locality_id: locality_id.into(),
            bbox: None,
            base: SourceInfo::default(),
            geometry,
        }
    }
}

/// One simple polygon belonging to a locality.
#[derive(Debug, Clone, Serialize)]
pub struct LocalityArea {
    /// Id of the area row this polygon came from
    pub id: String,
    pub locality_id: String,
    pub bbox: Option<BBox>,
    pub base: SourceInfo,
    /// Shared with the geometry store's per-locality boundary
    #[serde(skip)]
    pub polygon: Arc<Polygon<f64>>,
}

impl LocalityArea {
    /// Bounding rectangle of the polygon itself
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        self.polygon
            .bounding_rect()
            .map(|rect| ([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
    }
}

impl LocalityAreaRow {
    /// Expand the row into one area per simple polygon
    pub fn into_areas(self) -> Vec<LocalityArea> {
        let LocalityAreaRow {
            id,
            locality_id,
            bbox,
            base,
            geometry,
        } = self;

        geometry
            .flatten()
            .into_iter()
            .map(|polygon| LocalityArea {
                id: id.clone(),
                locality_id: locality_id.clone(),
                bbox,
                base: base.clone(),
                polygon: Arc::new(polygon),
            })
            .collect()
    }
}
