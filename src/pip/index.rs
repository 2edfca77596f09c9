//! Geometry store: R-tree over locality area polygons.

use std::sync::Arc;

use geo::{Contains, Point, Polygon};
use hashbrown::HashMap;
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info};

use crate::models::{LocalityArea, LocalityAreaRow};

/// Wrapper for R-tree indexing of area polygons
#[derive(Debug, Clone)]
pub struct IndexedArea {
    pub area: LocalityArea,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedArea {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedArea {
    /// Returns `None` for polygons without coordinates
    pub fn new(area: LocalityArea) -> Option<Self> {
        let (min, max) = area.bounds()?;
        Some(Self {
            area,
            envelope: AABB::from_corners(min, max),
        })
    }
}

/// Accumulates area rows across any number of bulk loads.
#[derive(Debug, Default)]
pub struct GeometryStoreBuilder {
    areas: Vec<IndexedArea>,
    /// Original grouping per locality, kept for boundary output
    boundaries: HashMap<String, Vec<Arc<Polygon<f64>>>>,
    rows: usize,
}

impl GeometryStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of area rows, returning the number of polygons indexed.
    ///
    /// Multipolygons are flattened into one entry per member polygon.
    pub fn load<I>(&mut self, rows: I) -> usize
    where
        I: IntoIterator<Item = LocalityAreaRow>,
    {
        let before = self.areas.len();

        for row in rows {
            self.rows += 1;
            for area in row.into_areas() {
                self.boundaries
                    .entry(area.locality_id.clone())
                    .or_default()
                    .push(Arc::clone(&area.polygon));

                match IndexedArea::new(area) {
                    Some(indexed) => self.areas.push(indexed),
                    None => debug!("Skipping empty polygon"),
                }
            }
        }

        self.areas.len() - before
    }

    /// Number of polygons loaded so far
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Build the R-tree. The store is read-only from here on.
    pub fn freeze(self) -> GeometryStore {
        info!(
            "Building spatial index for {} polygons from {} area rows...",
            self.areas.len(),
            self.rows
        );

        let tree = RTree::bulk_load(self.areas);

        info!(
            "Spatial index built with {} entries covering {} localities",
            tree.size(),
            self.boundaries.len()
        );

        GeometryStore {
            tree,
            boundaries: self.boundaries,
        }
    }
}

/// Frozen geometry store. Safe to share between threads.
#[derive(Debug)]
pub struct GeometryStore {
    tree: RTree<IndexedArea>,
    boundaries: HashMap<String, Vec<Arc<Polygon<f64>>>>,
}

impl GeometryStore {
    /// Find every area whose polygon contains the point.
    ///
    /// Points on an exterior or hole edge are not contained.
    pub fn find_containing(&self, point: Point<f64>) -> Vec<&LocalityArea> {
        let query_envelope = AABB::from_point([point.x(), point.y()]);

        // Use R-tree to get candidates via envelope intersection, then filter with exact containment
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ia| ia.area.polygon.contains(&point))
            .map(|ia| &ia.area)
            .collect()
    }

    /// Full boundary of a locality: every polygon loaded for it, in load order
    pub fn boundary(&self, locality_id: &str) -> Option<&[Arc<Polygon<f64>>]> {
        self.boundaries.get(locality_id).map(Vec::as_slice)
    }

    /// Ids of all localities that own at least one polygon
    pub fn locality_ids(&self) -> impl Iterator<Item = &str> {
        self.boundaries.keys().map(String::as_str)
    }

    /// Get total number of indexed polygons
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AreaGeometry;
    use geo::{LineString, MultiPolygon, Polygon};

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
            ]),
            vec![],
        )
    }

    fn ring(x: f64, y: f64, size: f64) -> LineString<f64> {
        LineString::from(vec![
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
        ])
    }

    fn ids(store: &GeometryStore, x: f64, y: f64) -> Vec<String> {
        let mut ids: Vec<String> = store
            .find_containing(Point::new(x, y))
            .into_iter()
            .map(|a| a.locality_id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_inside_and_outside() {
        let mut builder = GeometryStoreBuilder::new();
        builder.load(vec![LocalityAreaRow::new(
            "a1",
            "loc",
            AreaGeometry::Polygon(square(0.0, 0.0, 10.0)),
        )]);
        let store = builder.freeze();

        assert_eq!(ids(&store, 5.0, 5.0), vec!["loc"]);
        assert!(ids(&store, 15.0, 5.0).is_empty());
        assert!(ids(&store, -0.1, 5.0).is_empty());
    }

    #[test]
    fn test_hole_excludes_point() {
        let donut = Polygon::new(ring(0.0, 0.0, 10.0), vec![ring(4.0, 4.0, 2.0)]);
        let mut builder = GeometryStoreBuilder::new();
        builder.load(vec![LocalityAreaRow::new(
            "a1",
            "donut",
            AreaGeometry::Polygon(donut),
        )]);
        let store = builder.freeze();

        assert!(ids(&store, 5.0, 5.0).is_empty());
        assert_eq!(ids(&store, 2.0, 2.0), vec!["donut"]);
        assert_eq!(ids(&store, 8.0, 5.0), vec!["donut"]);
    }

    #[test]
    fn test_boundary_points_are_not_contained() {
        let donut = Polygon::new(ring(0.0, 0.0, 10.0), vec![ring(4.0, 4.0, 2.0)]);
        let mut builder = GeometryStoreBuilder::new();
        builder.load(vec![LocalityAreaRow::new(
            "a1",
            "donut",
            AreaGeometry::Polygon(donut),
        )]);
        let store = builder.freeze();

        // exterior edge, exterior vertex, hole edge
        assert!(ids(&store, 0.0, 5.0).is_empty());
        assert!(ids(&store, 10.0, 10.0).is_empty());
        assert!(ids(&store, 4.0, 5.0).is_empty());
        // just inside the exterior edge
        assert_eq!(ids(&store, 0.000001, 5.0), vec!["donut"]);
    }

    #[test]
    fn test_winding_order_is_irrelevant() {
        let clockwise = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]),
            vec![],
        );
        let mut builder = GeometryStoreBuilder::new();
        builder.load(vec![LocalityAreaRow::new(
            "cw",
            "cw",
            AreaGeometry::Polygon(clockwise),
        )]);
        let store = builder.freeze();

        assert_eq!(ids(&store, 2.0, 2.0), vec!["cw"]);
    }

    #[test]
    fn test_repeated_loads_accumulate() {
        let mut builder = GeometryStoreBuilder::new();
        let added = builder.load(vec![LocalityAreaRow::new(
            "a1",
            "outer",
            AreaGeometry::Polygon(square(0.0, 0.0, 10.0)),
        )]);
        assert_eq!(added, 1);

        let added = builder.load(vec![LocalityAreaRow::new(
            "a2",
            "inner",
            AreaGeometry::MultiPolygon(MultiPolygon::new(vec![
                square(1.0, 1.0, 2.0),
                square(6.0, 6.0, 2.0),
            ])),
        )]);
        assert_eq!(added, 2);

        let store = builder.freeze();
        assert_eq!(store.len(), 3);
        assert_eq!(ids(&store, 7.0, 7.0), vec!["inner", "outer"]);
        assert_eq!(ids(&store, 5.0, 5.0), vec!["outer"]);
    }

    #[test]
    fn test_boundary_merges_rows_of_same_locality() {
        let mut builder = GeometryStoreBuilder::new();
        builder.load(vec![
            LocalityAreaRow::new("a1", "loc", AreaGeometry::Polygon(square(0.0, 0.0, 1.0))),
            LocalityAreaRow::new(
                "a2",
                "loc",
                AreaGeometry::MultiPolygon(MultiPolygon::new(vec![
                    square(2.0, 0.0, 1.0),
                    square(4.0, 0.0, 1.0),
                ])),
            ),
        ]);
        let store = builder.freeze();

        assert_eq!(store.boundary("loc").map(|polygons| polygons.len()), Some(3));
        assert!(store.boundary("missing").is_none());
        assert_eq!(store.locality_ids().collect::<Vec<_>>(), vec!["loc"]);
    }

    #[test]
    fn test_boundary_shares_indexed_polygons() {
        let mut builder = GeometryStoreBuilder::new();
        builder.load(vec![LocalityAreaRow::new(
            "a1",
            "loc",
            AreaGeometry::Polygon(square(0.0, 0.0, 4.0)),
        )]);
        let store = builder.freeze();

        let hits = store.find_containing(Point::new(1.0, 1.0));
        let boundary = store.boundary("loc").unwrap();
        assert_eq!(hits.len(), 1);
        assert!(Arc::ptr_eq(&hits[0].polygon, &boundary[0]));
        assert_eq!(Arc::strong_count(&boundary[0]), 2);
    }

    #[test]
    fn test_empty_store() {
        let store = GeometryStoreBuilder::new().freeze();
        assert!(store.is_empty());
        assert!(store.find_containing(Point::new(0.0, 0.0)).is_empty());
    }
}
