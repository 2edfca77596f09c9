//! Reverse lookup service: resolves a point to its ranked localities.

use geo::Point;
use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use super::{GeometryStore, LocalityCatalog};
use crate::models::Locality;

/// Point-in-Polygon reverse lookup service.
///
/// Owns the frozen geometry store and catalog. Every query method takes
/// `&self` and never mutates, so one instance serves concurrent requests.
#[derive(Debug)]
pub struct ReverseService {
    store: GeometryStore,
    catalog: LocalityCatalog,
}

impl ReverseService {
    pub fn new(store: GeometryStore, catalog: LocalityCatalog) -> Self {
        let dangling = store
            .locality_ids()
            .filter(|id| !catalog.contains(id))
            .count();
        if dangling > 0 {
            warn!(
                "{} localities own area polygons but have no catalog record; they will be skipped",
                dangling
            );
        }

        Self { store, catalog }
    }

    /// Resolve a point to the localities containing it, broadest first.
    ///
    /// An empty result means the point is not covered by any loaded area.
    pub fn resolve(&self, point: Point<f64>) -> Vec<&Locality> {
        let hits = self.store.find_containing(point);

        let mut seen: HashSet<&str> = HashSet::new();
        let mut missing: HashSet<&str> = HashSet::new();
        let mut matched: Vec<&Locality> = Vec::new();

        for &area in &hits {
            let id = area.locality_id.as_str();
            if seen.contains(id) {
                continue;
            }
            match self.catalog.get(id) {
                Some(locality) => {
                    seen.insert(id);
                    matched.push(locality);
                }
                None => {
                    if missing.insert(id) {
                        debug!(
                            "Area {} references unknown locality {}; skipping",
                            area.id, id
                        );
                    }
                }
            }
        }

        debug!(
            "Reverse lookup at ({}, {}): {} polygons, {} localities",
            point.x(),
            point.y(),
            hits.len(),
            matched.len()
        );

        rank_localities(matched)
    }

    /// Localities whose bbox intersects the square of half-width `radius`
    /// (degrees) around the point. Informational only; no containment test.
    pub fn nearby(&self, point: Point<f64>, radius: f64) -> Vec<&Locality> {
        let min = [point.x() - radius, point.y() - radius];
        let max = [point.x() + radius, point.y() + radius];

        let mut found = self.catalog.search_bbox(min, max);
        found.sort_by(|a, b| a.rank().cmp(&b.rank()).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Get the geometry store (for boundaries and stats)
    pub fn store(&self) -> &GeometryStore {
        &self.store
    }

    /// Get the locality catalog
    pub fn catalog(&self) -> &LocalityCatalog {
        &self.catalog
    }
}

/// Order matched localities broadest first.
///
/// Key: hierarchy rank, then context depth within the matched set (a parent
/// listed via `context_id` precedes its children of the same rank), then id.
pub fn rank_localities(matched: Vec<&Locality>) -> Vec<&Locality> {
    let by_id: HashMap<&str, &Locality> = matched.iter().map(|&l| (l.id.as_str(), l)).collect();

    let mut keyed: Vec<(u8, usize, &Locality)> = matched
        .into_iter()
        .map(|l| (l.rank(), context_depth(l, &by_id), l))
        .collect();

    keyed.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.id.cmp(&b.2.id))
    });

    keyed.into_iter().map(|(_, _, l)| l).collect()
}

/// Number of ancestors reachable through `context_id` inside the matched set
fn context_depth(locality: &Locality, matched: &HashMap<&str, &Locality>) -> usize {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(locality.id.as_str());

    let mut depth = 0;
    let mut current = locality.context_id.as_deref();
    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        match matched.get(id) {
            Some(&parent) => {
                depth += 1;
                current = parent.context_id.as_deref();
            }
            None => break,
        }
    }
    depth
}
