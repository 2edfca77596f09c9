//! Locality catalog: id lookup plus a bounding-box R-tree.

use hashbrown::HashMap;
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::Locality;

/// Wrapper for R-tree indexing of locality bounding boxes
#[derive(Debug, Clone)]
struct IndexedLocality {
    locality: Arc<Locality>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedLocality {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedLocality {
    fn new(locality: Arc<Locality>) -> Option<Self> {
        let (min, max) = locality.bbox?.corners();
        Some(Self {
            locality,
            envelope: AABB::from_corners(min, max),
        })
    }
}

/// Collects locality records; a repeated id replaces the earlier record.
#[derive(Debug, Default)]
pub struct LocalityCatalogBuilder {
    by_id: HashMap<String, Locality>,
    replaced: usize,
}

impl LocalityCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch of localities keyed by id (last write wins)
    pub fn load<I>(&mut self, localities: I) -> usize
    where
        I: IntoIterator<Item = Locality>,
    {
        let mut count = 0;
        for locality in localities {
            if self.by_id.insert(locality.id.clone(), locality).is_some() {
                self.replaced += 1;
            }
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn freeze(self) -> LocalityCatalog {
        if self.replaced > 0 {
            debug!("{} locality records replaced by later loads", self.replaced);
        }

        let by_id: HashMap<String, Arc<Locality>> = self
            .by_id
            .into_iter()
            .map(|(id, locality)| (id, Arc::new(locality)))
            .collect();

        let indexed: Vec<IndexedLocality> = by_id
            .values()
            .filter_map(|l| IndexedLocality::new(Arc::clone(l)))
            .collect();
        let tree = RTree::bulk_load(indexed);

        info!(
            "Locality catalog built with {} records ({} with bbox)",
            by_id.len(),
            tree.size()
        );

        LocalityCatalog { by_id, tree }
    }
}

/// Frozen locality catalog. Safe to share between threads.
#[derive(Debug)]
pub struct LocalityCatalog {
    by_id: HashMap<String, Arc<Locality>>,
    tree: RTree<IndexedLocality>,
}

impl LocalityCatalog {
    /// Exact id lookup
    pub fn get(&self, id: &str) -> Option<&Locality> {
        self.by_id.get(id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// All localities whose bbox intersects the query box (edges included).
    ///
    /// Records without a bbox never match.
    pub fn search_bbox(&self, min: [f64; 2], max: [f64; 2]) -> Vec<&Locality> {
        let envelope = AABB::from_corners(min, max);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|il| il.locality.as_ref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
