//! Boundary projection: matched localities as a GeoJSON FeatureCollection.

use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};

use super::ReverseService;
use crate::models::Locality;

/// What a projection emits for each matched locality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Properties only; every feature has a null geometry
    Metadata,
    /// Every matched locality with its full boundary, broadest first
    FullBoundary,
    /// Only the most specific matched locality
    BestBoundary,
}

impl BoundaryMode {
    /// Mode selected by the `debug` / `debug_full` request flags
    pub fn from_flags(debug: bool, debug_full: bool) -> Self {
        match (debug, debug_full) {
            (false, _) => BoundaryMode::Metadata,
            (true, false) => BoundaryMode::BestBoundary,
            (true, true) => BoundaryMode::FullBoundary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    pub features: Vec<Feature<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Feature<'a> {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    pub properties: &'a Locality,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geo_type: &'static str,
    /// polygons -> rings -> [lng, lat]
    pub coordinates: Vec<Vec<Vec<[f64; 2]>>>,
}

impl Geometry {
    /// A MultiPolygon holding the given polygons, in order
    pub fn from_polygons<'p, I>(polygons: I) -> Self
    where
        I: IntoIterator<Item = &'p Polygon<f64>>,
    {
        let coordinates: Vec<Vec<Vec<[f64; 2]>>> = polygons
            .into_iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
                    .collect()
            })
            .collect();

        Self {
            geo_type: "MultiPolygon",
            coordinates,
        }
    }
}

impl<'a> FeatureCollection<'a> {
    pub fn new(features: Vec<Feature<'a>>) -> Self {
        Self {
            collection_type: "FeatureCollection",
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl ReverseService {
    /// Resolve a point and emit the matches as features, ranked like
    /// [`ReverseService::resolve`].
    pub fn project(&self, point: Point<f64>, mode: BoundaryMode) -> FeatureCollection<'_> {
        let mut ranked = self.resolve(point);

        if mode == BoundaryMode::BestBoundary {
            // keep the most specific one
            ranked = ranked.pop().into_iter().collect();
        }

        let features = ranked
            .into_iter()
            .map(|locality| {
                let geometry = match mode {
                    BoundaryMode::Metadata => None,
                    BoundaryMode::FullBoundary | BoundaryMode::BestBoundary => self
                        .store()
                        .boundary(&locality.id)
                        .map(|polygons| {
                            Geometry::from_polygons(polygons.iter().map(|p| &**p))
                        }),
                };
                Feature {
                    feature_type: "Feature",
                    properties: locality,
                    geometry,
                }
            })
            .collect();

        FeatureCollection::new(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaGeometry, LocalityAreaRow, LocalityType};
    use crate::pip::{GeometryStoreBuilder, LocalityCatalogBuilder};
    use geo::{LineString, MultiPolygon};

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

    fn nested_service() -> ReverseService {
        let mut catalog = LocalityCatalogBuilder::new();
        catalog.load(vec![
            Locality::new("country", Some(LocalityType::Country)),
            Locality::new("city", Some(LocalityType::City)),
        ]);

        let mut store = GeometryStoreBuilder::new();
        store.load(vec![
            LocalityAreaRow::new(
                "a-country",
                "country",
                AreaGeometry::Polygon(square(0.0, 0.0, 100.0)),
            ),
            LocalityAreaRow::new(
                "a-city",
                "city",
                AreaGeometry::MultiPolygon(MultiPolygon::new(vec![
                    square(10.0, 10.0, 10.0),
                    square(12.0, 12.0, 10.0),
                    square(50.0, 50.0, 1.0),
                ])),
            ),
        ]);

        ReverseService::new(store.freeze(), catalog.freeze())
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(BoundaryMode::from_flags(false, true), BoundaryMode::Metadata);
        assert_eq!(BoundaryMode::from_flags(true, false), BoundaryMode::BestBoundary);
        assert_eq!(BoundaryMode::from_flags(true, true), BoundaryMode::FullBoundary);
    }

    #[test]
    fn test_full_boundary_one_feature_per_locality() {
        let service = nested_service();
        // inside two members of the city multipolygon
        let fc = service.project(Point::new(15.0, 15.0), BoundaryMode::FullBoundary);

        assert_eq!(fc.len(), service.resolve(Point::new(15.0, 15.0)).len());
        assert_eq!(fc.features[0].properties.id, "country");
        assert_eq!(fc.features[1].properties.id, "city");

        // the city is emitted with all three member polygons
        let city = fc.features[1].geometry.as_ref().unwrap();
        assert_eq!(city.geo_type, "MultiPolygon");
        assert_eq!(city.coordinates.len(), 3);
        // rings come out closed
        let ring = &city.coordinates[0][0];
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_best_boundary_keeps_most_specific() {
        let service = nested_service();
        let fc = service.project(Point::new(15.0, 15.0), BoundaryMode::BestBoundary);
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].properties.id, "city");

        let fc = service.project(Point::new(80.0, 80.0), BoundaryMode::BestBoundary);
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].properties.id, "country");
    }

    #[test]
    fn test_uncovered_point_has_no_features() {
        let service = nested_service();
        for mode in [
            BoundaryMode::Metadata,
            BoundaryMode::FullBoundary,
            BoundaryMode::BestBoundary,
        ] {
            assert!(service.project(Point::new(-30.0, -30.0), mode).is_empty());
        }
    }

    #[test]
    fn test_metadata_mode_has_null_geometry() {
        let service = nested_service();
        let fc = service.project(Point::new(15.0, 15.0), BoundaryMode::Metadata);
        assert_eq!(fc.len(), 2);
        assert!(fc.features.iter().all(|f| f.geometry.is_none()));

        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert!(json["features"][0]["geometry"].is_null());
        assert_eq!(json["features"][0]["properties"]["locality_type"], "country");
    }
}
