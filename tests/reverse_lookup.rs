//! End-to-end lookups against a small dataset written to disk.

use std::fs;
use std::path::Path;

use geo::Point;
use locus::dataset::DatasetLoader;
use locus::{BoundaryMode, LocalityType, ReverseService};
use serde_json::json;

fn rect(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> serde_json::Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[xmin, ymin], [xmax, ymin], [xmax, ymax], [xmin, ymax], [xmin, ymin]]]
    })
}

fn locality(id: &str, kind: &str, name: &str, context: Option<&str>, bbox: [f64; 4]) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": null,
        "properties": {
            "id": id,
            "locality_type": kind,
            "context_id": context,
            "bbox": {"xmin": bbox[0], "ymin": bbox[1], "xmax": bbox[2], "ymax": bbox[3]},
            "names": {"primary": name}
        }
    })
}

fn area(id: &str, locality_id: &str, geometry: serde_json::Value) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {"id": id, "locality_id": locality_id}
    })
}

fn write_collection(path: &Path, features: Vec<serde_json::Value>) {
    let fc = json!({"type": "FeatureCollection", "features": features});
    fs::write(path, serde_json::to_string(&fc).unwrap()).unwrap();
}

/// United States > New York > New York City > Lower Manhattan, plus an
/// area whose locality record is missing.
fn new_york() -> (tempfile::TempDir, ReverseService) {
    let root = tempfile::tempdir().unwrap();
    let locality_dir = root.path().join("type=locality");
    let area_dir = root.path().join("type=locality_area");
    fs::create_dir_all(&locality_dir).unwrap();
    fs::create_dir_all(&area_dir).unwrap();

    // shuffled on purpose; output order must not depend on input order
    write_collection(
        &locality_dir.join("part-0.geojson"),
        vec![
            locality("nbhd", "neighborhood", "Lower Manhattan", Some("nyc"), [-74.02, 40.70, -73.99, 40.72]),
            locality("us", "country", "United States", None, [-125.0, 24.0, -66.0, 50.0]),
        ],
    );
    write_collection(
        &locality_dir.join("part-1.geojson"),
        vec![
            locality("nyc", "city", "New York City", Some("ny"), [-74.3, 40.4, -73.7, 40.95]),
            locality("ny", "state", "New York", Some("us"), [-80.0, 40.0, -71.0, 45.1]),
        ],
    );

    write_collection(
        &area_dir.join("part-0.geojson"),
        vec![
            area("a-nyc", "nyc", rect(-74.3, 40.4, -73.7, 40.95)),
            area("a-nbhd", "nbhd", rect(-74.02, 40.70, -73.99, 40.72)),
            area("a-ghost", "ghost", rect(-74.1, 40.6, -73.9, 40.8)),
        ],
    );
    write_collection(
        &area_dir.join("part-1.geojson"),
        vec![
            area(
                "a-us",
                "us",
                json!({
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-125.0, 24.0], [-66.0, 24.0], [-66.0, 50.0], [-125.0, 50.0], [-125.0, 24.0]]],
                        [[[-170.0, 52.0], [-140.0, 52.0], [-140.0, 71.0], [-170.0, 71.0], [-170.0, 52.0]]]
                    ]
                }),
            ),
            area("a-ny", "ny", rect(-80.0, 40.0, -71.0, 45.1)),
        ],
    );

    let service = DatasetLoader::new()
        .load_service(&locality_dir, &area_dir)
        .unwrap();
    (root, service)
}

fn ids(localities: &[&locus::Locality]) -> Vec<String> {
    localities.iter().map(|l| l.id.clone()).collect()
}

#[test]
fn test_new_york_resolves_broadest_first() {
    let (_dir, service) = new_york();
    let resolved = service.resolve(Point::new(-74.006, 40.7128));

    assert_eq!(ids(&resolved), vec!["us", "ny", "nyc", "nbhd"]);
    assert_eq!(resolved[0].locality_type, Some(LocalityType::Country));
    assert_eq!(resolved[3].primary_name(), Some("Lower Manhattan"));
}

#[test]
fn test_dangling_area_is_skipped() {
    let (_dir, service) = new_york();
    let resolved = service.resolve(Point::new(-74.05, 40.65));

    assert_eq!(ids(&resolved), vec!["us", "ny", "nyc"]);
    assert!(resolved.iter().all(|l| l.id != "ghost"));
}

#[test]
fn test_ocean_point_is_empty() {
    let (_dir, service) = new_york();
    assert!(service.resolve(Point::new(-40.0, 30.0)).is_empty());
    assert!(service
        .project(Point::new(-40.0, 30.0), BoundaryMode::BestBoundary)
        .is_empty());
}

#[test]
fn test_second_polygon_of_multipolygon_matches() {
    let (_dir, service) = new_york();
    let resolved = service.resolve(Point::new(-150.0, 61.2));
    assert_eq!(ids(&resolved), vec!["us"]);
}

#[test]
fn test_best_boundary_is_most_specific() {
    let (_dir, service) = new_york();
    let fc = service.project(Point::new(-74.006, 40.7128), BoundaryMode::BestBoundary);

    assert_eq!(fc.len(), 1);
    assert_eq!(fc.features[0].properties.id, "nbhd");
    let geometry = fc.features[0].geometry.as_ref().unwrap();
    assert_eq!(geometry.coordinates.len(), 1);
}

#[test]
fn test_full_boundary_keeps_every_match() {
    let (_dir, service) = new_york();
    let fc = service.project(Point::new(-74.006, 40.7128), BoundaryMode::FullBoundary);

    let ids: Vec<&str> = fc.features.iter().map(|f| f.properties.id.as_str()).collect();
    assert_eq!(ids, vec!["us", "ny", "nyc", "nbhd"]);

    // both parts of the country come back
    let us = fc.features[0].geometry.as_ref().unwrap();
    assert_eq!(us.coordinates.len(), 2);
}

#[test]
fn test_metadata_projection_serializes_null_geometry() {
    let (_dir, service) = new_york();
    let fc = service.project(Point::new(-74.006, 40.7128), BoundaryMode::Metadata);
    let value = serde_json::to_value(&fc).unwrap();

    assert_eq!(value["type"], "FeatureCollection");
    assert_eq!(value["features"].as_array().unwrap().len(), 4);
    assert!(value["features"][0]["geometry"].is_null());
    assert_eq!(value["features"][3]["properties"]["locality_type"], "neighborhood");
}

#[test]
fn test_nearby_scan() {
    let (_dir, service) = new_york();
    let nearby = service.nearby(Point::new(-74.006, 40.7128), 0.003);

    let names: Vec<&str> = nearby.iter().filter_map(|l| l.primary_name()).collect();
    assert_eq!(
        names,
        vec!["United States", "New York", "New York City", "Lower Manhattan"]
    );
}
