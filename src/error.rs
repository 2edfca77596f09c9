//! Load-time errors. Any of these aborts startup.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Dataset directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("Failed to walk dataset directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse GeoJSON in {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: geojson::Error,
    },

    #[error("Failed to read Parquet file {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("Failed to decode Arrow batch in {path}: {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow_schema::ArrowError,
    },

    #[error("{path}: feature {index}: invalid WKB geometry: {reason}")]
    Wkb {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("{path}: expected a FeatureCollection or Feature")]
    NotFeatures { path: PathBuf },

    #[error("{path}: feature {index}: {reason}")]
    InvalidRow {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("{path}: feature {index}: unsupported geometry type {kind}")]
    UnsupportedGeometry {
        path: PathBuf,
        index: usize,
        kind: String,
    },
}
