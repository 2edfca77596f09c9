//! Decoding of dataset records into locality and area rows.
//!
//! Every input format is first read into [`RawRow`]s (a JSON property map
//! plus a decoded geometry); typing the properties is shared by all formats.

use geo::BoundingRect;
use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::LoadError;
use crate::models::{
    AreaGeometry, BBox, Locality, LocalityAreaRow, LocalityNames, LocalityType, SourceInfo,
};

/// How a dataset file is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// A FeatureCollection or a single Feature
    Document,
    /// One Feature per line
    Sequence,
    /// GeoParquet: one row per feature, WKB in the `geometry` column
    Parquet,
}

impl FileFormat {
    /// Format implied by the file name, `None` for files that are not data
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".parquet") {
            return Some(FileFormat::Parquet);
        }

        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".geojson") || name.ends_with(".json") {
            Some(FileFormat::Document)
        } else if name.ends_with(".geojsonseq")
            || name.ends_with(".geojsonl")
            || name.ends_with(".ndjson")
        {
            Some(FileFormat::Sequence)
        } else {
            None
        }
    }
}

/// One dataset record before its properties are typed.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// GeoJSON feature id, used when the properties carry no `id`
    pub feature_id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Option<geo::Geometry<f64>>,
    /// GeoJSON feature `bbox` member
    pub bbox: Option<BBox>,
}

impl RawRow {
    pub fn from_feature(feature: Feature, path: &Path) -> Result<Self, LoadError> {
        let feature_id = match feature.id {
            Some(Id::String(s)) => Some(s),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        };
        let bbox = feature
            .bbox
            .filter(|b| b.len() == 4)
            .map(|b| BBox::new(b[0] as f32, b[1] as f32, b[2] as f32, b[3] as f32));
        let geometry = feature
            .geometry
            .map(|g| {
                geo::Geometry::<f64>::try_from(g).map_err(|source| LoadError::GeoJson {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            feature_id,
            properties: feature.properties.unwrap_or_default(),
            geometry,
            bbox,
        })
    }
}

/// Read every record of a dataset file.
pub fn read_rows(path: &Path, format: FileFormat) -> Result<Vec<RawRow>, LoadError> {
    match format {
        FileFormat::Parquet => super::geoparquet::read_parquet(path),
        FileFormat::Document | FileFormat::Sequence => read_features(path, format)?
            .into_iter()
            .map(|feature| RawRow::from_feature(feature, path))
            .collect(),
    }
}

/// Read every feature from a GeoJSON file, decompressing `.gz` files.
fn read_features(path: &Path, format: FileFormat) -> Result<Vec<Feature>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let geojson_err = |source| LoadError::GeoJson {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(flate2::read::GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(io_err)?;

    if format == FileFormat::Document {
        return match content.parse::<GeoJson>().map_err(geojson_err)? {
            GeoJson::FeatureCollection(fc) => Ok(fc.features),
            GeoJson::Feature(feature) => Ok(vec![feature]),
            GeoJson::Geometry(_) => Err(LoadError::NotFeatures {
                path: path.to_path_buf(),
            }),
        };
    }

    let mut features = Vec::new();
    for line in content.lines() {
        // RFC 8142 record separators are optional
        let line = line.trim_start_matches('\u{1e}').trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<GeoJson>().map_err(geojson_err)? {
            GeoJson::Feature(feature) => features.push(feature),
            _ => {
                return Err(LoadError::NotFeatures {
                    path: path.to_path_buf(),
                })
            }
        }
    }
    Ok(features)
}

#[derive(Debug, Deserialize)]
struct LocalityProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    bbox: Option<BBox>,
    #[serde(default)]
    admin_level: Option<i64>,
    #[serde(default)]
    is_maritime: Option<bool>,
    #[serde(default)]
    geopol_display: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    locality_type: Option<LocalityType>,
    #[serde(default)]
    wikidata: Option<String>,
    #[serde(default)]
    context_id: Option<String>,
    #[serde(default)]
    population: Option<i64>,
    #[serde(default)]
    iso_country_code_alpha_2: Option<String>,
    #[serde(default)]
    iso_sub_country_code: Option<String>,
    #[serde(default)]
    default_language: Option<String>,
    #[serde(default)]
    driving_side: Option<String>,
    #[serde(default)]
    names: Option<LocalityNames>,
    #[serde(flatten)]
    base: SourceInfo,
}

#[derive(Debug, Deserialize)]
struct AreaProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    locality_id: Option<String>,
    #[serde(default)]
    bbox: Option<BBox>,
    #[serde(flatten)]
    base: SourceInfo,
}

fn properties<T>(row: &mut RawRow, path: &Path, index: usize) -> Result<T, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    let props = std::mem::take(&mut row.properties);
    serde_json::from_value(Value::Object(props)).map_err(|e| LoadError::InvalidRow {
        path: path.to_path_buf(),
        index,
        reason: e.to_string(),
    })
}

/// Id from properties, falling back to the GeoJSON feature id
fn row_id(
    from_props: Option<String>,
    row: &RawRow,
    path: &Path,
    index: usize,
) -> Result<String, LoadError> {
    from_props
        .filter(|s| !s.is_empty())
        .or_else(|| row.feature_id.clone())
        .ok_or_else(|| LoadError::InvalidRow {
            path: path.to_path_buf(),
            index,
            reason: "missing id".to_string(),
        })
}

/// Bbox from the feature's `bbox` member or, failing that, its geometry
fn derived_bbox(row: &RawRow) -> Option<BBox> {
    row.bbox.or_else(|| {
        row.geometry
            .as_ref()
            .and_then(|g| g.bounding_rect())
            .map(|rect| {
                BBox::new(
                    rect.min().x as f32,
                    rect.min().y as f32,
                    rect.max().x as f32,
                    rect.max().y as f32,
                )
            })
    })
}

/// Decode a locality record. Its geometry is only used to derive a
/// missing bbox.
pub fn locality_from_row(mut row: RawRow, path: &Path, index: usize) -> Result<Locality, LoadError> {
    let props: LocalityProperties = properties(&mut row, path, index)?;
    let id = row_id(props.id, &row, path, index)?;
    let bbox = props.bbox.or_else(|| derived_bbox(&row));

    Ok(Locality {
        id,
        bbox,
        admin_level: props.admin_level,
        is_maritime: props.is_maritime,
        geopol_display: props.geopol_display,
        subtype: props.subtype,
        locality_type: props.locality_type,
        wikidata: props.wikidata,
        context_id: props.context_id,
        population: props.population,
        iso_country_code_alpha_2: props.iso_country_code_alpha_2,
        iso_sub_country_code: props.iso_sub_country_code,
        default_language: props.default_language,
        driving_side: props.driving_side,
        names: props.names.unwrap_or_default(),
        base: props.base,
    })
}

/// Decode a locality area record; only Polygon and MultiPolygon are accepted.
pub fn area_from_row(
    mut row: RawRow,
    path: &Path,
    index: usize,
) -> Result<LocalityAreaRow, LoadError> {
    let props: AreaProperties = properties(&mut row, path, index)?;
    let id = row_id(props.id, &row, path, index)?;

    let locality_id = props
        .locality_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LoadError::InvalidRow {
            path: path.to_path_buf(),
            index,
            reason: format!("area {} has no locality_id", id),
        })?;

    let geometry = row.geometry.take().ok_or_else(|| LoadError::InvalidRow {
        path: path.to_path_buf(),
        index,
        reason: format!("area {} has no geometry", id),
    })?;

    let geometry = match geometry {
        geo::Geometry::Polygon(p) => AreaGeometry::Polygon(p),
        geo::Geometry::MultiPolygon(mp) => AreaGeometry::MultiPolygon(mp),
        other => {
            return Err(LoadError::UnsupportedGeometry {
                path: path.to_path_buf(),
                index,
                kind: geometry_kind(&other).to_string(),
            })
        }
    };

    Ok(LocalityAreaRow {
        id,
        locality_id,
        bbox: props.bbox,
        base: props.base,
        geometry,
    })
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
