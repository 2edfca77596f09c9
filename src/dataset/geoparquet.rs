//! GeoParquet reading.
//!
//! Non-binary columns are re-encoded as JSON objects with `arrow-json` so
//! they type exactly like GeoJSON properties; the WKB `geometry` column is
//! decoded separately with `geozero`.

use std::fs::File;
use std::path::Path;

use arrow_array::{Array, BinaryArray, LargeBinaryArray, RecordBatch};
use arrow_schema::DataType;
use geozero::wkb::Wkb;
use geozero::ToGeo;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value};
use tracing::debug;

use super::decode::RawRow;
use crate::error::LoadError;

const GEOMETRY_COLUMN: &str = "geometry";

fn is_binary(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Binary | DataType::LargeBinary)
}

/// Read every row of a GeoParquet file.
pub fn read_parquet(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let parquet_err = |source| LoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|source| LoadError::Arrow {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("{}: batch of {} rows", path.display(), batch.num_rows());
        let offset = rows.len();
        rows.extend(batch_rows(&batch, path, offset)?);
    }

    Ok(rows)
}

fn batch_rows(batch: &RecordBatch, path: &Path, offset: usize) -> Result<Vec<RawRow>, LoadError> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let schema = batch.schema();
    let geometry = match schema.index_of(GEOMETRY_COLUMN) {
        Ok(i) if is_binary(schema.field(i).data_type()) => Some(batch.column(i)),
        Ok(i) => {
            return Err(LoadError::InvalidRow {
                path: path.to_path_buf(),
                index: offset,
                reason: format!(
                    "geometry column must hold WKB, found {}",
                    schema.field(i).data_type()
                ),
            })
        }
        Err(_) => None,
    };

    let property_columns: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| !is_binary(field.data_type()))
        .map(|(i, _)| i)
        .collect();
    let objects = property_objects(batch, &property_columns, path, offset)?;

    objects
        .into_iter()
        .enumerate()
        .map(|(i, properties)| {
            let geometry = geometry
                .and_then(|column| wkb_at(column.as_ref(), i))
                .map(|bytes| decode_wkb(bytes, path, offset + i))
                .transpose()?;
            Ok(RawRow {
                feature_id: None,
                properties,
                geometry,
                bbox: None,
            })
        })
        .collect()
}

/// One JSON object per row; null values are left out
fn property_objects(
    batch: &RecordBatch,
    columns: &[usize],
    path: &Path,
    offset: usize,
) -> Result<Vec<Map<String, Value>>, LoadError> {
    let arrow_err = |source| LoadError::Arrow {
        path: path.to_path_buf(),
        source,
    };

    let projected = batch.project(columns).map_err(arrow_err)?;
    let mut writer = arrow_json::ArrayWriter::new(Vec::new());
    writer.write(&projected).map_err(arrow_err)?;
    writer.finish().map_err(arrow_err)?;
    let json = writer.into_inner();

    let objects: Vec<Map<String, Value>> = if json.is_empty() {
        vec![Map::new(); batch.num_rows()]
    } else {
        serde_json::from_slice(&json).map_err(|e| LoadError::InvalidRow {
            path: path.to_path_buf(),
            index: offset,
            reason: e.to_string(),
        })?
    };

    if objects.len() != batch.num_rows() {
        return Err(LoadError::InvalidRow {
            path: path.to_path_buf(),
            index: offset,
            reason: format!(
                "expected {} rows in batch, decoded {}",
                batch.num_rows(),
                objects.len()
            ),
        });
    }

    Ok(objects)
}

fn wkb_at(column: &dyn Array, i: usize) -> Option<&[u8]> {
    if column.is_null(i) {
        return None;
    }
    if let Some(array) = column.as_any().downcast_ref::<BinaryArray>() {
        Some(array.value(i))
    } else {
        column
            .as_any()
            .downcast_ref::<LargeBinaryArray>()
            .map(|array| array.value(i))
    }
}

fn decode_wkb(bytes: &[u8], path: &Path, index: usize) -> Result<geo::Geometry<f64>, LoadError> {
    Wkb(bytes.to_vec())
        .to_geo()
        .map_err(|e| LoadError::Wkb {
            path: path.to_path_buf(),
            index,
            reason: e.to_string(),
        })
}
