//! Dataset loading.
//!
//! Walks the locality and locality-area directories (GeoParquet or GeoJSON
//! files), decodes every data file in parallel and merges the rows into the
//! builders in sorted path order, so repeated ids resolve the same way on
//! every start.

mod decode;
mod geoparquet;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::LoadError;
use crate::pip::{GeometryStoreBuilder, LocalityCatalogBuilder, ReverseService};

pub use decode::{area_from_row, locality_from_row, read_rows, FileFormat, RawRow};
pub use geoparquet::read_parquet;

/// List data files under `dir`, recursively, in sorted order
pub fn dataset_files(dir: &Path) -> Result<Vec<(PathBuf, FileFormat)>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::MissingDir(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        match FileFormat::detect(path) {
            Some(format) => files.push((path.to_path_buf(), format)),
            None => debug!("Skipping non-data file {}", path.display()),
        }
    }

    Ok(files)
}

/// Loads dataset directories into the index builders.
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    show_progress: bool,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a progress bar on stderr while decoding
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Load every locality file under `dir`, returning the number of records read
    pub fn load_localities(
        &self,
        dir: &Path,
        builder: &mut LocalityCatalogBuilder,
    ) -> Result<usize, LoadError> {
        info!("Loading localities from {}", dir.display());

        let batches = self.decode_dir(dir, decode::locality_from_row)?;
        let mut total = 0;
        for batch in batches {
            total += builder.load(batch);
        }

        info!("Loaded {} locality records ({} unique)", total, builder.len());
        Ok(total)
    }

    /// Load every locality area file under `dir`, returning the number of
    /// polygons indexed
    pub fn load_areas(
        &self,
        dir: &Path,
        builder: &mut GeometryStoreBuilder,
    ) -> Result<usize, LoadError> {
        info!("Loading locality areas from {}", dir.display());

        let batches = self.decode_dir(dir, decode::area_from_row)?;
        let mut total = 0;
        for batch in batches {
            total += builder.load(batch);
        }

        info!("Loaded {} area polygons", total);
        Ok(total)
    }

    /// Load both directories and freeze them into a ready service
    pub fn load_service(
        &self,
        locality_dir: &Path,
        area_dir: &Path,
    ) -> Result<ReverseService, LoadError> {
        let mut catalog = LocalityCatalogBuilder::new();
        self.load_localities(locality_dir, &mut catalog)?;

        let mut store = GeometryStoreBuilder::new();
        self.load_areas(area_dir, &mut store)?;

        Ok(ReverseService::new(store.freeze(), catalog.freeze()))
    }

    /// Decode all files of a directory in parallel, one batch per file,
    /// batches in path order
    fn decode_dir<T, F>(&self, dir: &Path, decode: F) -> Result<Vec<Vec<T>>, LoadError>
    where
        T: Send,
        F: Fn(RawRow, &Path, usize) -> Result<T, LoadError> + Sync,
    {
        let files = dataset_files(dir)?;
        let pb = self.progress_bar(files.len() as u64);

        let batches = files
            .par_iter()
            .map(|(path, format)| -> Result<Vec<T>, LoadError> {
                let raw = read_rows(path, *format)?;
                debug!("{}: {} records", path.display(), raw.len());

                let rows = raw
                    .into_iter()
                    .enumerate()
                    .map(|(index, row)| decode(row, path.as_path(), index))
                    .collect::<Result<Vec<T>, LoadError>>()?;

                pb.inc(1);
                Ok(rows)
            })
            .collect::<Result<Vec<Vec<T>>, LoadError>>()?;

        pb.finish_and_clear();
        Ok(batches)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
