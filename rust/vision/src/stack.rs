// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading micrograph slices from a directory.

use std::path::{Path, PathBuf};

use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::binarize::{binarize, process, BinarizerOptions};
use crate::error::{Error, Result};
use crate::mask::VoxelMask;

const EXTENSIONS: [&str; 4] = ["png", "tif", "tiff", "jpg"];

/// Grayscale slices named `slice<N>.<ext>`, ordered by slice number.
#[derive(Debug, Clone)]
pub struct ImageStack {
    paths: Vec<PathBuf>,
    images: Vec<GrayImage>,
}

/// Slice number of a `slice<N>` file stem, if it has one.
fn slice_number(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("slice")?;
    digits.trim_start_matches(['_', '-']).parse().ok()
}

fn is_slice(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("slice"));
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    named && supported && path.is_file()
}

impl ImageStack {
    /// Loads every slice image in `dir`.
    ///
    /// With `depth = Some((first, last))` only slices numbered in
    /// `first..last` are kept; unnumbered slices are then skipped.
    pub fn from_directory(dir: impl AsRef<Path>, depth: Option<(usize, usize)>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            Error::ImageDirectory(format!("cannot read {}: {e}", dir.display()))
        })?;

        let mut paths: Vec<(Option<usize>, PathBuf)> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_slice(p))
            .map(|p| (slice_number(&p), p))
            .filter(|(n, _)| match (depth, n) {
                (None, _) => true,
                (Some((first, last)), Some(n)) => (first..last).contains(n),
                (Some(_), None) => false,
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::ImageDirectory(format!(
                "no slice images ({}) in {}",
                EXTENSIONS.join(", "),
                dir.display()
            )));
        }

        let paths: Vec<PathBuf> = paths.into_iter().map(|(_, p)| p).collect();
        let images = paths
            .par_iter()
            .map(|p| Ok(image::open(p)?.to_luma8()))
            .collect::<Result<Vec<_>>>()?;
        info!(dir = %dir.display(), slices = images.len(), "loaded image stack");
        Ok(Self { paths, images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn images(&self) -> &[GrayImage] {
        &self.images
    }

    /// Binarizes every slice: one slice gives a planar mask, several give a
    /// volume with slice `i` at `z == i`.
    pub fn binarize(&self, options: &BinarizerOptions) -> Result<VoxelMask> {
        match self.images.as_slice() {
            [] => Err(Error::ImageDirectory("empty image stack".into())),
            [single] => binarize(single, options),
            many => {
                let binary = many
                    .par_iter()
                    .map(|img| process(img, options))
                    .collect::<Result<Vec<_>>>()?;
                let mask = VoxelMask::from_slices(&binary)?;
                debug!(slices = many.len(), foreground = mask.count(), "binarized stack");
                Ok(mask)
            }
        }
    }
}
