// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grayscale micrograph → binary mask.
//!
//! Filters run in a fixed order: gamma, median, Gaussian blur, auto-level,
//! low-pass, edge enhancement, threshold, and finally inversion for dark
//! foregrounds. Each filter is off unless enabled in [`BinarizerOptions`].

use std::path::Path;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mask::VoxelMask;

/// How the final threshold level is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreshMethod {
    /// Fixed level from `thresh`.
    #[default]
    Global,
    /// Local mean over a `(2·asize+1)²` block.
    Adaptive,
    /// Otsu's histogram split.
    Otsu,
}

/// Binarization options, usually read from `img_options.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinarizerOptions {
    pub thresh_method: ThreshMethod,
    /// Exponent of the gamma correction; 1 leaves the image unchanged.
    pub gamma: f64,
    /// 3×3 median filter.
    pub md_filter: bool,
    /// Stretch the intensity range to 0..=255.
    pub autolvl: bool,
    /// Gaussian blur with a `(2·bsize+1)` kernel.
    pub g_blur: bool,
    /// Foreground is darker than background.
    pub fg_color: bool,
    pub laplacian: bool,
    pub scharr: bool,
    pub sobel: bool,
    /// Box blur of radius `wsize`.
    pub lowpass: bool,
    pub asize: u32,
    pub bsize: u32,
    pub wsize: u32,
    /// Global level; pixels strictly above it are foreground.
    pub thresh: f64,
}

impl Default for BinarizerOptions {
    fn default() -> Self {
        Self {
            thresh_method: ThreshMethod::Global,
            gamma: 1.0,
            md_filter: false,
            autolvl: false,
            g_blur: false,
            fg_color: false,
            laplacian: false,
            scharr: false,
            sobel: false,
            lowpass: false,
            asize: 3,
            bsize: 1,
            wsize: 1,
            thresh: 128.0,
        }
    }
}

impl BinarizerOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if !(0.0..=255.0).contains(&self.thresh) {
            return Err(Error::InvalidArgument(format!(
                "thresh must lie in 0..=255, got {}",
                self.thresh
            )));
        }
        Ok(())
    }
}

/// Runs the filter chain and returns the black/white image.
pub fn process(image: &GrayImage, options: &BinarizerOptions) -> Result<GrayImage> {
    options.validate()?;
    let mut img = image.clone();

    if options.gamma != 1.0 {
        img = gamma(&img, options.gamma);
    }
    if options.md_filter {
        img = imageproc::filter::median_filter(&img, 1, 1);
    }
    if options.g_blur {
        img = gaussian_blur(&img, kernel_sigma(2 * options.bsize + 1));
    }
    if options.autolvl {
        img = autolevel(&img);
    }
    if options.lowpass {
        img = imageproc::filter::box_filter(&img, options.wsize, options.wsize);
    }
    if options.laplacian {
        img = add_saturating(&img, &laplacian_edges(&img));
    }
    if options.scharr {
        img = add_saturating(&img, &scharr_edges(&img));
    }
    if options.sobel {
        img = add_saturating(&img, &sobel_edges(&img));
    }

    let mut binary = match options.thresh_method {
        ThreshMethod::Global => threshold(&img, options.thresh.floor() as u8),
        ThreshMethod::Adaptive => adaptive_threshold(&img, options.asize),
        ThreshMethod::Otsu => otsu_threshold(&img),
    };
    if options.fg_color {
        binary = invert(&binary);
    }
    Ok(binary)
}

/// Binarizes one image into a planar mask.
pub fn binarize(image: &GrayImage, options: &BinarizerOptions) -> Result<VoxelMask> {
    let binary = process(image, options)?;
    let mask = VoxelMask::from_gray(&binary);
    debug!(
        width = image.width(),
        height = image.height(),
        foreground = mask.count(),
        method = ?options.thresh_method,
        "binarized image"
    );
    Ok(mask)
}

/// Sigma OpenCV derives for an odd Gaussian kernel size.
fn kernel_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// `out = 255 · (in / 255)^gamma`
fn gamma(image: &GrayImage, exponent: f64) -> GrayImage {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = (255.0 * (i as f64 / 255.0).powf(exponent)).round() as u8;
    }
    let mut out = image.clone();
    for px in out.pixels_mut() {
        px.0[0] = lut[px.0[0] as usize];
    }
    out
}

/// Linear stretch of the occupied intensity range to the full range.
fn autolevel(image: &GrayImage) -> GrayImage {
    let (lo, hi) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if hi <= lo {
        return image.clone();
    }
    let scale = 255.0 / (hi - lo) as f64;
    let mut out = image.clone();
    for px in out.pixels_mut() {
        px.0[0] = ((px.0[0] - lo) as f64 * scale).round() as u8;
    }
    out
}

fn to_image(width: u32, height: u32, values: impl Iterator<Item = f64>) -> GrayImage {
    let mut out = GrayImage::new(width, height);
    for (px, v) in out.pixels_mut().zip(values) {
        px.0[0] = v.clamp(0.0, 255.0) as u8;
    }
    out
}

/// Absolute 4-neighbour Laplacian response.
pub fn laplacian_edges(image: &GrayImage) -> GrayImage {
    let response = imageproc::filter::laplacian_filter(image);
    let values = response.pixels().map(|p| f64::from(p.0[0]).abs());
    to_image(image.width(), image.height(), values)
}

/// Scharr gradient magnitude.
pub fn scharr_edges(image: &GrayImage) -> GrayImage {
    let gx = imageproc::gradients::horizontal_scharr(image);
    let gy = imageproc::gradients::vertical_scharr(image);
    let values = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(a, b)| f64::from(a.0[0]).hypot(f64::from(b.0[0])));
    to_image(image.width(), image.height(), values)
}

/// Sobel gradient magnitude.
pub fn sobel_edges(image: &GrayImage) -> GrayImage {
    let gradients = imageproc::gradients::sobel_gradients(image);
    let values = gradients.pixels().map(|p| f64::from(p.0[0]));
    to_image(image.width(), image.height(), values)
}

fn add_saturating(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = a.clone();
    for (px, other) in out.pixels_mut().zip(b.pixels()) {
        px.0[0] = px.0[0].saturating_add(other.0[0]);
    }
    out
}

/// Local-mean threshold over a `(2·block_radius+1)²` neighbourhood.
pub fn adaptive_threshold(image: &GrayImage, block_radius: u32) -> GrayImage {
    imageproc::contrast::adaptive_threshold(image, block_radius)
}

/// Invert a binary image
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        pixel.0[0] = 255 - pixel.0[0];
    }
    result
}

/// Pixels strictly above `level` become white, the rest black.
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel.0[0] > level { 255 } else { 0 };
        result.put_pixel(x, y, Luma([value]));
    }
    result
}

pub fn otsu_threshold(image: &GrayImage) -> GrayImage {
    threshold(image, otsu_level(image))
}

/// Otsu's level: the split maximising between-class variance.
fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = (image.width() * image.height()) as f64;
    if total == 0.0 {
        return 128;
    }
    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_bg = 0.0;
    let mut weight_bg = 0.0;
    let mut best = (0.0, 0u8);
    for (t, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_total - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best.0 {
            best = (variance, t as u8);
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halves(left: u8, right: u8) -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { left } else { right }]))
    }

    #[test]
    fn global_threshold_is_strict() {
        let img = halves(100, 200);
        let opts = BinarizerOptions {
            thresh: 100.0,
            ..Default::default()
        };
        let mask = binarize(&img, &opts).unwrap();
        assert_eq!(mask.count(), 50);
        assert!(mask.get(&fibergt_graph::Voxel::planar(9, 0)));
    }

    #[test]
    fn dark_foreground_inverts() {
        let img = halves(20, 220);
        let opts = BinarizerOptions {
            thresh_method: ThreshMethod::Otsu,
            fg_color: true,
            ..Default::default()
        };
        let mask = binarize(&img, &opts).unwrap();
        assert!(mask.get(&fibergt_graph::Voxel::planar(0, 0)));
        assert!(!mask.get(&fibergt_graph::Voxel::planar(9, 9)));
    }

    #[test]
    fn otsu_splits_bimodal_image() {
        let img = halves(40, 180);
        let level = otsu_level(&img);
        assert!((40..180).contains(&level));
    }

    #[test]
    fn gamma_lut_keeps_extremes() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[0, 128, 255][x as usize]]));
        let out = gamma(&img, 2.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(2, 0).0[0], 255);
        assert!(out.get_pixel(1, 0).0[0] < 128);
    }

    #[test]
    fn autolevel_stretches_range() {
        let img = halves(100, 150);
        let out = autolevel(&img);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(9, 0).0[0], 255);
    }

    #[test]
    fn edge_filters_are_flat_on_uniform_image() {
        let img = GrayImage::from_pixel(6, 6, Luma([77]));
        assert!(laplacian_edges(&img).pixels().all(|p| p.0[0] == 0));
        assert!(scharr_edges(&img).pixels().all(|p| p.0[0] == 0));
        assert!(sobel_edges(&img).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn edge_filters_respond_at_a_step() {
        let img = halves(0, 100);
        for edges in [laplacian_edges(&img), scharr_edges(&img), sobel_edges(&img)] {
            assert!(edges.get_pixel(4, 5).0[0] >= 100);
            assert_eq!(edges.get_pixel(0, 5).0[0], 0);
            assert_eq!(edges.get_pixel(9, 5).0[0], 0);
        }
    }

    #[test]
    fn full_chain_runs() {
        let img = halves(30, 200);
        let opts = BinarizerOptions {
            thresh_method: ThreshMethod::Adaptive,
            gamma: 1.5,
            md_filter: true,
            g_blur: true,
            autolvl: true,
            lowpass: true,
            laplacian: true,
            scharr: true,
            sobel: true,
            ..Default::default()
        };
        let mask = binarize(&img, &opts).unwrap();
        assert_eq!(mask.shape(), fibergt_graph::Shape::planar(10, 10));
    }

    #[test]
    fn options_reject_unknown_keys_and_bad_values() {
        let ok = BinarizerOptions::from_json(r#"{"thresh_method": "otsu", "gamma": 3.0}"#).unwrap();
        assert_eq!(ok.thresh_method, ThreshMethod::Otsu);
        assert!(BinarizerOptions::from_json(r#"{"Thresh_method": 0}"#).is_err());
        assert!(BinarizerOptions::from_json(r#"{"gamma": 0.0}"#).is_err());
        assert!(BinarizerOptions::from_json(r#"{"thresh": 300.0}"#).is_err());
    }

    #[test]
    fn options_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_options.json");
        std::fs::write(&path, r#"{"thresh": 90.0, "md_filter": true}"#).unwrap();
        let opts = BinarizerOptions::from_path(&path).unwrap();
        assert!(opts.md_filter);
        assert_eq!(opts.thresh, 90.0);
    }
}
