// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Calibration batches from image files.

use crate::BatchStream;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::PathBuf;
use tensor_core::Dims;

/// ImageNet channel means, RGB.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations, RGB.
const STD: [f32; 3] = [0.229, 0.224, 0.225];
const SCALE: f32 = 1.0 / 255.0;

/// Streams batches of preprocessed images.
///
/// Each image is resized to the input `H x W`, converted to RGB, scaled to
/// `[0, 1]` and normalized with the ImageNet mean and standard deviation,
/// then laid out CHW. Only full batches are produced: a trailing partial
/// batch is dropped. Images that fail to load are skipped with a warning.
#[derive(Debug)]
pub struct ImageStream {
    dims: Dims,
    images: Vec<PathBuf>,
    buffer: Vec<f32>,
    next_image: usize,
    served: usize,
}

impl ImageStream {
    /// Creates a stream of `batch_size`-image batches for an NCHW input of
    /// the given dims; axis 0 of `input_dims` is ignored.
    pub fn new(batch_size: usize, input_dims: &Dims, images: Vec<PathBuf>) -> Self {
        let dims = input_dims.with_batch(batch_size as i64);
        let len = dims.num_elements().unwrap_or(0);
        if len == 0 {
            tracing::warn!("calibration input dims {} are not fully static", dims);
        }
        Self {
            dims,
            images,
            buffer: vec![0.0; len],
            next_image: 0,
            served: 0,
        }
    }

    /// Number of full batches the image list can fill.
    pub fn max_batches(&self) -> usize {
        match self.batch_size() {
            0 => 0,
            b => self.images.len() / b,
        }
    }

    fn chw(&self) -> Option<(usize, usize, usize)> {
        match self.dims.as_slice() {
            &[_, c, h, w] if c > 0 && h > 0 && w > 0 => Some((c as usize, h as usize, w as usize)),
            _ => None,
        }
    }
}

impl BatchStream for ImageStream {
    fn batch_size(&self) -> usize {
        self.dims.dim(0).unwrap_or(0).max(0) as usize
    }

    fn dims(&self) -> &Dims {
        &self.dims
    }

    fn next_batch(&mut self) -> Option<&[f32]> {
        let (c, h, w) = self.chw()?;
        let batch = self.batch_size();
        if batch == 0 || self.served >= self.max_batches() {
            return None;
        }
        let per_image = c * h * w;

        let mut filled = 0;
        while filled < batch {
            let path = self.images.get(self.next_image)?;
            self.next_image += 1;
            match image::open(path) {
                Ok(img) => {
                    let out = &mut self.buffer[filled * per_image..(filled + 1) * per_image];
                    preprocess(&img, c, h, w, out);
                    filled += 1;
                }
                Err(e) => {
                    tracing::warn!("skipping calibration image '{}': {e}", path.display());
                }
            }
        }

        self.served += 1;
        tracing::debug!(batch = self.served, "calibration batch ready");
        Some(self.buffer.as_slice())
    }

    fn reset(&mut self) {
        self.next_image = 0;
        self.served = 0;
    }

    fn batches_served(&self) -> usize {
        self.served
    }
}

/// Resizes and normalizes one image into `out` (`c * h * w` values, CHW).
///
/// Channels beyond the third reuse the blue plane's statistics.
pub fn preprocess(img: &DynamicImage, c: usize, h: usize, w: usize, out: &mut [f32]) {
    let rgb = img
        .resize_exact(w as u32, h as u32, FilterType::Triangle)
        .to_rgb8();
    let plane = h * w;
    for (i, pixel) in rgb.pixels().enumerate() {
        for ch in 0..c {
            let src = ch.min(2);
            let v = pixel[src] as f32 * SCALE;
            out[ch * plane + i] = (v - MEAN[src]) / STD[src];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_images(dir: &std::path::Path, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = dir.join(format!("img_{i}.png"));
                RgbImage::from_pixel(16, 8, Rgb([255, 0, 128])).save(&path).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_preprocess_normalizes_chw() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
        let mut out = vec![0.0; 3 * 2 * 2];
        preprocess(&img, 3, 2, 2, &mut out);

        let red = (1.0 - MEAN[0]) / STD[0];
        let green = (0.0 - MEAN[1]) / STD[1];
        assert!(out[..4].iter().all(|v| (v - red).abs() < 1e-5));
        assert!(out[4..8].iter().all(|v| (v - green).abs() < 1e-5));
    }

    #[test]
    fn test_full_batches_only() {
        let dir = tempfile::tempdir().unwrap();
        let images = write_images(dir.path(), 5);
        let mut s = ImageStream::new(2, &Dims::nchw(-1, 3, 4, 4), images);
        assert_eq!(s.max_batches(), 2);
        assert_eq!(s.dims().as_slice(), &[2, 3, 4, 4]);

        assert_eq!(s.next_batch().unwrap().len(), 2 * 3 * 4 * 4);
        assert!(s.next_batch().is_some());
        assert!(s.next_batch().is_none());
        assert_eq!(s.batches_served(), 2);

        s.reset();
        assert!(s.next_batch().is_some());
    }

    #[test]
    fn test_unreadable_images_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = write_images(dir.path(), 2);
        images.insert(1, dir.path().join("missing.png"));
        let mut s = ImageStream::new(2, &Dims::nchw(1, 3, 4, 4), images);
        // Three paths fill one batch of two once the missing one is skipped.
        assert!(s.next_batch().is_some());
        assert!(s.next_batch().is_none());
    }

    #[test]
    fn test_no_images() {
        let mut s = ImageStream::new(4, &Dims::nchw(-1, 3, 8, 8), Vec::new());
        assert_eq!(s.max_batches(), 0);
        assert!(s.next_batch().is_none());
    }
}
