//! # Perceptual Hashing Module
//!
//! Perceptual hashing generates "fingerprints" that remain similar for visually similar
//! frames, unlike cryptographic hashes where minor changes produce completely different
//! outputs. Every frame sampled from a video (or the still image itself) is reduced to
//! one fixed-length [`PHash`].
//!
//! Two methods are offered:
//!
//! 1. DCT hash: grayscale, downscale to `4n × 4n`, 2-D DCT-II, keep the `n × n`
//!    low-frequency block and compare each coefficient against the block median.
//! 2. Mean hash: grayscale, downscale to `n × n`, compare each pixel against the mean.
//!
//! Both produce `n²` bits, so a run with `n = 8` compares 64-bit fingerprints.
//!
//! ## Hamming Distance Interpretation (64 bits)
//!
//! - 0-3: Nearly identical frames (re-encodes, rescales)
//! - 4-10: Similar frames (same shot with moderate differences)
//! - >10: Different frames

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{s, Array2};
use rustdct::{DctPlanner, TransformType2And3};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::HashAlgorithm;
use crate::error::{Error, Result};
use crate::media::sampler::load_frame;

/// The DCT input is this many times wider than the kept coefficient block
const HIGHFREQ_FACTOR: u32 = 4;

/// A perceptual hash stored as a packed bit vector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PHash {
    words: Vec<u64>,
    bits: u32,
}

impl PHash {
    /// Pack a sequence of bits, first bit in the lowest position
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut words = vec![0u64; bits.len().div_ceil(64)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                words[i / 64] |= 1u64 << (i % 64);
            }
        }

        Self {
            words,
            bits: bits.len() as u32,
        }
    }

    /// Number of bits in the hash
    pub fn bit_len(&self) -> u32 {
        self.bits
    }

    /// Calculate the Hamming distance between two perceptual hashes
    ///
    /// Returns `None` when the hashes differ in length.
    pub fn distance(&self, other: &PHash) -> Option<u32> {
        if self.bits != other.bits {
            return None;
        }

        Some(
            self.words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }

    /// Check if two frames are perceptually similar based on a threshold
    pub fn is_similar(&self, other: &PHash, threshold: u32) -> bool {
        self.distance(other).is_some_and(|d| d <= threshold)
    }

    /// Hex rendering, most significant word first
    pub fn to_hex(&self) -> String {
        self.words
            .iter()
            .rev()
            .map(|w| format!("{:016x}", w))
            .collect()
    }
}

/// Turns decoded frames into fingerprints with one fixed algorithm and size
#[derive(Debug, Clone, Copy)]
pub struct PerceptualHasher {
    algorithm: HashAlgorithm,
    hash_size: u32,
}

impl PerceptualHasher {
    pub fn new(algorithm: HashAlgorithm, hash_size: u32) -> Self {
        Self {
            algorithm,
            hash_size,
        }
    }

    /// Hash one frame belonging to `path`
    ///
    /// A zero-dimension frame is rejected with [`Error::Hash`]; the sampler
    /// never hands one over, so this signals a decoding bug upstream.
    pub fn hash(&self, path: &Path, frame: &DynamicImage) -> Result<PHash> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::Hash {
                path: path.to_path_buf(),
                reason: format!(
                    "frame has zero dimension ({}x{})",
                    frame.width(),
                    frame.height()
                ),
            });
        }

        Ok(match self.algorithm {
            HashAlgorithm::Dct => dct_hash(frame, self.hash_size),
            HashAlgorithm::Mean => mean_hash(frame, self.hash_size),
        })
    }

    /// Decode an image file and hash it
    pub fn hash_file(&self, path: &Path) -> Result<PHash> {
        let frame = load_frame(path)?;
        self.hash(path, &frame)
    }
}

/// DCT-based perceptual hash of `hash_size²` bits
pub fn dct_hash(img: &DynamicImage, hash_size: u32) -> PHash {
    let n = hash_size as usize;
    let side = hash_size * HIGHFREQ_FACTOR;
    let small = img
        .grayscale()
        .resize_exact(side, side, FilterType::Lanczos3)
        .to_luma8();

    let side = side as usize;
    let mut matrix = Array2::from_shape_fn((side, side), |(y, x)| {
        small.get_pixel(x as u32, y as u32)[0] as f32
    });

    let mut planner = DctPlanner::new();
    let dct = planner.plan_dct2(side);

    // Rows, then columns via a transposed copy
    dct_rows(&mut matrix, &*dct);
    let mut columns = matrix.t().as_standard_layout().into_owned();
    dct_rows(&mut columns, &*dct);

    let low: Vec<f32> = columns.t().slice(s![..n, ..n]).iter().copied().collect();
    let median = median(&low);

    let bits: Vec<bool> = low.iter().map(|&c| c > median).collect();
    PHash::from_bits(&bits)
}

/// Average hash of `hash_size²` bits
pub fn mean_hash(img: &DynamicImage, hash_size: u32) -> PHash {
    let small = img
        .grayscale()
        .resize_exact(hash_size, hash_size, FilterType::Lanczos3)
        .to_luma8();

    let pixels: Vec<f32> = small.pixels().map(|p| p[0] as f32).collect();
    let mean = pixels.iter().sum::<f32>() / pixels.len() as f32;

    let bits: Vec<bool> = pixels.iter().map(|&p| p > mean).collect();
    PHash::from_bits(&bits)
}

fn dct_rows(matrix: &mut Array2<f32>, dct: &dyn TransformType2And3<f32>) {
    let width = matrix.ncols();
    if let Some(data) = matrix.as_slice_mut() {
        for row in data.chunks_exact_mut(width) {
            dct.process_dct2(row);
        }
    }
}

fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
