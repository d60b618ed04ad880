pub mod perceptual;

// Expose perceptual hash
pub use perceptual::{dct_hash, mean_hash, PHash, PerceptualHasher};
