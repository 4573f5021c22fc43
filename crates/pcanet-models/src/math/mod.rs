//! Image-level numerics used by the PCANet stages.
//!
//! `patches` covers the sliding-window geometry (window offsets, patch
//! extraction, strided filtering) and `binary` covers the hashing stage
//! (binarisation, bit-plane packing and block histograms).
pub mod binary;
pub mod patches;

pub use binary::{binarize, binary_to_decimal, block_histogram};
pub use patches::{convolve, output_size, patch_matrix, remove_patch_mean, steps};
