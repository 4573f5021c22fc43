//! Reader for the MNIST IDX files.
//!
//! Both formats are big-endian: a magic number, one `u32` per dimension, then
//! the raw `u8` payload. Pixels are kept as raw intensities in `0..=255`.
use std::path::{Path, PathBuf};

use ndarray::Array3;

use crate::data::split::Split;
use crate::error::EvaluationError;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Load the training and test splits from `dir`.
pub fn load_mnist<P: AsRef<Path>>(dir: P) -> Result<(Split, Split), EvaluationError> {
    let dir = dir.as_ref();
    let train = load_split(&dir.join(TRAIN_IMAGES), &dir.join(TRAIN_LABELS))?;
    let test = load_split(&dir.join(TEST_IMAGES), &dir.join(TEST_LABELS))?;
    log::info!(
        "Loaded MNIST from {}: {} training and {} test samples",
        dir.display(),
        train.len(),
        test.len()
    );
    Ok((train, test))
}

fn load_split(images_path: &Path, labels_path: &Path) -> Result<Split, EvaluationError> {
    let images = read_idx_images(images_path)?;
    let labels = read_idx_labels(labels_path)?;
    Split::new(images, labels)
}

pub fn read_idx_images(path: &Path) -> Result<Array3<f64>, EvaluationError> {
    let bytes = std::fs::read(path).map_err(|e| EvaluationError::io(path, e))?;
    let mut header = IdxHeader::new(path, &bytes);
    header.expect_magic(IMAGES_MAGIC)?;
    let n = header.next_dim()?;
    let rows = header.next_dim()?;
    let cols = header.next_dim()?;
    let len = n
        .checked_mul(rows)
        .and_then(|v| v.checked_mul(cols))
        .ok_or_else(|| header.invalid(format!("dimensions {n}x{rows}x{cols} overflow")))?;
    let pixels = header.payload(len)?;

    let data = pixels.iter().map(|&p| p as f64).collect();
    Array3::from_shape_vec((n, rows, cols), data).map_err(|e| EvaluationError::Dataset {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn read_idx_labels(path: &Path) -> Result<Vec<usize>, EvaluationError> {
    let bytes = std::fs::read(path).map_err(|e| EvaluationError::io(path, e))?;
    let mut header = IdxHeader::new(path, &bytes);
    header.expect_magic(LABELS_MAGIC)?;
    let n = header.next_dim()?;
    Ok(header.payload(n)?.iter().map(|&l| l as usize).collect())
}

/// Cursor over the big-endian header of one IDX file.
struct IdxHeader<'a> {
    path: PathBuf,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> IdxHeader<'a> {
    fn new(path: &Path, bytes: &'a [u8]) -> Self {
        IdxHeader {
            path: path.to_path_buf(),
            bytes,
            offset: 0,
        }
    }

    fn invalid(&self, reason: String) -> EvaluationError {
        EvaluationError::Dataset {
            path: self.path.clone(),
            reason,
        }
    }

    fn next_u32(&mut self) -> Result<u32, EvaluationError> {
        let end = self.offset + 4;
        let word: [u8; 4] = self
            .bytes
            .get(self.offset..end)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| self.invalid("truncated header".to_string()))?;
        self.offset = end;
        Ok(u32::from_be_bytes(word))
    }

    fn next_dim(&mut self) -> Result<usize, EvaluationError> {
        Ok(self.next_u32()? as usize)
    }

    fn expect_magic(&mut self, magic: u32) -> Result<(), EvaluationError> {
        let found = self.next_u32()?;
        if found != magic {
            return Err(self.invalid(format!(
                "magic number {found:#010x}, expected {magic:#010x}"
            )));
        }
        Ok(())
    }

    /// The remaining bytes, which must be exactly `len` long.
    fn payload(&self, len: usize) -> Result<&'a [u8], EvaluationError> {
        let rest = &self.bytes[self.offset..];
        if rest.len() != len {
            return Err(self.invalid(format!(
                "expected {len} payload bytes, found {}",
                rest.len()
            )));
        }
        Ok(rest)
    }
}
