#![allow(dead_code)]

use std::path::Path;

use ndarray::Array3;
use pcanet_eval::data::Split;

/// 28x28 images of three stroke orientations, labelled by orientation.
pub fn strokes(n: usize, offset: usize) -> Split {
    let images = Array3::from_shape_fn((n, 28, 28), |(i, y, x)| {
        let k = i + offset;
        let lit = match k % 3 {
            0 => (x as isize - 14).abs() < 3,
            1 => (y as isize - 14).abs() < 3,
            _ => (x as isize - y as isize).abs() < 3,
        };
        let noise = ((k * 31 + y * 7 + x * 3) % 17) as f64;
        if lit {
            200.0 + noise
        } else {
            noise
        }
    });
    let labels = (0..n).map(|i| (i + offset) % 3).collect();
    Split::new(images, labels).expect("aligned split")
}

fn idx_images(split: &Split) -> Vec<u8> {
    let (n, rows, cols) = split.images.dim();
    let mut bytes = 0x0803u32.to_be_bytes().to_vec();
    for d in [n, rows, cols] {
        bytes.extend_from_slice(&(d as u32).to_be_bytes());
    }
    bytes.extend(split.images.iter().map(|&p| p as u8));
    bytes
}

fn idx_labels(split: &Split) -> Vec<u8> {
    let mut bytes = 0x0801u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(&(split.len() as u32).to_be_bytes());
    bytes.extend(split.labels.iter().map(|&l| l as u8));
    bytes
}

/// Write `train` and `test` as the four MNIST IDX files under `dir`.
pub fn write_mnist(dir: &Path, train: &Split, test: &Split) {
    std::fs::create_dir_all(dir).expect("create mnist dir");
    std::fs::write(dir.join("train-images-idx3-ubyte"), idx_images(train)).unwrap();
    std::fs::write(dir.join("train-labels-idx1-ubyte"), idx_labels(train)).unwrap();
    std::fs::write(dir.join("t10k-images-idx3-ubyte"), idx_images(test)).unwrap();
    std::fs::write(dir.join("t10k-labels-idx1-ubyte"), idx_labels(test)).unwrap();
}
