use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::math::patches::steps;

/// Heaviside step applied element-wise: 1 for positive responses, 0 otherwise.
pub fn binarize(maps: &Array3<f64>) -> Array3<f64> {
    maps.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

/// Pack a stack of binary maps into one integer map.
///
/// Map `l` of `L` contributes bit `L - 1 - l`, so the first map is the most
/// significant bit.
pub fn binary_to_decimal(maps: &Array3<f64>) -> Array2<u32> {
    let n_maps = maps.len_of(Axis(0));
    let (h, w) = (maps.len_of(Axis(1)), maps.len_of(Axis(2)));

    let mut codes = Array2::<u32>::zeros((h, w));
    for (l, map) in maps.outer_iter().enumerate() {
        let weight = 1u32 << (n_maps - 1 - l);
        codes.zip_mut_with(&map, |code, &bit| {
            if bit > 0.0 {
                *code += weight;
            }
        });
    }
    codes
}

/// Histogram of codes in `0..n_bins` over non-overlapping `block`-sized tiles.
///
/// Tiles are visited top to bottom, then left to right; the histograms are
/// concatenated into one vector of length `n_tiles * n_bins`.
pub fn block_histogram(codes: ArrayView2<u32>, block: usize, n_bins: usize) -> Vec<f64> {
    let ys = steps(codes.nrows(), block, block);
    let xs = steps(codes.ncols(), block, block);

    let mut hist = vec![0.0; ys.len() * xs.len() * n_bins];
    let mut offset = 0;
    for &y in &ys {
        for &x in &xs {
            for &code in codes.slice(s![y..y + block, x..x + block]).iter() {
                let bin = code as usize;
                if bin < n_bins {
                    hist[offset + bin] += 1.0;
                }
            }
            offset += n_bins;
        }
    }
    hist
}
