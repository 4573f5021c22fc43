use ndarray::{s, Array2, Array3, ArrayView2};

/// Top-left offsets of a `filter`-wide window sliding over an `input`-wide
/// axis with stride `step`.
///
/// Returns an empty vector when the window does not fit or when either size
/// is zero.
pub fn steps(input: usize, filter: usize, step: usize) -> Vec<usize> {
    if filter == 0 || step == 0 || filter > input {
        return Vec::new();
    }
    (0..=input - filter).step_by(step).collect()
}

/// Side length of the map produced by sliding `filter` over `input`.
pub fn output_size(input: usize, filter: usize, step: usize) -> usize {
    steps(input, filter, step).len()
}

/// Flatten every window of `image` into one row.
///
/// Rows are ordered by window position (top to bottom, then left to right)
/// and each row holds the window pixels in row-major order, so the result has
/// shape `(n_windows, filter * filter)`.
pub fn patch_matrix(image: ArrayView2<f64>, filter: usize, step: usize) -> Array2<f64> {
    let ys = steps(image.nrows(), filter, step);
    let xs = steps(image.ncols(), filter, step);

    let mut out = Array2::zeros((ys.len() * xs.len(), filter * filter));
    let mut row = 0;
    for &y in &ys {
        for &x in &xs {
            let window = image.slice(s![y..y + filter, x..x + filter]);
            out.row_mut(row)
                .iter_mut()
                .zip(window.iter())
                .for_each(|(o, &v)| *o = v);
            row += 1;
        }
    }
    out
}

/// Subtract each patch's own mean from its pixels.
pub fn remove_patch_mean(mut patches: Array2<f64>) -> Array2<f64> {
    for mut row in patches.rows_mut() {
        let mean = row.mean().unwrap_or(0.0);
        row.mapv_inplace(|v| v - mean);
    }
    patches
}

/// Strided cross-correlation of one image with a bank of square filters.
///
/// `filters` holds one flattened filter per row (`(n_filters, filter * filter)`),
/// the output has shape `(n_filters, out_h, out_w)`.
pub fn convolve(
    image: ArrayView2<f64>,
    filters: &Array2<f64>,
    filter: usize,
    step: usize,
) -> Array3<f64> {
    let out_h = output_size(image.nrows(), filter, step);
    let out_w = output_size(image.ncols(), filter, step);

    // (n_windows, n_filters)
    let responses = patch_matrix(image, filter, step).dot(&filters.t());

    Array3::from_shape_fn((filters.nrows(), out_h, out_w), |(c, y, x)| {
        responses[[y * out_w + x, c]]
    })
}
