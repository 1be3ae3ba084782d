//! Position Sampling

use ndarray::Array2;

/// `n` evenly spaced samples over `[min, max]`, both endpoints included.
///
/// A single sample sits at `min`.
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            let mut samples: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
            samples[n - 1] = max;
            samples
        }
    }
}

/// Cartesian product of two sample axes as an `(count_u * count_v, 2)` matrix.
///
/// Row-major: `v` varies fastest within a fixed `u`, so reshaping one output
/// column to `(count_u, count_v)` puts `u` along rows.
pub fn grid_2d(u: (f64, f64), v: (f64, f64), count_u: usize, count_v: usize) -> Array2<f64> {
    let us = linspace(u.0, u.1, count_u);
    let vs = linspace(v.0, v.1, count_v);

    let mut samples = Array2::zeros((count_u * count_v, 2));
    for (i, &su) in us.iter().enumerate() {
        for (j, &sv) in vs.iter().enumerate() {
            let row = i * count_v + j;
            samples[[row, 0]] = su;
            samples[[row, 1]] = sv;
        }
    }
    samples
}
