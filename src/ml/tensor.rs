//! Fixed-shape tensor helpers
//!
//! Every boundary of the pipeline passes `ndarray` arrays whose shapes are
//! checked explicitly instead of relying on implicit reshaping:
//! - encoded / scaled features: `[T, 19]`
//! - model input: `[1, 48, 19]`
//! - model output: `[1, H, 6]`
//! - targets: `[H, 6]`

use anyhow::Result;
use ndarray::{s, Array2, Array3, ArrayView2, Axis};

/// Number of historical hourly timesteps the model consumes.
pub const WINDOW_SIZE: usize = 48;

/// Width of one encoded feature row.
pub const FEATURE_COUNT: usize = 19;

/// Number of predicted weather channels.
pub const TARGET_COUNT: usize = 6;

/// Check that a 2-D matrix has exactly `cols` columns.
pub fn ensure_columns(matrix: &ArrayView2<'_, f64>, cols: usize, what: &str) -> Result<()> {
    if matrix.ncols() != cols {
        anyhow::bail!(
            "{} column mismatch: expected {}, got {} (shape {:?})",
            what,
            cols,
            matrix.ncols(),
            matrix.shape()
        );
    }
    Ok(())
}

/// Take the last `WINDOW_SIZE` rows of a scaled `[T, 19]` matrix and lay them
/// out as the `[1, 48, 19]` model input.
pub fn window_input(scaled: &Array2<f64>) -> Result<Array3<f64>> {
    ensure_columns(&scaled.view(), FEATURE_COUNT, "feature matrix")?;

    let rows = scaled.nrows();
    if rows < WINDOW_SIZE {
        anyhow::bail!("feature matrix has {} rows, need {}", rows, WINDOW_SIZE);
    }

    let window = scaled.slice(s![rows - WINDOW_SIZE.., ..]).to_owned();
    Ok(window.insert_axis(Axis(0)))
}

/// Validate a raw `[1, H, 6]` model output and drop the batch axis.
pub fn squeeze_output(output: Array3<f64>, expected_horizon: usize) -> Result<Array2<f64>> {
    let shape = output.shape().to_vec();
    if shape != [1, expected_horizon, TARGET_COUNT] {
        anyhow::bail!(
            "model output shape {:?}, expected [1, {}, {}]",
            shape,
            expected_horizon,
            TARGET_COUNT
        );
    }
    if expected_horizon == 0 {
        anyhow::bail!("model produced an empty horizon");
    }
    if let Some(bad) = output.iter().find(|v| !v.is_finite()) {
        anyhow::bail!("model output contains non-finite value {}", bad);
    }

    Ok(output.index_axis_move(Axis(0), 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_window_input_takes_most_recent_rows() {
        let rows = WINDOW_SIZE + 2;
        let matrix = Array::from_shape_fn((rows, FEATURE_COUNT), |(r, _)| r as f64);

        let input = window_input(&matrix).unwrap();
        assert_eq!(input.shape(), &[1, WINDOW_SIZE, FEATURE_COUNT]);
        assert_eq!(input[[0, 0, 0]], 2.0);
        assert_eq!(input[[0, WINDOW_SIZE - 1, 5]], (rows - 1) as f64);
    }

    #[test]
    fn test_window_input_rejects_short_or_narrow() {
        let short = Array2::<f64>::zeros((WINDOW_SIZE - 1, FEATURE_COUNT));
        assert!(window_input(&short).is_err());

        let narrow = Array2::<f64>::zeros((WINDOW_SIZE, FEATURE_COUNT - 1));
        assert!(window_input(&narrow).is_err());
    }

    #[test]
    fn test_squeeze_output() {
        let output = Array3::<f64>::ones((1, 24, TARGET_COUNT));
        let squeezed = squeeze_output(output, 24).unwrap();
        assert_eq!(squeezed.shape(), &[24, TARGET_COUNT]);
    }

    #[test]
    fn test_squeeze_output_rejects_bad_shapes_and_nan() {
        assert!(squeeze_output(Array3::<f64>::ones((2, 24, TARGET_COUNT)), 24).is_err());
        assert!(squeeze_output(Array3::<f64>::ones((1, 12, TARGET_COUNT)), 24).is_err());
        assert!(squeeze_output(Array3::<f64>::ones((1, 24, 5)), 24).is_err());
        assert!(squeeze_output(Array3::<f64>::ones((1, 0, TARGET_COUNT)), 0).is_err());

        let mut output = Array3::<f64>::ones((1, 3, TARGET_COUNT));
        output[[0, 1, 2]] = f64::NAN;
        assert!(squeeze_output(output, 3).is_err());
    }
}
