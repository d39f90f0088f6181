use ndarray::{Array2, ArrayView2};

use super::image_loader::IntensityGrid;

pub const SOBEL_HORIZONTAL: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
pub const SOBEL_VERTICAL: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];

/// Combined gradient magnitude, same shape as the grid it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMap(Array2<f32>);

impl GradientMap {
    pub fn from_array(values: Array2<f32>) -> Self {
        Self(values)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest magnitude; zero for an empty map.
    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0, f32::max)
    }

    pub fn mean(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.iter().map(|&v| f64::from(v)).sum::<f64>() / self.0.len() as f64
    }

    /// Population variance of all cells.
    pub fn variance(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.0
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum::<f64>()
            / self.0.len() as f64
    }
}

/// Applies both Sobel kernels as a same-size correlation and combines them
/// into `sqrt(h^2 + v^2)`. Samples outside the grid read as zero.
pub fn extract_edges(grid: &IntensityGrid) -> GradientMap {
    let input = grid.view();
    let magnitude = Array2::from_shape_fn(input.dim(), |(y, x)| {
        let h = correlate(&input, &SOBEL_HORIZONTAL, y, x);
        let v = correlate(&input, &SOBEL_VERTICAL, y, x);
        (h * h + v * v).sqrt()
    });
    GradientMap(magnitude)
}

fn correlate(input: &ArrayView2<'_, f32>, kernel: &[[f32; 3]; 3], y: usize, x: usize) -> f32 {
    let (rows, cols) = input.dim();
    let mut acc = 0.0f32;
    for (ky, weights) in kernel.iter().enumerate() {
        let Some(sy) = (y + ky).checked_sub(1) else {
            continue;
        };
        if sy >= rows {
            continue;
        }
        for (kx, weight) in weights.iter().enumerate() {
            let Some(sx) = (x + kx).checked_sub(1) else {
                continue;
            };
            if sx >= cols {
                continue;
            }
            acc += input[[sy, sx]] * weight;
        }
    }
    acc
}
