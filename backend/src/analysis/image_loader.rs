use image::imageops::FilterType;
use ndarray::{Array2, ArrayView2};

use super::AnalysisError;

/// Side length of the square grid every image is resampled to.
pub const GRID_SIZE: u32 = 224;

/// Grayscale intensities, row-major, as the mean of the 8-bit colour
/// channels (`0.0..=255.0`).
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid(Array2<f32>);

impl IntensityGrid {
    pub fn from_array(values: Array2<f32>) -> Self {
        Self(values)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.0.dim()
    }
}

/// Decodes `bytes` and resamples the picture to a `GRID_SIZE` square grid,
/// averaging the red, green and blue channels of each pixel.
pub fn load_intensity_grid(bytes: &[u8]) -> Result<IntensityGrid, AnalysisError> {
    let decoded = image::load_from_memory(bytes)?;
    log::debug!(
        "Decoded image {}x{} ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    let resized = decoded
        .resize_exact(GRID_SIZE, GRID_SIZE, FilterType::Nearest)
        .to_rgb8();

    let side = GRID_SIZE as usize;
    let grid = Array2::from_shape_fn((side, side), |(y, x)| {
        let [r, g, b] = resized.get_pixel(x as u32, y as u32).0;
        (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0
    });

    Ok(IntensityGrid(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn resamples_to_fixed_grid() {
        let img = RgbImage::from_pixel(640, 120, Rgb([255, 255, 255]));
        let grid = load_intensity_grid(&encode_png(&img)).unwrap();

        assert_eq!(grid.dim(), (224, 224));
        assert!(grid.view().iter().all(|&v| (v - 255.0).abs() < 1e-4));
    }

    #[test]
    fn averages_colour_channels() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let grid = load_intensity_grid(&encode_png(&img)).unwrap();

        assert!(grid.view().iter().all(|&v| (v - 85.0).abs() < 1e-4));
    }

    #[test]
    fn keeps_left_right_layout() {
        let img = RgbImage::from_fn(224, 224, |x, _| {
            if x < 112 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let grid = load_intensity_grid(&encode_png(&img)).unwrap();

        assert_eq!(grid.view()[[100, 0]], 0.0);
        assert_eq!(grid.view()[[100, 223]], 255.0);
    }

    #[test]
    fn full_size_input_is_sampled_pixel_for_pixel() {
        let img = RgbImage::from_fn(224, 224, |x, y| {
            if (x + y) % 2 == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let grid = load_intensity_grid(&encode_png(&img)).unwrap();

        for ((y, x), &v) in grid.view().indexed_iter() {
            let expected = if (x + y) % 2 == 0 { 0.0 } else { 255.0 };
            assert_eq!(v, expected, "cell ({}, {})", y, x);
        }
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let err = load_intensity_grid(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }
}
