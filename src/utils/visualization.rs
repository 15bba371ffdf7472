//! Sample grid rendering and PNG output
//!
//! A batch of generated images is tiled into one grayscale grid:
//! `cols = floor(sqrt(n))`, `rows = ceil(n / cols)`, filled row by row.

use image::GrayImage;
use ndarray::{s, Array2, Array3, ArrayView3};
use std::path::{Path, PathBuf};
use tch::{Device, Kind, Tensor};

use crate::data::denormalize_images;
use crate::error::{Error, Result};

/// Grid layout `(rows, cols)` for `total` tiles
pub fn grid_shape(total: usize) -> (usize, usize) {
    let cols = ((total as f64).sqrt().floor() as usize).max(1);
    let rows = (total + cols - 1) / cols;
    (rows, cols)
}

/// Tile images of shape (n, H, W) into a single (rows * H, cols * W) image
///
/// Unused tiles in the last row stay at zero.
pub fn combine_images(images: ArrayView3<'_, f32>) -> Array2<f32> {
    let (total, height, width) = images.dim();
    let (rows, cols) = grid_shape(total);
    let mut grid = Array2::<f32>::zeros((rows * height, cols * width));

    for (index, image) in images.outer_iter().enumerate() {
        let (i, j) = (index / cols, index % cols);
        grid.slice_mut(s![i * height..(i + 1) * height, j * width..(j + 1) * width])
            .assign(&image);
    }

    grid
}

/// Copy a (n, 1, H, W) image tensor into an (n, H, W) array
pub fn tensor_to_images(images: &Tensor) -> Result<Array3<f32>> {
    let size = images.size();
    if size.len() != 4 || size[1] != 1 {
        return Err(Error::InvalidConfig(format!(
            "expected images of shape (n, 1, H, W), got {size:?}"
        )));
    }

    let (n, h, w) = (size[0] as usize, size[2] as usize, size[3] as usize);
    let flat = images
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .contiguous()
        .view([-1]);
    let values = Vec::<f32>::try_from(&flat)?;

    Array3::from_shape_vec((n, h, w), values).map_err(|e| Error::InvalidConfig(e.to_string()))
}

/// Render generated images in [-1, 1] as one 8-bit grid
pub fn render_grid(images: &Tensor) -> Result<Array2<u8>> {
    let images = tensor_to_images(images)?;
    Ok(denormalize_images(&combine_images(images.view())))
}

/// Destination for rendered sample grids
pub trait SampleWriter {
    /// Write a grid produced at (`epoch`, `batch`), returns where it went
    fn write_grid(&mut self, grid: &Array2<u8>, epoch: usize, batch: usize) -> Result<PathBuf>;
}

/// Writes grids as `{epoch:04}_{batch:04}.png` into a directory
#[derive(Debug, Clone)]
pub struct PngSampleWriter {
    dir: PathBuf,
}

impl PngSampleWriter {
    /// Create a writer for `dir`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File name for a grid
    pub fn file_name(epoch: usize, batch: usize) -> String {
        format!("{:04}_{:04}.png", epoch, batch)
    }
}

/// Save a pixel array as a grayscale PNG
pub fn save_png<P: AsRef<Path>>(pixels: &Array2<u8>, path: P) -> Result<()> {
    let (height, width) = pixels.dim();
    let raw: Vec<u8> = pixels.iter().copied().collect();
    let image = GrayImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| Error::InvalidConfig("pixel buffer does not match image size".to_string()))?;
    image.save(path)?;
    Ok(())
}

impl SampleWriter for PngSampleWriter {
    fn write_grid(&mut self, grid: &Array2<u8>, epoch: usize, batch: usize) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(epoch, batch));
        save_png(grid, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape_for_batch_of_32() {
        assert_eq!(grid_shape(32), (7, 5));
        assert_eq!(grid_shape(16), (4, 4));
        assert_eq!(grid_shape(10), (4, 3));
        assert_eq!(grid_shape(1), (1, 1));
    }

    #[test]
    fn test_combine_images_layout() {
        let images = Array3::from_shape_fn((32, 28, 28), |(n, _, _)| n as f32);
        let grid = combine_images(images.view());

        assert_eq!(grid.dim(), (7 * 28, 5 * 28));
        // image 7 -> row 1, col 2
        assert_eq!(grid[[28 + 3, 2 * 28 + 5]], 7.0);
        // image 31 -> row 6, col 1
        assert_eq!(grid[[6 * 28, 28]], 31.0);
        // unused tiles of the last row stay blank
        assert_eq!(grid[[6 * 28, 4 * 28]], 0.0);
    }

    #[test]
    fn test_render_grid_from_tensor() {
        let images = Tensor::ones([4, 1, 3, 3], (Kind::Float, Device::Cpu)) * -1.0;
        let grid = render_grid(&images).unwrap();

        assert_eq!(grid.dim(), (6, 6));
        assert!(grid.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_png_writer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PngSampleWriter::new(dir.path().join("nested").join("samples"));

        let grid = Array2::from_shape_fn((14, 10), |(i, j)| (i * 10 + j) as u8);
        let path = writer.write_grid(&grid, 3, 500).unwrap();

        assert!(path.ends_with("0003_0500.png"));
        let loaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(loaded.dimensions(), (10, 14));
        assert_eq!(loaded.get_pixel(3, 2)[0], 23);
    }
}
