//! Image dataset backed by a tenant upload directory

use std::path::{Path, PathBuf};

use ndarray::{s, Array4};
use tracing::{debug, warn};

use super::pixels::{image_to_array, load_resized, CHANNELS};
use crate::error::{Result, StegoGanError};

/// All usable images found directly under one directory
///
/// Images are decoded, converted to RGB, resized to a square and
/// normalized to `[-1, 1]` once, at construction time.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    /// Source file of each sample, in sample order
    paths: Vec<PathBuf>,
    /// Samples of shape (num_images, 3, image_size, image_size)
    images: Array4<f32>,
}

impl ImageDataset {
    /// Load every regular file directly under `dir`
    ///
    /// Subdirectories are not visited. Files that fail to decode as an image
    /// are skipped with a warning. A directory with no usable image is an
    /// `EmptyDataset` error.
    pub fn from_dir(dir: impl AsRef<Path>, image_size: u32) -> Result<Self> {
        let dir = dir.as_ref();

        let files = list_files(dir)?;
        let mut paths = Vec::with_capacity(files.len());
        let mut arrays = Vec::with_capacity(files.len());

        for path in files {
            let bytes = std::fs::read(&path)?;
            match load_resized(&bytes, image_size) {
                Ok(img) => {
                    arrays.push(image_to_array(&img));
                    paths.push(path);
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        if arrays.is_empty() {
            return Err(StegoGanError::EmptyDataset(dir.to_path_buf()));
        }

        let side = image_size as usize;
        let mut images = Array4::<f32>::zeros((arrays.len(), CHANNELS, side, side));
        for (i, array) in arrays.iter().enumerate() {
            images.slice_mut(s![i, .., .., ..]).assign(array);
        }

        debug!("Loaded {} images from {}", paths.len(), dir.display());
        Ok(Self { paths, images })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false for a constructed dataset
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Source files in sample order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Side length of every sample
    pub fn image_size(&self) -> usize {
        self.images.shape()[2]
    }

    /// Consume the dataset, yielding the sample array
    pub fn into_array(self) -> Array4<f32> {
        self.images
    }
}

/// Regular files directly under `dir`, sorted by path
///
/// Directory and entry read errors are returned, not skipped.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(path: &Path, color: [u8; 3]) {
        RgbImage::from_pixel(12, 9, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_dataset_from_dir() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"), [255, 0, 0]);
        write_png(&dir.path().join("b.png"), [0, 255, 0]);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_png(&dir.path().join("nested").join("c.png"), [0, 0, 255]);

        let dataset = ImageDataset::from_dir(dir.path(), 64).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.image_size(), 64);

        let images = dataset.into_array();
        assert_eq!(images.shape(), &[2, 3, 64, 64]);
        // a.png is pure red
        assert_eq!(images[[0, 0, 10, 10]], 1.0);
        assert_eq!(images[[0, 1, 10, 10]], -1.0);
    }

    #[test]
    fn test_undecodable_files_are_skipped() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("good.png"), [1, 2, 3]);
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let dataset = ImageDataset::from_dir(dir.path(), 16).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_empty_dir_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("junk.bin"), [0u8; 8]).unwrap();

        let err = ImageDataset::from_dir(dir.path(), 64).unwrap_err();
        assert!(matches!(err, StegoGanError::EmptyDataset(_)));
    }

    #[test]
    fn test_list_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"b").unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.png"), dir.path().join("b.png")]);
    }

    #[test]
    fn test_unreadable_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(matches!(list_files(&missing), Err(StegoGanError::Io(_))));
        assert!(matches!(
            ImageDataset::from_dir(&missing, 64),
            Err(StegoGanError::Io(_))
        ));
    }
}
