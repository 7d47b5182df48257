//! DataLoader for batching and iterating over training images
//!
//! Provides batching for WGAN training with support for:
//! - Reshuffling at the start of every epoch
//! - Keeping or dropping the last incomplete batch
//! - Iteration over batches

use ndarray::{Array4, Axis};
use rand::seq::SliceRandom;

/// DataLoader for iterating over batched images
pub struct DataLoader {
    /// Full dataset of shape (num_images, channels, height, width)
    data: Array4<f32>,
    /// Batch size
    batch_size: usize,
    /// Whether to shuffle data each epoch
    shuffle: bool,
    /// Whether to drop the last incomplete batch
    drop_last: bool,
    /// Visiting order for the current epoch
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `data` - 4D array of shape (num_images, channels, height, width)
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    pub fn new(data: Array4<f32>, batch_size: usize, shuffle: bool, drop_last: bool) -> Self {
        let num_samples = data.shape()[0];
        let indices: Vec<usize> = (0..num_samples).collect();

        let mut loader = Self {
            data,
            batch_size: batch_size.max(1),
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.num_samples();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.data.shape()[0]
    }

    /// Get batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn shuffle_indices(&mut self) {
        let mut rng = rand::thread_rng();
        self.indices.shuffle(&mut rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Visiting order of the current epoch
    pub fn order(&self) -> &[usize] {
        &self.indices
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Array4<f32>> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);

        if self.drop_last && end - start < self.batch_size {
            return None;
        }

        let batch = self.data.select(Axis(0), &self.indices[start..end]);

        self.current_idx = end;
        Some(batch)
    }

    /// Start a new epoch and iterate over all of its batches
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Array4<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Array4<f32> {
        Array4::from_shape_fn((n, 3, 2, 2), |(i, _, _, _)| i as f32)
    }

    #[test]
    fn test_dataloader_keeps_last_batch() {
        let mut loader = DataLoader::new(numbered(10), 3, false, false);

        assert_eq!(loader.num_batches(), 4);
        assert_eq!(loader.num_samples(), 10);

        let sizes: Vec<usize> = loader.iter().map(|b| b.shape()[0]).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_dataloader_drop_last() {
        let mut loader = DataLoader::new(numbered(10), 3, false, true);

        assert_eq!(loader.num_batches(), 3);
        let sizes: Vec<usize> = loader.iter().map(|b| b.shape()[0]).collect();
        assert_eq!(sizes, vec![3, 3, 3]);
    }

    #[test]
    fn test_epoch_visits_every_sample_once() {
        let mut loader = DataLoader::new(numbered(7), 2, true, false);

        for _ in 0..3 {
            let mut seen: Vec<usize> = loader
                .iter()
                .flat_map(|b| {
                    (0..b.shape()[0])
                        .map(|i| b[[i, 0, 0, 0]] as usize)
                        .collect::<Vec<_>>()
                })
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..7).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_order_reshuffles_every_epoch() {
        // 64! orderings: two equal consecutive epochs are practically impossible
        let mut loader = DataLoader::new(numbered(64), 8, true, false);

        let mut previous = loader.order().to_vec();
        for _ in 0..5 {
            assert_eq!(loader.iter().count(), 8);
            let current = loader.order().to_vec();
            assert_ne!(current, previous);

            let mut sorted = current.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..64).collect::<Vec<_>>());
            previous = current;
        }

        let mut fixed = DataLoader::new(numbered(8), 4, false, false);
        assert_eq!(fixed.iter().count(), 2);
        assert_eq!(fixed.order(), &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_batch_follows_order() {
        let mut loader = DataLoader::new(numbered(4), 4, true, false);
        loader.reset();
        let order = loader.order().to_vec();
        let batch = loader.next_batch().unwrap();
        for (pos, &idx) in order.iter().enumerate() {
            assert_eq!(batch[[pos, 1, 1, 1]], idx as f32);
        }
    }
}
