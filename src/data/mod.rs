//! Data module for loading training images
//!
//! This module provides:
//! - Pixel normalization and image/tensor conversions
//! - An image dataset read from a tenant upload directory
//! - DataLoader for batching images

pub mod pixels;
mod dataset;
mod loader;

pub use dataset::ImageDataset;
pub use loader::DataLoader;
pub use pixels::{denormalize_value, normalize_value, tensor_to_image};
