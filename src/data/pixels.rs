//! Pixel conversions between 8-bit images and normalized tensors
//!
//! Training and inference work on `[-1, 1]` floats laid out channel-first.
//! Persisted and embedded images are 8-bit RGB. The affine map between
//! the two is `x = v / 127.5 - 1` and its inverse `v = round((x + 1) * 127.5)`.

use std::io::Cursor;

use image::{imageops::FilterType, ImageOutputFormat, Rgb, RgbImage};
use ndarray::Array3;
use tch::{Device, Kind, Tensor};

use crate::error::{Result, StegoGanError};

/// Number of color channels of every image the models see
pub const CHANNELS: usize = 3;

/// Map an 8-bit channel value into `[-1, 1]`
pub fn normalize_value(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

/// Map a `[-1, 1]` value back to 8 bits, rounding to nearest and clipping
pub fn denormalize_value(value: f32) -> u8 {
    ((value + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
}

/// Convert an RGB image into a normalized `(channels, height, width)` array
pub fn image_to_array(img: &RgbImage) -> Array3<f32> {
    let (width, height) = img.dimensions();
    let mut array = Array3::<f32>::zeros((CHANNELS, height as usize, width as usize));

    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..CHANNELS {
            array[[c, y as usize, x as usize]] = normalize_value(pixel[c]);
        }
    }

    array
}

/// Decode, convert to RGB and resize to a square of `size` pixels
pub fn load_resized(bytes: &[u8], size: u32) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes)?.to_rgb8();
    if img.dimensions() == (size, size) {
        return Ok(img);
    }
    Ok(image::imageops::resize(&img, size, size, FilterType::Triangle))
}

/// Convert a generated image tensor into an 8-bit RGB image
///
/// Accepts `(3, H, W)` or `(1, 3, H, W)` tensors with values in `[-1, 1]`.
pub fn tensor_to_image(tensor: &Tensor) -> Result<RgbImage> {
    let tensor = match tensor.dim() {
        4 => tensor.squeeze_dim(0),
        3 => tensor.shallow_clone(),
        d => {
            return Err(StegoGanError::InvalidConfig(format!(
                "expected a 3- or 4-dimensional image tensor, got {} dimensions",
                d
            )))
        }
    };

    let size = tensor.size();
    let (height, width) = (size[1] as u32, size[2] as u32);
    let hwc = hwc_floats(&tensor)?;
    let raw: Vec<u8> = hwc.into_iter().map(denormalize_value).collect();

    RgbImage::from_raw(width, height, raw).ok_or_else(|| {
        StegoGanError::InvalidConfig(format!(
            "tensor of shape {:?} is not an RGB image",
            size
        ))
    })
}

/// Flatten a `(C, H, W)` tensor into height x width x channel order as `f32`
pub fn hwc_floats(tensor: &Tensor) -> Result<Vec<f32>> {
    let flat = tensor
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .permute([1, 2, 0])
        .contiguous()
        .flatten(0, -1);
    Ok(Vec::<f32>::try_from(&flat)?)
}

/// Tile a batch of `(N, 3, H, W)` samples into one image
///
/// Values are min-max rescaled over the whole batch before conversion,
/// tiles are separated by `padding` black pixels, `nrow` tiles per row.
pub fn make_grid(samples: &Tensor, nrow: usize, padding: u32) -> Result<RgbImage> {
    let size = samples.size();
    if size.len() != 4 || size[0] == 0 {
        return Err(StegoGanError::InvalidConfig(format!(
            "expected a non-empty (N, 3, H, W) batch, got {:?}",
            size
        )));
    }
    let (count, height, width) = (size[0] as usize, size[2] as u32, size[3] as u32);
    let nrow = nrow.max(1).min(count);
    let rows = (count + nrow - 1) / nrow;

    let samples = samples.to_device(Device::Cpu).to_kind(Kind::Float);
    let lo = samples.min().double_value(&[]);
    let hi = samples.max().double_value(&[]);
    let scaled = (&samples - lo) / (hi - lo).max(1e-5) * 2.0 - 1.0;

    let grid_w = nrow as u32 * (width + padding) + padding;
    let grid_h = rows as u32 * (height + padding) + padding;
    let mut grid = RgbImage::from_pixel(grid_w, grid_h, Rgb([0, 0, 0]));

    for i in 0..count {
        let tile = tensor_to_image(&scaled.get(i as i64))?;
        let x0 = (i % nrow) as u32 * (width + padding) + padding;
        let y0 = (i / nrow) as u32 * (height + padding) + padding;
        image::imageops::replace(&mut grid, &tile, x0 as i64, y0 as i64);
    }

    Ok(grid)
}

/// Encode an image losslessly as PNG
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(buf)
}

/// Decode any supported image format into RGB without resizing
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}
