#![warn(missing_docs)]

//! Creates blank, transparent bitmaps of a requested size and pixel configuration.
//!
//! The default [`BitmapFactory`] generates a minimal JPEG of the requested size, decodes
//! it into a bitmap accounted against a [`BitmapCounter`], then erases it to transparent.
//! [`DirectBitmapFactory`] skips the decode and allocates from the counter directly;
//! [`FactoryConfig`] picks between the two.

mod bitstream;
mod error;
/// Bitmaps, pixel configurations and colors
pub mod bitmap;
/// Pooled byte buffers for encoded images
pub mod buffer;
/// Factory configuration
pub mod config;
/// Live bitmap accounting
pub mod counter;
/// Decoders turning encoded images into bitmaps
pub mod decoder;
/// Format-tagged encoded images
pub mod encoded;
/// Bitmap factories
pub mod factory;
/// Placeholder image generators
pub mod generator;
/// Baseline JPEG decoding and writing
pub mod jpeg;
/// Encoder for PPM/PAM images
pub mod pnm;

pub use bitmap::{Bitmap, BitmapConfig, Color, Region};
pub use buffer::{ByteBufferPool, PooledByteBuffer};
pub use config::{FactoryConfig, FactoryFlavor};
pub use counter::BitmapCounter;
pub use decoder::{PlatformDecoder, PurgeableDecoder};
pub use encoded::{EncodedImage, ImageFormat};
pub use error::{Error, Result};
pub use factory::{BitmapFactory, DirectBitmapFactory, JpegBitmapFactory};
pub use generator::{EmptyJpegGenerator, PlaceholderGenerator};
