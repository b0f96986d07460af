use std::{borrow::Cow, sync::Arc};

use crate::{
    bitmap::{Bitmap, BitmapConfig, Region},
    counter::BitmapCounter,
    encoded::{EncodedImage, ImageFormat},
    error::{Error, Result},
    jpeg::JPEGDecoder,
};

const EOI: [u8; 2] = [0xFF, 0xD9];

/// Turns encoded images into bitmaps.
pub trait PlatformDecoder: Send + Sync {
    /// Decodes the first `length` bytes of a JPEG-tagged image.
    fn decode_jpeg_from_encoded_image(
        &self,
        encoded: &EncodedImage<'_>,
        config: BitmapConfig,
        region: Option<Region>,
        length: usize,
    ) -> Result<Bitmap>;

    /// Decodes a whole encoded image, sniffing the format if it is untagged.
    fn decode_from_encoded_image(
        &self,
        encoded: &mut EncodedImage<'_>,
        config: BitmapConfig,
        region: Option<Region>,
    ) -> Result<Bitmap>;
}

/// Decodes JPEGs into bitmaps accounted against a shared [`BitmapCounter`].
#[derive(Debug, Clone)]
pub struct PurgeableDecoder {
    counter: Arc<BitmapCounter>,
}

impl PurgeableDecoder {
    /// Creates a decoder whose bitmaps are accounted against `counter`.
    pub fn new(counter: Arc<BitmapCounter>) -> Self {
        Self { counter }
    }

    /// The counter decoded bitmaps are accounted against.
    pub fn counter(&self) -> &Arc<BitmapCounter> {
        &self.counter
    }

    /// Returns `data` terminated by EOI, appending the marker to a copy if needed.
    fn ensure_terminated(data: &[u8]) -> Cow<'_, [u8]> {
        if data.ends_with(&EOI) {
            Cow::Borrowed(data)
        } else {
            log::trace!("jpeg of {} bytes lacks EOI, appending one", data.len());
            let mut terminated = Vec::with_capacity(data.len() + EOI.len());
            terminated.extend_from_slice(data);
            terminated.extend_from_slice(&EOI);
            Cow::Owned(terminated)
        }
    }
}

impl PlatformDecoder for PurgeableDecoder {
    fn decode_jpeg_from_encoded_image(
        &self,
        encoded: &EncodedImage<'_>,
        config: BitmapConfig,
        region: Option<Region>,
        length: usize,
    ) -> Result<Bitmap> {
        if encoded.image_format() != ImageFormat::Jpeg {
            return Err(Error::UnsupportedFeature("Image is not tagged as JPEG"));
        }
        let bytes = encoded
            .bytes()
            .get(..length)
            .ok_or(Error::InvalidLength {
                length,
                size: encoded.size(),
            })?;

        let data = Self::ensure_terminated(bytes);
        JPEGDecoder::new(&data).decode_into(&self.counter, config, region)
    }

    fn decode_from_encoded_image(
        &self,
        encoded: &mut EncodedImage<'_>,
        config: BitmapConfig,
        region: Option<Region>,
    ) -> Result<Bitmap> {
        match encoded.detect_image_format() {
            ImageFormat::Jpeg => {
                let length = encoded.size();
                self.decode_jpeg_from_encoded_image(encoded, config, region, length)
            }
            _ => Err(Error::UnsupportedFeature("Only JPEG images can be decoded")),
        }
    }
}
