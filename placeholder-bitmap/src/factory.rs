use std::sync::Arc;

use crate::{
    bitmap::{Bitmap, BitmapConfig, Color, Region},
    counter::BitmapCounter,
    decoder::PlatformDecoder,
    encoded::{EncodedImage, ImageFormat},
    error::{Error, Result},
    generator::PlaceholderGenerator,
};

/// Creates blank bitmaps. Implementations are safe to share between threads.
pub trait BitmapFactory: Send + Sync {
    /// Creates a `width` x `height` bitmap of `config`, fully transparent with alpha enabled.
    fn create_bitmap_internal(
        &self,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Result<Bitmap>;

    /// Creates a transparent bitmap after rejecting empty dimensions.
    fn create_bitmap(&self, width: u32, height: u32, config: BitmapConfig) -> Result<Bitmap> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions {
                width: width.into(),
                height: height.into(),
            });
        }
        self.create_bitmap_internal(width, height, config)
    }

    /// Creates a transparent [`BitmapConfig::Argb8888`] bitmap.
    fn create_bitmap_default(&self, width: u32, height: u32) -> Result<Bitmap> {
        self.create_bitmap(width, height, BitmapConfig::Argb8888)
    }

    /// Creates a bitmap and fills it row-major from `colors`.
    fn create_bitmap_from_colors(
        &self,
        colors: &[Color],
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Result<Bitmap> {
        let needed = width as usize * height as usize;
        if colors.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: colors.len(),
            });
        }
        let mut bitmap = self.create_bitmap(width, height, config)?;
        for (index, &color) in colors[..needed].iter().enumerate() {
            let (x, y) = (index % width as usize, index / width as usize);
            bitmap.set_pixel(x as u32, y as u32, color);
        }
        Ok(bitmap)
    }

    /// Creates a bitmap holding a copy of `region` of `source`.
    fn create_bitmap_from_source(&self, source: &Bitmap, region: Region) -> Result<Bitmap> {
        region.check_within(source.width(), source.height())?;
        let mut bitmap = self.create_bitmap(region.width, region.height, source.config())?;
        bitmap.set_has_alpha(source.has_alpha());
        for y in 0..region.height {
            for x in 0..region.width {
                if let Some(color) = source.pixel(region.x + x, region.y + y) {
                    bitmap.set_pixel(x, y, color);
                }
            }
        }
        Ok(bitmap)
    }
}

/// Creates bitmaps by decoding a generated placeholder JPEG, so the pixels come from the
/// decoder's purgeable allocation path.
#[derive(Debug)]
pub struct JpegBitmapFactory<G, D> {
    generator: G,
    decoder: D,
}

impl<G: PlaceholderGenerator, D: PlatformDecoder> JpegBitmapFactory<G, D> {
    /// Combines a placeholder generator with the decoder that turns its output into bitmaps.
    pub fn new(generator: G, decoder: D) -> Self {
        Self { generator, decoder }
    }
}

impl<G: PlaceholderGenerator, D: PlatformDecoder> BitmapFactory for JpegBitmapFactory<G, D> {
    /// Fails with [`Error::TooManyBitmaps`] if the counter is full, [`Error::OutOfMemory`] if
    /// the pixels cannot be allocated, and [`Error::DimensionsTooLarge`] if either side does
    /// not fit in an `i16`.
    fn create_bitmap_internal(
        &self,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Result<Bitmap> {
        let (Ok(jpeg_width), Ok(jpeg_height)) = (i16::try_from(width), i16::try_from(height))
        else {
            return Err(Error::DimensionsTooLarge { width, height });
        };

        let jpeg = self.generator.generate(jpeg_width, jpeg_height)?;
        let mut encoded = EncodedImage::new(&jpeg);
        encoded.set_image_format(ImageFormat::Jpeg);

        let mut bitmap = self
            .decoder
            .decode_jpeg_from_encoded_image(&encoded, config, None, jpeg.size())?;
        bitmap.set_has_alpha(true);
        bitmap.erase_color(Color::TRANSPARENT);
        log::debug!("created {}x{} {:?} bitmap via placeholder jpeg", width, height, config);
        Ok(bitmap)
    }
}

/// Allocates bitmaps straight from the counter without a decode pass.
#[derive(Debug, Clone)]
pub struct DirectBitmapFactory {
    counter: Arc<BitmapCounter>,
}

impl DirectBitmapFactory {
    /// Creates a factory allocating against `counter`.
    pub fn new(counter: Arc<BitmapCounter>) -> Self {
        Self { counter }
    }
}

impl BitmapFactory for DirectBitmapFactory {
    fn create_bitmap_internal(
        &self,
        width: u32,
        height: u32,
        config: BitmapConfig,
    ) -> Result<Bitmap> {
        let mut bitmap = Bitmap::allocate(&self.counter, width, height, config)?;
        bitmap.set_has_alpha(true);
        bitmap.erase_color(Color::TRANSPARENT);
        log::debug!("created {}x{} {:?} bitmap directly", width, height, config);
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::ByteBufferPool, decoder::PurgeableDecoder, generator::EmptyJpegGenerator};

    fn jpeg_factory() -> (
        JpegBitmapFactory<EmptyJpegGenerator, PurgeableDecoder>,
        Arc<ByteBufferPool>,
        Arc<BitmapCounter>,
    ) {
        let pool = ByteBufferPool::new(4);
        let counter = Arc::new(BitmapCounter::default());
        let factory = JpegBitmapFactory::new(
            EmptyJpegGenerator::new(Arc::clone(&pool)),
            PurgeableDecoder::new(Arc::clone(&counter)),
        );
        (factory, pool, counter)
    }

    #[test]
    fn one_by_one_is_transparent() {
        let (factory, pool, counter) = jpeg_factory();
        let bitmap = factory.create_bitmap(1, 1, BitmapConfig::Argb8888).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (1, 1));
        assert!(bitmap.has_alpha());
        assert_eq!(bitmap.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(pool.live_buffers(), 0);
        assert_eq!(counter.count(), 1);

        drop(bitmap);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn rejects_sizes_outside_the_16_bit_range() {
        let (factory, pool, _) = jpeg_factory();
        let err = factory
            .create_bitmap(i16::MAX as u32 + 1, 1, BitmapConfig::Alpha8)
            .unwrap_err();
        assert!(matches!(err, Error::DimensionsTooLarge { width: 32768, height: 1 }));
        assert!(matches!(
            factory.create_bitmap(0, 4, BitmapConfig::Alpha8),
            Err(Error::InvalidDimensions { .. })
        ));
        assert_eq!(pool.live_buffers(), 0);
    }

    #[test]
    fn direct_factory_matches_jpeg_factory() {
        let (jpeg, _, _) = jpeg_factory();
        let direct = DirectBitmapFactory::new(Arc::new(BitmapCounter::default()));
        for config in BitmapConfig::ALL {
            let a = jpeg.create_bitmap(13, 5, config).unwrap();
            let b = direct.create_bitmap(13, 5, config).unwrap();
            assert_eq!(a.pixels(), b.pixels());
            assert_eq!(a.has_alpha(), b.has_alpha());
        }
    }

    #[test]
    fn from_colors_and_from_source() {
        let direct = DirectBitmapFactory::new(Arc::new(BitmapCounter::default()));
        let colors = [Color::WHITE, Color::BLACK, Color::TRANSPARENT, Color::WHITE];
        let bitmap = direct
            .create_bitmap_from_colors(&colors, 2, 2, BitmapConfig::Argb8888)
            .unwrap();
        assert_eq!(bitmap.pixel(1, 0), Some(Color::BLACK));
        assert_eq!(bitmap.pixel(1, 1), Some(Color::WHITE));

        assert!(matches!(
            direct.create_bitmap_from_colors(&colors, 3, 2, BitmapConfig::Argb8888),
            Err(Error::BufferTooSmall { needed: 6, actual: 4 })
        ));

        let copy = direct
            .create_bitmap_from_source(&bitmap, Region::new(1, 0, 1, 2))
            .unwrap();
        assert_eq!(copy.pixel(0, 0), Some(Color::BLACK));
        assert_eq!(copy.pixel(0, 1), Some(Color::WHITE));
    }
}
