use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use placeholder_bitmap::*;
use proptest::prelude::*;

fn jpeg_factory(
    counter: &Arc<BitmapCounter>,
    pool: &Arc<ByteBufferPool>,
) -> JpegBitmapFactory<EmptyJpegGenerator, PurgeableDecoder> {
    JpegBitmapFactory::new(
        EmptyJpegGenerator::new(Arc::clone(pool)),
        PurgeableDecoder::new(Arc::clone(counter)),
    )
}

fn config_strategy() -> impl Strategy<Value = BitmapConfig> {
    prop::sample::select(BitmapConfig::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn creates_transparent_bitmaps_of_the_requested_shape(
        width in 1u32..200,
        height in 1u32..200,
        config in config_strategy(),
    ) {
        let counter = Arc::new(BitmapCounter::default());
        let pool = ByteBufferPool::new(2);
        let factory = jpeg_factory(&counter, &pool);

        let bitmap = factory.create_bitmap(width, height, config).unwrap();
        prop_assert_eq!(bitmap.width(), width);
        prop_assert_eq!(bitmap.height(), height);
        prop_assert_eq!(bitmap.config(), config);
        prop_assert!(bitmap.has_alpha());
        prop_assert!(bitmap.pixels().iter().all(|&b| b == 0));
        prop_assert_eq!(pool.live_buffers(), 0);

        drop(bitmap);
        prop_assert_eq!(counter.count(), 0);
        prop_assert_eq!(counter.size(), 0);
    }
}

#[test]
fn one_by_one_example() {
    let counter = Arc::new(BitmapCounter::default());
    let pool = ByteBufferPool::new(2);
    let bitmap = jpeg_factory(&counter, &pool)
        .create_bitmap(1, 1, BitmapConfig::Argb8888)
        .unwrap();
    assert_eq!((bitmap.width(), bitmap.height()), (1, 1));
    assert!(bitmap.has_alpha());
    assert_eq!(bitmap.pixel(0, 0), Some(Color::TRANSPARENT));
}

#[test]
fn concurrent_calls_are_independent() {
    let counter = Arc::new(BitmapCounter::default());
    let pool = ByteBufferPool::new(4);
    let factory = jpeg_factory(&counter, &pool);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=8u32)
            .map(|i| {
                let factory = &factory;
                scope.spawn(move || {
                    let config = BitmapConfig::ALL[i as usize % 4];
                    let bitmaps: Vec<_> = (0..10)
                        .map(|j| factory.create_bitmap(i * 3 + j, i + j, config).unwrap())
                        .collect();
                    for (j, bitmap) in bitmaps.iter().enumerate() {
                        let j = j as u32;
                        assert_eq!((bitmap.width(), bitmap.height()), (i * 3 + j, i + j));
                        assert_eq!(bitmap.config(), config);
                        assert!(bitmap.pixels().iter().all(|&b| b == 0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });

    assert_eq!(pool.live_buffers(), 0);
    assert_eq!(counter.count(), 0);
}

/// Fails every decode with counter exhaustion and records whether the buffer was readable.
struct ExhaustedDecoder {
    calls: AtomicUsize,
}

impl PlatformDecoder for ExhaustedDecoder {
    fn decode_jpeg_from_encoded_image(
        &self,
        encoded: &EncodedImage<'_>,
        _config: BitmapConfig,
        region: Option<Region>,
        length: usize,
    ) -> Result<Bitmap> {
        assert_eq!(encoded.image_format(), ImageFormat::Jpeg);
        assert_eq!(length, encoded.size());
        assert!(region.is_none());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::TooManyBitmaps {
            requested: 4,
            count: 7,
            max_count: 7,
            size: 28,
            max_size: 1024,
        })
    }

    fn decode_from_encoded_image(
        &self,
        _encoded: &mut EncodedImage<'_>,
        _config: BitmapConfig,
        _region: Option<Region>,
    ) -> Result<Bitmap> {
        Err(Error::UnsupportedFeature("test decoder"))
    }
}

#[test]
fn decoder_failure_releases_the_buffer_and_propagates() {
    let pool = ByteBufferPool::new(2);
    let decoder = ExhaustedDecoder {
        calls: AtomicUsize::new(0),
    };
    let factory = JpegBitmapFactory::new(EmptyJpegGenerator::new(Arc::clone(&pool)), decoder);

    let err = factory
        .create_bitmap(1, 1, BitmapConfig::Argb8888)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyBitmaps {
            requested: 4,
            count: 7,
            ..
        }
    ));
    assert_eq!(pool.live_buffers(), 0);
    assert_eq!(pool.live_bytes(), 0);
}

#[test]
fn counter_exhaustion_releases_everything() {
    let counter = Arc::new(BitmapCounter::new(2, usize::MAX));
    let pool = ByteBufferPool::new(2);
    let factory = jpeg_factory(&counter, &pool);

    let first = factory.create_bitmap(4, 4, BitmapConfig::Alpha8).unwrap();
    let second = factory.create_bitmap(4, 4, BitmapConfig::Alpha8).unwrap();
    let err = factory
        .create_bitmap(4, 4, BitmapConfig::Alpha8)
        .unwrap_err();
    assert!(matches!(err, Error::TooManyBitmaps { count: 2, max_count: 2, .. }));
    assert_eq!(pool.live_buffers(), 0);
    assert_eq!(counter.count(), 2);

    drop((first, second));
    assert_eq!(counter.count(), 0);
    assert!(factory.create_bitmap(4, 4, BitmapConfig::Alpha8).is_ok());
}

#[test]
fn oversized_allocation_is_out_of_memory_or_refused() {
    // 32767^2 ARGB pixels is 4 GiB; the counter refuses it before any allocation.
    let counter = Arc::new(BitmapCounter::new(1, 1024 * 1024));
    let pool = ByteBufferPool::new(0);
    let factory = jpeg_factory(&counter, &pool);
    let err = factory
        .create_bitmap(i16::MAX as u32, i16::MAX as u32, BitmapConfig::Argb8888)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyBitmaps { .. } | Error::OutOfMemory { .. }
    ));
    assert_eq!(pool.live_buffers(), 0);
    assert_eq!(counter.count(), 0);
}

#[test]
fn factories_are_usable_as_trait_objects() {
    let config = FactoryConfig::default();
    let counter = config.bitmap_counter();
    let factory: Box<dyn BitmapFactory> = config
        .build_factory(Arc::clone(&counter), config.byte_buffer_pool())
        .unwrap();

    let bitmap = factory.create_bitmap_default(3, 2).unwrap();
    assert_eq!(bitmap.config(), BitmapConfig::Argb8888);
    let copy = factory
        .create_bitmap_from_source(&bitmap, Region::new(1, 1, 2, 1))
        .unwrap();
    assert_eq!((copy.width(), copy.height()), (2, 1));
    assert_eq!(counter.count(), 2);
}
