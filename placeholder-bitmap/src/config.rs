use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    buffer::{ByteBufferPool, DEFAULT_MAX_FREE_BUFFERS},
    counter::{BitmapCounter, DEFAULT_MAX_BITMAP_COUNT, DEFAULT_MAX_BITMAP_SIZE},
    decoder::PurgeableDecoder,
    error::{Error, Result},
    factory::{BitmapFactory, DirectBitmapFactory, JpegBitmapFactory},
    generator::EmptyJpegGenerator,
};

/// Which [`BitmapFactory`] implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactoryFlavor {
    /// Decode a generated placeholder JPEG ([`JpegBitmapFactory`]).
    #[default]
    JpegDecoding,
    /// Allocate pixels directly ([`DirectBitmapFactory`]).
    Direct,
}

impl FactoryFlavor {
    /// The name accepted by `from_str`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JpegDecoding => "jpeg",
            Self::Direct => "direct",
        }
    }
}

impl FromStr for FactoryFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" => Ok(Self::JpegDecoding),
            "direct" => Ok(Self::Direct),
            other => Err(Error::InvalidConfig(format!(
                "unknown factory flavor `{other}` (expected jpeg or direct)"
            ))),
        }
    }
}

impl fmt::Display for FactoryFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for building a bitmap factory and the pools behind it.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Factory implementation to build.
    pub flavor: FactoryFlavor,
    /// Maximum number of live bitmaps.
    pub max_bitmap_count: usize,
    /// Maximum bytes held by live bitmaps.
    pub max_bitmap_size: usize,
    /// Released encoded-buffer allocations kept for reuse.
    pub max_free_buffers: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            flavor: FactoryFlavor::default(),
            max_bitmap_count: DEFAULT_MAX_BITMAP_COUNT,
            max_bitmap_size: DEFAULT_MAX_BITMAP_SIZE,
            max_free_buffers: DEFAULT_MAX_FREE_BUFFERS,
        }
    }
}

impl FactoryConfig {
    /// Rejects zero bitmap limits.
    pub fn validate(&self) -> Result<()> {
        if self.max_bitmap_count == 0 {
            return Err(Error::InvalidConfig(
                "max_bitmap_count must be positive".to_string(),
            ));
        }
        if self.max_bitmap_size == 0 {
            return Err(Error::InvalidConfig(
                "max_bitmap_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// A fresh counter with this config's limits.
    pub fn bitmap_counter(&self) -> Arc<BitmapCounter> {
        Arc::new(BitmapCounter::new(
            self.max_bitmap_count,
            self.max_bitmap_size,
        ))
    }

    /// A fresh encoded-buffer pool.
    pub fn byte_buffer_pool(&self) -> Arc<ByteBufferPool> {
        ByteBufferPool::new(self.max_free_buffers)
    }

    /// Builds the factory selected by [`flavor`](Self::flavor) on top of the given pools.
    pub fn build_factory(
        &self,
        counter: Arc<BitmapCounter>,
        pool: Arc<ByteBufferPool>,
    ) -> Result<Box<dyn BitmapFactory>> {
        self.validate()?;
        log::debug!(
            "building {} bitmap factory: {} bitmaps / {} bytes max",
            self.flavor,
            counter.max_count(),
            counter.max_size()
        );
        Ok(match self.flavor {
            FactoryFlavor::JpegDecoding => Box::new(JpegBitmapFactory::new(
                EmptyJpegGenerator::new(pool),
                PurgeableDecoder::new(counter),
            )),
            FactoryFlavor::Direct => Box::new(DirectBitmapFactory::new(counter)),
        })
    }
}
