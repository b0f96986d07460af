use std::sync::Arc;

use crate::{
    bitstream::BitWriter,
    buffer::{ByteBufferPool, PooledByteBuffer},
    error::{Error, Result},
    jpeg::{HuffmanTableType, JPEGMarker, JPEGWriter},
};

/// Produces a minimal encoded image of exactly the requested size.
pub trait PlaceholderGenerator: Send + Sync {
    /// Returns an encoded image of exactly `width` x `height` pixels.
    fn generate(&self, width: i16, height: i16) -> Result<PooledByteBuffer>;
}

/// Bytes of every segment before the entropy-coded data, plus EOI.
const HEADER_LENGTH: usize = 2 + (4 + 65) + (4 + 9) + 2 * (4 + 17 + 1) + (4 + 6) + 2;

/// Generates single-component baseline JPEGs in which every block is "DC 0, end of block".
///
/// Both huffman tables hold a single one-bit code for symbol 0, so each 8x8 block costs
/// two zero bits.
#[derive(Debug, Clone)]
pub struct EmptyJpegGenerator {
    pool: Arc<ByteBufferPool>,
}

impl EmptyJpegGenerator {
    /// Creates a generator writing into buffers drawn from `pool`.
    pub fn new(pool: Arc<ByteBufferPool>) -> Self {
        Self { pool }
    }
}

impl PlaceholderGenerator for EmptyJpegGenerator {
    fn generate(&self, width: i16, height: i16) -> Result<PooledByteBuffer> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions {
                width: width.into(),
                height: height.into(),
            });
        }
        let (width, height) = (width as u16, height as u16);
        let blocks = width.div_ceil(8) as usize * height.div_ceil(8) as usize;

        let mut entropy = BitWriter::with_capacity(blocks / 4 + 1);
        entropy.write_zeros(2 * blocks);
        let entropy = entropy.finish();

        let stream = self.pool.output_stream(HEADER_LENGTH + entropy.len());
        let mut writer = JPEGWriter::new(stream);
        writer.write_marker(JPEGMarker::SOI)?;
        writer.write_quantization_table(0, &[[1; 8]; 8])?;
        writer.write_start_of_frame(width, height, &[(1, (1, 1), 0)])?;

        let mut single_code = [0u8; 16];
        single_code[0] = 1;
        writer.write_huffman_table(HuffmanTableType::Dc, 0, &single_code, &[0x00])?;
        writer.write_huffman_table(HuffmanTableType::Ac, 0, &single_code, &[0x00])?;

        writer.write_start_of_scan(&[(1, 0, 0)])?;
        writer.write_entropy_data(&entropy)?;
        let stream = writer.finish()?;

        let buffer = stream.into_byte_buffer();
        log::trace!(
            "generated {}x{} placeholder jpeg, {} bytes",
            width,
            height,
            buffer.size()
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encoded::ImageFormat, jpeg::JPEGDecoder};

    #[test]
    fn header_length_matches_output() {
        let pool = ByteBufferPool::new(0);
        let buffer = EmptyJpegGenerator::new(pool).generate(8, 8).unwrap();
        // One block: two bits padded to a single byte.
        assert_eq!(buffer.size(), HEADER_LENGTH + 1);
        assert_eq!(&buffer[buffer.size() - 3..], &[0x3F, 0xFF, 0xD9]);
    }

    #[test]
    fn output_is_a_jpeg_of_the_requested_size() {
        let pool = ByteBufferPool::new(0);
        let generator = EmptyJpegGenerator::new(Arc::clone(&pool));
        for (width, height) in [(1, 1), (8, 8), (9, 17), (640, 3), (i16::MAX, 1)] {
            let buffer = generator.generate(width, height).unwrap();
            assert_eq!(ImageFormat::detect(&buffer), ImageFormat::Jpeg);
            let dimensions = JPEGDecoder::new(&buffer).read_dimensions().unwrap();
            assert_eq!(dimensions, (width as u16, height as u16));
        }
        assert_eq!(pool.live_buffers(), 0);
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let generator = EmptyJpegGenerator::new(ByteBufferPool::new(0));
        for (width, height) in [(0, 1), (1, 0), (-5, 10), (10, i16::MIN)] {
            assert!(matches!(
                generator.generate(width, height),
                Err(Error::InvalidDimensions { .. })
            ));
        }
    }
}
