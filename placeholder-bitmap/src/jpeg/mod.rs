mod header;
mod jpeg_core;
mod jpeg_reader;
mod writer;

use std::sync::Arc;

use crate::{
    bitmap::{Bitmap, BitmapConfig, Region},
    counter::BitmapCounter,
    error::Result,
};

pub(crate) use header::HuffmanTableType;
pub(crate) use jpeg_reader::JPEGMarker;
pub(crate) use writer::JPEGWriter;

/// Contains JPEG image data
pub struct JPEGDecoder<'data> {
    image_data: &'data [u8],
}

impl<'data> JPEGDecoder<'data> {
    /// Initializes the JPEG decoder from a byte slice
    pub fn new(image_data: &'data [u8]) -> Self {
        Self { image_data }
    }

    /// Reads the frame header only and returns (width, height).
    pub fn read_dimensions(&self) -> Result<(u16, u16)> {
        let mut decoder = jpeg_core::JPEGDecoder::new(self.image_data);
        let header = decoder.parse()?;
        Ok(header.frame_info.image_size)
    }

    /// Decodes `region` of the image (the whole image when `None`) into a new bitmap of
    /// `config` accounted against `counter`.
    pub fn decode_into(
        &self,
        counter: &Arc<BitmapCounter>,
        config: BitmapConfig,
        region: Option<Region>,
    ) -> Result<Bitmap> {
        let mut decoder = jpeg_core::JPEGDecoder::new(self.image_data);
        let header = decoder.parse()?;
        let (width, height) = header.frame_info.image_size;

        let region = region.unwrap_or(Region::whole(width as u32, height as u32));
        region.check_within(width as u32, height as u32)?;
        log::trace!(
            "decoding {}x{} jpeg ({} components) into {:?} region {:?}",
            width,
            height,
            header.components.len(),
            config,
            region
        );

        let mut bitmap = Bitmap::allocate(counter, region.width, region.height, config)?;
        decoder.read_scan(&header, &mut bitmap, region)?;
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Color;
    use crate::bitstream::BitWriter;

    /// A 16x8 YCbCr image whose left block is black and right block is white.
    fn two_block_jpeg() -> Vec<u8> {
        let mut writer = JPEGWriter::new(Vec::new());
        writer.write_marker(JPEGMarker::SOI).unwrap();
        writer.write_quantization_table(0, &[[1; 8]; 8]).unwrap();
        writer
            .write_start_of_frame(16, 8, &[(1, (1, 1), 0), (2, (1, 1), 0), (3, (1, 1), 0)])
            .unwrap();
        // DC categories 0 (code 00) and 11 (code 01); AC only EOB (code 0)
        let mut dc_counts = [0u8; 16];
        dc_counts[1] = 2;
        writer
            .write_huffman_table(HuffmanTableType::Dc, 0, &dc_counts, &[0, 11])
            .unwrap();
        let mut ac_counts = [0u8; 16];
        ac_counts[0] = 1;
        writer
            .write_huffman_table(HuffmanTableType::Ac, 0, &ac_counts, &[0])
            .unwrap();
        writer
            .write_start_of_scan(&[(1, 0, 0), (2, 0, 0), (3, 0, 0)])
            .unwrap();

        let mut bits = BitWriter::with_capacity(16);
        // Block 1: Y DC = -1024 (black), chroma zero
        bits.write_bits(0b01, 2);
        bits.write_bits(1023, 11);
        bits.write_bits(0, 1);
        for _ in 0..2 {
            bits.write_bits(0b00, 2);
            bits.write_bits(0, 1);
        }
        // Block 2: Y DC diff = +2040 (DC 1016, white), chroma zero
        bits.write_bits(0b01, 2);
        bits.write_bits(2040, 11);
        bits.write_bits(0, 1);
        for _ in 0..2 {
            bits.write_bits(0b00, 2);
            bits.write_bits(0, 1);
        }
        writer.write_entropy_data(&bits.finish()).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn decodes_flat_blocks() {
        let data = two_block_jpeg();
        let counter = Arc::new(BitmapCounter::default());
        let bitmap = JPEGDecoder::new(&data)
            .decode_into(&counter, BitmapConfig::Argb8888, None)
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (16, 8));
        assert_eq!(bitmap.pixel(0, 0), Some(Color::BLACK));
        assert_eq!(bitmap.pixel(7, 7), Some(Color::BLACK));
        assert_eq!(bitmap.pixel(8, 0), Some(Color::WHITE));
        assert_eq!(bitmap.pixel(15, 7), Some(Color::WHITE));
    }

    #[test]
    fn decodes_a_region() {
        let data = two_block_jpeg();
        let counter = Arc::new(BitmapCounter::default());
        let bitmap = JPEGDecoder::new(&data)
            .decode_into(&counter, BitmapConfig::Argb8888, Some(Region::new(6, 2, 4, 3)))
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 3));
        assert_eq!(bitmap.pixel(1, 0), Some(Color::BLACK));
        assert_eq!(bitmap.pixel(2, 2), Some(Color::WHITE));

        let outside = JPEGDecoder::new(&data).decode_into(
            &counter,
            BitmapConfig::Argb8888,
            Some(Region::new(12, 0, 8, 8)),
        );
        assert!(outside.is_err());
    }

    #[test]
    fn reads_dimensions_without_decoding() {
        let data = two_block_jpeg();
        assert_eq!(JPEGDecoder::new(&data).read_dimensions().unwrap(), (16, 8));
    }

    #[test]
    fn rejects_missing_soi() {
        let counter = Arc::new(BitmapCounter::default());
        assert!(JPEGDecoder::new(&[0xFF, 0xD9])
            .decode_into(&counter, BitmapConfig::Argb8888, None)
            .is_err());
        assert_eq!(counter.count(), 0);
    }
}
