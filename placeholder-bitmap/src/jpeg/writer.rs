use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    error::{Error, Result},
    jpeg::{header::HuffmanTableType, jpeg_core::ZIGZAG_MAP, jpeg_reader::JPEGMarker},
};

/// Writes baseline JPEG segments to any `Write`.
pub struct JPEGWriter<W: Write> {
    out: W,
}

impl<W: Write> JPEGWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_marker(&mut self, marker: JPEGMarker) -> Result<()> {
        self.out.write_u16::<BigEndian>(marker as u16)?;
        Ok(())
    }

    fn write_segment(&mut self, marker: JPEGMarker, payload: &[u8]) -> Result<()> {
        let length = u16::try_from(payload.len() + 2)
            .map_err(|_| Error::InternalError("Segment payload too long"))?;
        self.write_marker(marker)?;
        self.out.write_u16::<BigEndian>(length)?;
        self.out.write_all(payload)?;
        Ok(())
    }

    /// Writes an 8-bit quantization table given in natural (row-major) order.
    pub fn write_quantization_table(
        &mut self,
        destination_id: u8,
        table: &[[u8; 8]; 8],
    ) -> Result<()> {
        let mut payload = Vec::with_capacity(65);
        payload.push(destination_id & 0x0F);
        payload.extend(
            ZIGZAG_MAP
                .iter()
                .map(|&(row, col)| table[row as usize][col as usize]),
        );
        self.write_segment(JPEGMarker::DQT, &payload)
    }

    /// Writes a baseline frame header. Components are (identifier, sampling factors, table id).
    pub fn write_start_of_frame(
        &mut self,
        width: u16,
        height: u16,
        components: &[(u8, (u8, u8), u8)],
    ) -> Result<()> {
        let mut payload = Vec::with_capacity(6 + 3 * components.len());
        payload.push(8);
        payload.write_u16::<BigEndian>(height)?;
        payload.write_u16::<BigEndian>(width)?;
        payload.push(components.len() as u8);
        for &(identifier, (h, v), qtable_id) in components {
            payload.extend_from_slice(&[identifier, (h << 4) | (v & 0x0F), qtable_id]);
        }
        self.write_segment(JPEGMarker::SOF0, &payload)
    }

    pub fn write_huffman_table(
        &mut self,
        table_type: HuffmanTableType,
        destination_id: u8,
        bitcode_counts: &[u8; 16],
        symbols: &[u8],
    ) -> Result<()> {
        let class = match table_type {
            HuffmanTableType::Dc => 0,
            HuffmanTableType::Ac => 1,
        };
        let mut payload = Vec::with_capacity(17 + symbols.len());
        payload.push((class << 4) | (destination_id & 0x0F));
        payload.extend_from_slice(bitcode_counts);
        payload.extend_from_slice(symbols);
        self.write_segment(JPEGMarker::DHT, &payload)
    }

    /// Writes a sequential scan header. Components are (selector, DC table, AC table).
    pub fn write_start_of_scan(&mut self, components: &[(u8, u8, u8)]) -> Result<()> {
        let mut payload = Vec::with_capacity(4 + 2 * components.len());
        payload.push(components.len() as u8);
        for &(selector, dc_table, ac_table) in components {
            payload.extend_from_slice(&[selector, (dc_table << 4) | (ac_table & 0x0F)]);
        }
        payload.extend_from_slice(&[0, 63, 0]);
        self.write_segment(JPEGMarker::SOS, &payload)
    }

    /// Writes already byte-stuffed entropy-coded data.
    pub fn write_entropy_data(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_all(data)?;
        Ok(())
    }

    /// Terminates the image with EOI and hands back the output.
    pub fn finish(mut self) -> Result<W> {
        self.write_marker(JPEGMarker::EOI)?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_carry_their_length() {
        let mut writer = JPEGWriter::new(Vec::new());
        writer.write_marker(JPEGMarker::SOI).unwrap();
        writer
            .write_start_of_frame(300, 2, &[(1, (1, 1), 0)])
            .unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(
            bytes,
            vec![
                0xFF, 0xD8, // SOI
                0xFF, 0xC0, 0, 11, 8, 0, 2, 0x01, 0x2C, 1, 1, 0x11, 0, // SOF0
                0xFF, 0xD9, // EOI
            ]
        );
    }

    #[test]
    fn quantization_table_is_zigzagged() {
        let mut table = [[1u8; 8]; 8];
        table[1][0] = 7;
        let mut writer = JPEGWriter::new(Vec::new());
        writer.write_quantization_table(0, &table).unwrap();
        let bytes = writer.out;
        assert_eq!(&bytes[..5], &[0xFF, 0xDB, 0, 67, 0]);
        // (1, 0) is the third entry in zigzag order
        assert_eq!(&bytes[5..8], &[1, 1, 7]);
    }
}
