use std::f32::consts::PI;

use crate::{
    bitmap::{Bitmap, Color, Region},
    bitstream::Bitstream,
    error::{Error, Result},
    jpeg::{
        header::*,
        jpeg_reader::{JPEGMarker, JPEGParser},
    },
};

#[rustfmt::skip]
pub const ZIGZAG_MAP: &[(u8, u8)] =
    &[(0, 0), (0, 1), (1, 0), (2, 0), (1, 1), (0, 2), (0, 3), (1, 2),
          (2, 1), (3, 0), (4, 0), (3, 1), (2, 2), (1, 3), (0, 4), (0, 5),
          (1, 4), (2, 3), (3, 2), (4, 1), (5, 0), (6, 0), (5, 1), (4, 2),
          (3, 3), (2, 4), (1, 5), (0, 6), (0, 7), (1, 6), (2, 5), (3, 4),
          (4, 3), (5, 2), (6, 1), (7, 0), (7, 1), (6, 2), (5, 3), (4, 4),
          (3, 5), (2, 6), (1, 7), (2, 7), (3, 6), (4, 5), (5, 4), (6, 3),
          (7, 2), (7, 3), (6, 4), (5, 5), (4, 6), (3, 7), (4, 7), (5, 6),
          (6, 5), (7, 4), (7, 5), (6, 6), (5, 7), (6, 7), (7, 6), (7, 7)];

pub struct JPEGDecoder<'data> {
    reader: JPEGParser<'data>,
    dc_predictions: Vec<i16>,
    /// `idct_table[x][u]` = C(u) * cos((2x + 1)uπ / 16)
    idct_table: [[f32; 8]; 8],
}

impl<'data> JPEGDecoder<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        let mut idct_table = [[0f32; 8]; 8];
        for (x, row) in idct_table.iter_mut().enumerate() {
            for (u, value) in row.iter_mut().enumerate() {
                let cu = if u == 0 { 1f32 / f32::sqrt(2.0) } else { 1f32 };
                *value = cu * f32::cos(((2.0 * x as f32 + 1.0) * u as f32 * PI) / 16.0);
            }
        }
        Self {
            reader: JPEGParser::new(data),
            dc_predictions: vec![],
            idct_table,
        }
    }

    pub fn parse(&mut self) -> Result<HeaderInfo> {
        HeaderInfo::read_header_info(&mut self.reader)
    }

    /// Decodes the scan and writes the pixels inside `region` into `target`, whose
    /// origin corresponds to the region's top-left corner.
    pub fn read_scan(
        &mut self,
        header: &HeaderInfo,
        target: &mut Bitmap,
        region: Region,
    ) -> Result<()> {
        let huffman_data = self.read_huffman_data()?;
        let mut bitstream = Bitstream::new(huffman_data.as_slice());
        self.dc_predictions = vec![0; header.components.len()];

        let mut block = Macroblock::new(&header.components);
        let mcu_height = header.mcu_info.mcu_size.1 as u32;
        let region_bottom = region.y + region.height;

        for vert in 0..header.mcu_info.mcu_padded_dimensions.1 {
            // Nothing past the region's bottom edge is needed.
            if vert * mcu_height >= region_bottom {
                break;
            }
            for horiz in 0..header.mcu_info.mcu_padded_dimensions.0 {
                self.decode_mcu(&mut bitstream, header, &mut block)?;
                Self::write_mcu(&block, header, (horiz, vert), target, region);
            }
        }

        Ok(())
    }

    fn write_mcu(
        block: &Macroblock,
        header: &HeaderInfo,
        (mcu_x, mcu_y): (u32, u32),
        target: &mut Bitmap,
        region: Region,
    ) {
        let (mcu_w, mcu_h) = (
            header.mcu_info.mcu_size.0 as u32,
            header.mcu_info.mcu_size.1 as u32,
        );
        let max_factor = header.mcu_info.max_xy_sampling_factor;

        for pixel_y in 0..mcu_h {
            let y = mcu_y * mcu_h + pixel_y;
            if y < region.y || y >= region.y + region.height {
                continue;
            }
            for pixel_x in 0..mcu_w {
                let x = mcu_x * mcu_w + pixel_x;
                if x < region.x || x >= region.x + region.width {
                    continue;
                }

                let sample = |index: usize| {
                    let blocks = header.components[index].blocks_per_mcu;
                    let sx = pixel_x as usize / (max_factor.0 / blocks.0) as usize;
                    let sy = pixel_y as usize / (max_factor.1 / blocks.1) as usize;
                    block.planes[index][sy * 8 * blocks.0 as usize + sx]
                };

                let color = match header.components.len() {
                    1 => {
                        let lum = level_shift(sample(0) as f32);
                        Color::from_argb(0xFF, lum, lum, lum)
                    }
                    _ => Self::ycbcr_to_rgb((sample(0), sample(1), sample(2))),
                };
                target.set_pixel(x - region.x, y - region.y, color);
            }
        }
    }

    fn ycbcr_to_rgb(y_cb_cr: (i16, i16, i16)) -> Color {
        let lum = y_cb_cr.0 as f32;
        let cb = y_cb_cr.1 as f32;
        let cr = y_cb_cr.2 as f32;

        let red = (cr * (2f32 - 2f32 * 0.299)) + lum;
        let blue = (cb * (2f32 - 2f32 * 0.114)) + lum;
        let green = (lum - (0.114 * blue) - (0.299 * red)) / 0.587;

        Color::from_argb(0xFF, level_shift(red), level_shift(green), level_shift(blue))
    }

    fn decode_mcu(
        &mut self,
        bitstream: &mut Bitstream,
        header: &HeaderInfo,
        block: &mut Macroblock,
    ) -> Result<()> {
        for (index, component) in header.components.iter().enumerate() {
            let dc_table = header
                .dc_huff_tables
                .get(&component.scan.dc_table)
                .ok_or(Error::Malformed("Missing DC huffman table"))?;
            let ac_table = header
                .ac_huff_tables
                .get(&component.scan.ac_table)
                .ok_or(Error::Malformed("Missing AC huffman table"))?;
            let qtable = &header
                .quant_tables
                .get(&component.frame.qtable_id)
                .ok_or(Error::Malformed("Missing quantization table"))?
                .table;

            let stride = 8 * component.blocks_per_mcu.0 as usize;
            for mcu_row in 0..component.blocks_per_mcu.1 as usize {
                for mcu_col in 0..component.blocks_per_mcu.0 as usize {
                    let mut coefficients = [0i32; 64];
                    let has_ac =
                        self.decode_block(bitstream, index, dc_table, ac_table, &mut coefficients)?;

                    // Dequantize and unzigzag
                    let mut natural = [[0f32; 8]; 8];
                    for (i, &(row, col)) in ZIGZAG_MAP.iter().enumerate() {
                        natural[row as usize][col as usize] =
                            (coefficients[i] * qtable[row as usize][col as usize] as i32) as f32;
                    }

                    let plane = &mut block.planes[index];
                    let base = mcu_row * 8 * stride + mcu_col * 8;
                    if has_ac {
                        let spatial = self.inverse_dct(&natural);
                        for (y, row) in spatial.iter().enumerate() {
                            for (x, &value) in row.iter().enumerate() {
                                plane[base + y * stride + x] = value;
                            }
                        }
                    } else {
                        // With only a DC term every sample equals DC / 8.
                        let value = (natural[0][0] / 8.0) as i16;
                        for y in 0..8 {
                            plane[base + y * stride..base + y * stride + 8].fill(value);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Decodes one block's coefficients in zigzag order. Returns whether any AC
    /// coefficient is non-zero.
    fn decode_block(
        &mut self,
        bitstream: &mut Bitstream,
        component_index: usize,
        dc_table: &HuffmanTable,
        ac_table: &HuffmanTable,
        coefficients: &mut [i32; 64],
    ) -> Result<bool> {
        // Calculate DC coefficient
        // https://www.w3.org/Graphics/JPEG/itu-t81.pdf
        // F.2.2.1 Page 104
        let dc_code = dc_table.decode(bitstream)?; // DECODE
        if dc_code > 11 {
            return Err(Error::Malformed("DC difference category out of range"));
        }
        // RECEIVE, EXTEND
        let diff = extend(bitstream.read_bits(dc_code as usize)? as i32, dc_code);

        let dc_coefficient = (self.dc_predictions[component_index] as i32 + diff) as i16;
        self.dc_predictions[component_index] = dc_coefficient;
        coefficients[0] = dc_coefficient as i32;

        // Calculate AC coefficients
        // https://www.w3.org/Graphics/JPEG/itu-t81.pdf
        // F.13 Page 106
        let mut has_ac = false;
        let mut k = 1;
        while k < 64 {
            let huffman_val = ac_table.decode(bitstream)?;
            match huffman_val {
                0x00 => break, // EOB
                0xF0 => k += 16, // ZRL
                _ => {
                    k += (huffman_val >> 4) as usize;
                    if k > 63 {
                        return Err(Error::Malformed("Run length exceeds max K of 63"));
                    }

                    let code_length = huffman_val & 0b1111;
                    if code_length == 0 {
                        return Err(Error::Malformed("AC coefficient with zero length"));
                    }
                    let value = bitstream.read_bits(code_length as usize)? as i32;
                    coefficients[k] = extend(value, code_length);
                    has_ac = true;
                    k += 1;
                }
            }
        }
        Ok(has_ac)
    }

    // https://www.w3.org/Graphics/JPEG/itu-t81.pdf
    // A.3.3 Page 27, evaluated as two separable 1-D passes
    fn inverse_dct(&self, coefficients: &[[f32; 8]; 8]) -> [[i16; 8]; 8] {
        let table = &self.idct_table;

        let mut rows = [[0f32; 8]; 8];
        for v in 0..8 {
            for x in 0..8 {
                rows[v][x] = (0..8).map(|u| table[x][u] * coefficients[v][u]).sum();
            }
        }

        let mut spatial = [[0i16; 8]; 8];
        for y in 0..8 {
            for x in 0..8 {
                let value: f32 = (0..8).map(|v| table[y][v] * rows[v][x]).sum();
                spatial[y][x] = (value / 4.0) as i16;
            }
        }
        spatial
    }

    fn read_huffman_data(&mut self) -> Result<Vec<u8>> {
        let mut huffman_data: Vec<u8> = vec![];
        let mut current_byte = self.reader.read_next_byte()?;

        loop {
            let last_byte = current_byte;
            current_byte = self.reader.read_next_byte()?;

            if last_byte != 0xFF {
                huffman_data.push(last_byte);
                continue;
            }

            match current_byte {
                0x00 => {
                    huffman_data.push(last_byte);
                    current_byte = self.reader.read_next_byte()?;
                }
                0xFF => {} // Fill byte
                _ => {
                    let marker = JPEGParser::to_marker(0xFF00 | current_byte as u16)?;
                    if marker == JPEGMarker::EOI {
                        return Ok(huffman_data);
                    }
                    return Err(Error::UnsupportedFeature(
                        "Markers inside scan data are not supported",
                    ));
                }
            }
        }
    }
}

/// EXTEND: If the MSB is 0 then the value is negative, if 1 it is positive.
fn extend(value: i32, length: u8) -> i32 {
    if length == 0 {
        0
    } else if value < (1 << (length - 1)) {
        value - ((1 << length) - 1)
    } else {
        value
    }
}

fn level_shift(sample: f32) -> u8 {
    (sample + 128.0).round().clamp(0.0, 255.0) as u8
}

/// Decoded samples of one MCU, one plane per component.
#[derive(Debug, Clone)]
struct Macroblock {
    planes: Vec<Vec<i16>>,
}

impl Macroblock {
    fn new(components: &[Component]) -> Self {
        Self {
            planes: components
                .iter()
                .map(|c| vec![0; 64 * c.blocks_per_mcu.0 as usize * c.blocks_per_mcu.1 as usize])
                .collect(),
        }
    }
}
