use std::{cmp::max, collections::HashMap};

use crate::{
    bitstream::Bitstream,
    error::{Error, Result},
    jpeg::jpeg_reader::*,
};

use super::jpeg_core::ZIGZAG_MAP;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanTableType {
    #[default]
    Ac,
    Dc,
}

/// Defines a JPEG huffman table
#[derive(Debug, Default)]
pub struct HuffmanTable {
    pub table_type: HuffmanTableType,
    pub destination_id: u8,
    pub bitcode_counts: [u8; 16],
    pub symbols: Vec<u8>,
    pub codes: Vec<u16>,
}

impl HuffmanTable {
    fn generate_codes(&mut self) {
        let mut code = 0u16;
        for code_count in self.bitcode_counts {
            for _ in 0..code_count {
                self.codes.push(code);
                code = code.wrapping_add(1);
            }
            code = code.wrapping_shl(1);
        }
    }

    /// Reads one huffman-coded symbol from the bitstream.
    pub fn decode(&self, bitstream: &mut Bitstream) -> Result<u8> {
        let mut code: u32 = 0;
        let mut code_cursor: usize = 0;

        for length in 0..16 {
            code = (code << 1) | bitstream.read_bit()? as u32;
            for _ in 0..self.bitcode_counts[length] {
                if code == self.codes[code_cursor] as u32 {
                    return Ok(self.symbols[code_cursor]);
                }
                code_cursor += 1;
            }
        }

        Err(Error::Malformed(
            "JPEG has code longer than the 16 bit maximum for baseline JPEGs.",
        ))
    }
}

#[derive(Debug)]
pub struct QuantizationTable {
    /// Natural (row-major) order.
    pub table: [[u16; 8]; 8],
}

#[derive(Debug, Default, Clone)]
pub struct FrameComponent {
    pub identifier: u8,
    pub xy_sampling_factor: (u8, u8),
    pub qtable_id: u8,
}

#[derive(Debug, Default, Clone)]
pub struct ScanComponent {
    pub selector: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

/// A frame component joined with the scan entry that selects it.
#[derive(Debug, Default, Clone)]
pub struct Component {
    pub frame: FrameComponent,
    pub scan: ScanComponent,
    /// 8x8 blocks this component contributes to each MCU, horizontally and vertically.
    pub blocks_per_mcu: (u8, u8),
}

#[derive(Debug, Default)]
pub struct ScanInfo {
    pub components: Vec<ScanComponent>,
    pub spectral_selection: (u8, u8),
    pub successive_approximation: u8,
}

#[derive(Debug, Default)]
pub struct FrameInfo {
    pub image_size: (u16, u16),
    pub padded_size: (u32, u32),
    pub components: Vec<FrameComponent>,
}

#[derive(Debug, Default)]
pub struct MCUInfo {
    pub max_xy_sampling_factor: (u8, u8),
    pub mcu_size: (u8, u8),
    pub mcu_padded_dimensions: (u32, u32),
}

#[derive(Debug, Default)]
pub struct HeaderInfo {
    pub frame_info: FrameInfo,
    pub scan_info: ScanInfo,
    pub components: Vec<Component>,
    pub ac_huff_tables: HashMap<u8, HuffmanTable>,
    pub dc_huff_tables: HashMap<u8, HuffmanTable>,
    pub quant_tables: HashMap<u8, QuantizationTable>,
    pub mcu_info: MCUInfo,
}

impl HeaderInfo {
    fn read_start_of_frame(reader: &mut JPEGParser) -> Result<FrameInfo> {
        let _struct_size = reader.read_segment_length()?;

        let precision = reader.read_next_byte()?;
        if precision != 8 {
            return Err(Error::UnsupportedFeature("Only 8-bit samples are supported"));
        }

        let height = reader.read_next_word()?;
        let width = reader.read_next_word()?;
        if width == 0 {
            return Err(Error::Malformed("Frame width is zero"));
        }
        if height == 0 {
            return Err(Error::UnsupportedFeature("Height defined by DNL marker"));
        }

        let component_count = reader.read_next_byte()?;

        let mut components: Vec<FrameComponent> = Vec::with_capacity(component_count as usize);

        for _ in 0..component_count {
            let identifier = reader.read_next_byte()?;
            if components.iter().any(|c| c.identifier == identifier) {
                return Err(Error::Malformed("Duplicate component identifier"));
            }

            let sample_factors = reader.read_next_byte()?;
            let xy_sampling_factor = (sample_factors >> 4, sample_factors & 0x0F);
            if !(1..=4).contains(&xy_sampling_factor.0) || !(1..=4).contains(&xy_sampling_factor.1)
            {
                return Err(Error::Malformed("Sampling factor out of range"));
            }

            let qtable_id = reader.read_next_byte()?;

            components.push(FrameComponent {
                identifier,
                xy_sampling_factor,
                qtable_id,
            })
        }

        Ok(FrameInfo {
            image_size: (width, height),
            padded_size: (0, 0), // This can only be determined with info in the scan header
            components,
        })
    }

    fn read_quantization_tables(reader: &mut JPEGParser) -> Result<HashMap<u8, QuantizationTable>> {
        let struct_size = reader.read_segment_length()?;

        let mut quant_tables: HashMap<u8, QuantizationTable> = HashMap::new();

        let end_of_table = reader.position() + struct_size as u64;
        while reader.position() < end_of_table {
            let table_info = reader.read_next_byte()?;
            let precision = table_info >> 4;
            let destination_id = table_info & 0x0F;
            if destination_id > 3 {
                return Err(Error::Malformed("Quantization table id out of range"));
            }

            let mut unzagged_table = [[0u16; 8]; 8];
            for &(row, col) in ZIGZAG_MAP {
                unzagged_table[row as usize][col as usize] = match precision {
                    0 => reader.read_next_byte()? as u16,
                    1 => reader.read_next_word()?,
                    _ => return Err(Error::Malformed("Invalid precision value")),
                };
            }
            quant_tables.insert(
                destination_id,
                QuantizationTable {
                    table: unzagged_table,
                },
            );
        }

        Ok(quant_tables)
    }

    fn read_huffman_tables(
        reader: &mut JPEGParser,
    ) -> Result<(HashMap<u8, HuffmanTable>, HashMap<u8, HuffmanTable>)> {
        let struct_size = reader.read_segment_length()?;

        let mut ac_tables: HashMap<u8, HuffmanTable> = HashMap::new();
        let mut dc_tables: HashMap<u8, HuffmanTable> = HashMap::new();

        let end_of_table = reader.position() + struct_size as u64;
        while reader.position() < end_of_table {
            let table_info = reader.read_next_byte()?;
            let table_type = match table_info >> 4 {
                0 => HuffmanTableType::Dc,
                1 => HuffmanTableType::Ac,
                _ => return Err(Error::Malformed("Invalid table type")),
            };

            let destination_id = table_info & 0x0F;

            let mut bitcode_counts: [u8; 16] = [0; 16];
            for count in bitcode_counts.iter_mut() {
                *count = reader.read_next_byte()?;
            }

            let size: usize = bitcode_counts.iter().map(|&c| c as usize).sum();
            if size > 256 {
                return Err(Error::Malformed("Huffman table holds more than 256 symbols"));
            }

            let mut symbols = Vec::with_capacity(size);
            for _ in 0..size {
                symbols.push(reader.read_next_byte()?);
            }

            let mut table = HuffmanTable {
                table_type,
                destination_id,
                bitcode_counts,
                symbols,
                codes: Vec::with_capacity(size),
            };

            table.generate_codes();

            match table.table_type {
                HuffmanTableType::Ac => ac_tables.insert(table.destination_id, table),
                HuffmanTableType::Dc => dc_tables.insert(table.destination_id, table),
            };
        }

        Ok((ac_tables, dc_tables))
    }

    /// Reads data from the scan header, leaving the cursor at the start of the scan stream.
    fn read_start_of_scan(reader: &mut JPEGParser) -> Result<ScanInfo> {
        let _struct_size = reader.read_segment_length()?;

        let component_count = reader.read_next_byte()?;

        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let selector = reader.read_next_byte()?;

            let tables = reader.read_next_byte()?;
            let dc_table = tables >> 4;
            let ac_table = tables & 0x0F;

            components.push(ScanComponent {
                selector,
                dc_table,
                ac_table,
            });
        }

        let spectral_selection_start = reader.read_next_byte()?;
        let spectral_selection_end = reader.read_next_byte()?;

        let successive_approximation = reader.read_next_byte()?;

        Ok(ScanInfo {
            components,
            spectral_selection: (spectral_selection_start, spectral_selection_end),
            successive_approximation,
        })
    }

    fn read_restart_interval(reader: &mut JPEGParser) -> Result<()> {
        let _struct_size = reader.read_segment_length()?;
        if reader.read_next_word()? != 0 {
            return Err(Error::UnsupportedFeature("Restart intervals"));
        }
        Ok(())
    }

    /// Joins frame and scan components and derives the MCU layout.
    fn finish_scan_header(&mut self) -> Result<()> {
        let frame_components = &self.frame_info.components;
        if frame_components.is_empty() {
            return Err(Error::Malformed("Scan encountered before start of frame"));
        }
        if !matches!(frame_components.len(), 1 | 3) {
            return Err(Error::UnsupportedFeature(
                "Only greyscale and YCbCr images are supported",
            ));
        }
        if self.scan_info.spectral_selection != (0, 63)
            || self.scan_info.successive_approximation != 0
        {
            return Err(Error::Malformed("Sequential scan must cover all 64 coefficients"));
        }
        if frame_components.len() != self.scan_info.components.len() {
            return Err(Error::UnsupportedFeature(
                "Scan does not cover every frame component",
            ));
        }

        let single = frame_components.len() == 1;
        self.components = Vec::with_capacity(frame_components.len());
        for frame in frame_components {
            let scan = self
                .scan_info
                .components
                .iter()
                .find(|scan| scan.selector == frame.identifier)
                .ok_or(Error::Malformed("Scan selects an unknown component"))?;

            if !self.dc_huff_tables.contains_key(&scan.dc_table)
                || !self.ac_huff_tables.contains_key(&scan.ac_table)
            {
                return Err(Error::Malformed("Scan references a missing huffman table"));
            }
            if !self.quant_tables.contains_key(&frame.qtable_id) {
                return Err(Error::Malformed(
                    "Frame references a missing quantization table",
                ));
            }

            // A non-interleaved scan always codes one block per MCU.
            let blocks_per_mcu = if single {
                (1, 1)
            } else {
                frame.xy_sampling_factor
            };
            self.components.push(Component {
                frame: frame.clone(),
                scan: scan.clone(),
                blocks_per_mcu,
            });
        }

        self.mcu_info.max_xy_sampling_factor = self.components.iter().fold(
            (0, 0),
            |(max_h_fac, max_v_fac), component| {
                (
                    max(component.blocks_per_mcu.0, max_h_fac),
                    max(component.blocks_per_mcu.1, max_v_fac),
                )
            },
        );
        if self.components.iter().any(|c| {
            self.mcu_info.max_xy_sampling_factor.0 % c.blocks_per_mcu.0 != 0
                || self.mcu_info.max_xy_sampling_factor.1 % c.blocks_per_mcu.1 != 0
        }) {
            return Err(Error::UnsupportedFeature("Non-integral chroma subsampling"));
        }

        self.mcu_info.mcu_size = (
            8 * self.mcu_info.max_xy_sampling_factor.0,
            8 * self.mcu_info.max_xy_sampling_factor.1,
        );

        self.frame_info.padded_size = pad(self.frame_info.image_size, self.mcu_info.mcu_size);

        self.mcu_info.mcu_padded_dimensions = (
            self.frame_info.padded_size.0 / self.mcu_info.mcu_size.0 as u32,
            self.frame_info.padded_size.1 / self.mcu_info.mcu_size.1 as u32,
        );

        Ok(())
    }

    /// Reads header info from a given JPEGParser. The JPEGParser is expected to be at position 0
    /// in a JPEG data stream. It returns when it find the start of scan marker, reads its header,
    /// and leaves the cursor at the scan stream.
    pub fn read_header_info(reader: &mut JPEGParser) -> Result<Self> {
        if reader.read_next_marker()? != JPEGMarker::SOI {
            return Err(Error::Malformed(
                "This JPEG image does not have an SOI marker",
            ));
        }

        let mut result: Self = Default::default();

        loop {
            let marker = reader.read_next_marker()?;

            match marker {
                JPEGMarker::EOI => {
                    return Err(Error::Malformed("Unexpected EOI marker encountered."));
                }
                JPEGMarker::SOF0 => {
                    result.frame_info = Self::read_start_of_frame(reader)?;
                }
                JPEGMarker::SOF1 | JPEGMarker::SOF2 | JPEGMarker::SOF3 => {
                    return Err(Error::UnsupportedFeature(
                        "Only baseline DCT frames are supported",
                    ));
                }
                JPEGMarker::DHT => {
                    let (ac, dc) = Self::read_huffman_tables(reader)?;
                    result.ac_huff_tables.extend(ac);
                    result.dc_huff_tables.extend(dc);
                }
                JPEGMarker::DQT => {
                    result
                        .quant_tables
                        .extend(Self::read_quantization_tables(reader)?);
                }
                JPEGMarker::DRI => Self::read_restart_interval(reader)?,
                JPEGMarker::SOS => {
                    result.scan_info = Self::read_start_of_scan(reader)?;
                    result.finish_scan_header()?;
                    return Ok(result);
                }
                marker if marker.is_restart() => {
                    return Err(Error::Malformed("Restart marker outside of scan data"));
                }
                _ => {
                    reader.skip_marker_with_length()?; // Skip unkown markers
                }
            }
        }
    }
}

fn pad(unpadded: (u16, u16), block_size: (u8, u8)) -> (u32, u32) {
    let round_up = |value: u16, block: u8| {
        let (value, block) = (value as u32, block as u32);
        value.div_ceil(block) * block
    };
    (
        round_up(unpadded.0, block_size.0),
        round_up(unpadded.1, block_size.1),
    )
}
